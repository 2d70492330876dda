//! Transcode command tokens and virtual file name rules.

use super::error::{EngineError, EngineResult};

/// Flag introducing the input file in a transcode command.
pub const INPUT_FLAG: &str = "-i";

/// Build a single-input, single-output transcode command.
///
/// The output format is inferred by the engine from the output name's
/// extension.
pub fn transcode_command(input: &str, output: &str) -> Vec<String> {
    vec![INPUT_FLAG.to_string(), input.to_string(), output.to_string()]
}

/// Split a transcode command back into `(input, output)`.
pub fn parse_transcode_command(tokens: &[String]) -> EngineResult<(&str, &str)> {
    match tokens {
        [flag, input, output] if flag == INPUT_FLAG => Ok((input.as_str(), output.as_str())),
        _ => Err(EngineError::execution(format!(
            "malformed command: expected [-i <input> <output>], got {:?}",
            tokens
        ))),
    }
}

/// Check a virtual file name against the engine naming rules.
///
/// Names must be non-empty and contain no whitespace or path separators.
pub fn validate_virtual_name(name: &str) -> EngineResult<()> {
    if name.is_empty() {
        return Err(EngineError::io(name, "empty virtual file name"));
    }
    if name.chars().any(char::is_whitespace) {
        return Err(EngineError::io(name, "virtual file names cannot contain whitespace"));
    }
    if name.contains('/') || name.contains('\\') || name == "." || name == ".." {
        return Err(EngineError::io(name, "virtual file names cannot contain path components"));
    }
    Ok(())
}

/// Extension of a virtual file name, if any.
pub fn extension_of(name: &str) -> Option<&str> {
    name.rsplit_once('.').map(|(_, ext)| ext).filter(|ext| !ext.is_empty())
}
