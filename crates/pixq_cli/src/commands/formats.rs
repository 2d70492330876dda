//! `pixq formats`.

use crate::cli::{CliResult, OutputFormat};
use crate::output::render_formats;

pub(crate) fn handle_formats(output: OutputFormat) -> CliResult<()> {
    render_formats(output)
}
