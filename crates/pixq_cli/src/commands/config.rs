//! `pixq config` subcommands.

use anyhow::anyhow;
use pixq_core::config::ConfigSection;
use pixq_core::models::TargetFormat;

use crate::cli::{AppContext, CliError, CliResult, OutputFormat};

pub(crate) fn handle_config_show(ctx: &AppContext) -> CliResult<()> {
    let settings = ctx.config.settings();
    match ctx.output {
        OutputFormat::Json => {
            let text = serde_json::to_string_pretty(settings)
                .map_err(|err| CliError::failure(anyhow!("failed to format JSON: {err}")))?;
            println!("{text}");
        }
        OutputFormat::Table => {
            println!("# {}", ctx.config.path().display());
            let text = toml::to_string_pretty(settings)
                .map_err(|err| CliError::failure(anyhow!("failed to format TOML: {err}")))?;
            print!("{text}");
        }
    }
    Ok(())
}

pub(crate) fn handle_set_format(ctx: &mut AppContext, format: TargetFormat) -> CliResult<()> {
    ctx.config.settings_mut().conversion.default_format = format;
    ctx.config.update_section(ConfigSection::Conversion)?;
    tracing::info!("Default format set to {}", format);
    println!("default format: {format}");
    Ok(())
}
