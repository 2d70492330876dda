//! `pixq convert`: acquire inputs, run the queue, save the outputs.

use std::io::{self, IsTerminal};
use std::path::PathBuf;

use pixq_core::orchestrator::{ConversionQueue, DirectoryDelivery};

use crate::bootstrap::{build_engine, load_engine};
use crate::cli::{AppContext, CliError, CliResult, ConvertArgs, OutputFormat};
use crate::input::{acquire, collect_sources, http_client};
use crate::output::{render_batch, render_delivery, spawn_progress};

pub(crate) async fn handle_convert(ctx: &AppContext, args: ConvertArgs) -> CliResult<()> {
    let sources = collect_sources(&args.inputs, &args.urls)?;
    let client = http_client()?;
    let acquired = acquire(&sources, &client).await;
    for (label, reason) in &acquired.failures {
        eprintln!("skipped {label}: {reason}");
    }
    if acquired.blobs.is_empty() {
        return Err(CliError::validation("none of the inputs could be read"));
    }

    let only = args
        .only
        .map(|n| {
            n.checked_sub(1)
                .ok_or_else(|| CliError::validation("--only counts from 1"))
        })
        .transpose()?;

    ctx.config.ensure_dirs_exist()?;
    let settings = ctx.config.settings();
    let backend = args.engine.unwrap_or(settings.engine.backend);
    let engine = build_engine(settings, backend);
    let interactive = io::stdin().is_terminal() && !sources_use_stdin(&args);
    load_engine(engine.as_ref(), interactive).await?;

    let queue = ConversionQueue::new(engine, settings.conversion.default_format)?;
    queue.accept_inputs(acquired.blobs);
    if let Some(format) = args.format {
        queue.set_format(format)?;
    }

    let progress = (ctx.output == OutputFormat::Table).then(|| spawn_progress(queue.subscribe()));
    let run = match only {
        Some(index) => queue.convert_one(index).await.map(|_| ()),
        None => queue.convert_all().await.map(|_| ()),
    };
    if let Some(progress) = progress {
        progress.abort();
    }
    run?;

    let batch = queue.snapshot();
    render_batch(&batch, ctx.output)?;

    let out_dir = args
        .out
        .clone()
        .unwrap_or_else(|| PathBuf::from(&settings.paths.output_folder));
    let report = queue.download_all(&DirectoryDelivery::new(&out_dir)).await;
    render_delivery(&report, &out_dir, ctx.output)?;

    let summary = batch.summary();
    if summary.failed > 0 || !acquired.failures.is_empty() || !report.is_complete() {
        return Err(CliError::Incomplete(format!(
            "{} conversion(s) failed, {} input(s) unreadable, {} file(s) not saved",
            summary.failed,
            acquired.failures.len(),
            report.failed.len()
        )));
    }
    Ok(())
}

fn sources_use_stdin(args: &ConvertArgs) -> bool {
    args.inputs.iter().any(|input| input == "-")
}
