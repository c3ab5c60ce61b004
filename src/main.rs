use anyhow::{Context, Result};
use fingate::{
    config::Config,
    export,
    fetch::{build_client, fetch_archive_bytes, ArchiveLocation},
    pipeline::process_archive,
    report,
};
use std::{env, fs, time::Instant};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,fingate=info"));
    fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();
    info!("startup");

    std::panic::set_hook(Box::new(|info| {
        eprintln!("panic: {:?}", info);
    }));

    // ─── 2) configuration ────────────────────────────────────────────
    let cli_archive = env::args().nth(1);
    let config = Config::load(cli_archive.as_deref())?;
    fs::create_dir_all(&config.output_dir)
        .with_context(|| format!("creating {}", config.output_dir.display()))?;

    // ─── 3) fetch the archive ────────────────────────────────────────
    let start = Instant::now();
    let location = ArchiveLocation::parse(&config.archive)?;
    let client = build_client(&config.fetch)?;
    let zip_bytes = fetch_archive_bytes(&client, &location, &config.fetch).await?;

    // ─── 4) extract every document ───────────────────────────────────
    let extensions = config.document_extensions.clone();
    let options = config.pipeline.clone();
    let outcomes = tokio::task::spawn_blocking(move || {
        process_archive(&zip_bytes, &extensions, &options)
    })
    .await??;

    if outcomes.is_empty() {
        warn!(archive = %config.archive, "archive contains no documents");
    }

    // ─── 5) write outputs ────────────────────────────────────────────
    let sheets = export::write_workbook_file(&config.workbook_path(), &outcomes)?;
    report::write_report_file(&config.report_path(), &outcomes)?;

    // ─── 6) summary ──────────────────────────────────────────────────
    for outcome in &outcomes {
        match &outcome.result {
            Ok(table) => info!(
                document = %outcome.name,
                columns = table.columns().len(),
                rows = table.rows().len(),
                "extracted"
            ),
            Err(e) => error!(document = %outcome.name, error = %e, "skipped"),
        }
    }
    info!(
        documents = outcomes.len(),
        sheets = sheets.len(),
        workbook = %config.workbook_path().display(),
        report = %config.report_path().display(),
        elapsed = ?start.elapsed(),
        "done"
    );
    Ok(())
}
