use anyhow::Context;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use index_advisor::config::{Config, LoggingConfig};
use index_advisor::models::RunOutcome;
use index_advisor::{MongoQuerySelector, Pipeline, PipelineError, build_advisor};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // A missing .env is normal
    let _ = dotenvy::dotenv();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {:#}", e);
            return ExitCode::FAILURE;
        },
    };

    let _log_guard = init_logging(&config.logging);
    tracing::info!("Index advisor starting up");
    tracing::debug!("Configuration: {:?}", config);

    match run(&config).await {
        Ok(RunOutcome::NothingToDo) => ExitCode::SUCCESS,
        Ok(RunOutcome::Completed(summary)) => {
            if !summary.skipped.is_empty() {
                tracing::warn!("Skipped query shapes: {:?}", summary.skipped);
            }
            ExitCode::SUCCESS
        },
        Err(e) => {
            tracing::error!("Run aborted: {:#}", e);
            eprintln!("Fatal: {:#}", e);
            ExitCode::FAILURE
        },
    }
}

async fn run(config: &Config) -> Result<RunOutcome, anyhow::Error> {
    // Credential problems surface before the store is touched
    let advisor = build_advisor(&config.advisor).map_err(PipelineError::Config)?;

    let selector = Arc::new(
        MongoQuerySelector::connect(
            &config.store.uri,
            &config.store.database,
            Duration::from_secs(config.store.timeout_secs),
        )
        .await
        .context("Failed to connect to the profiling store")?,
    );

    let mut pipeline = Pipeline::new(
        selector.clone(),
        advisor,
        std::io::stdout(),
        config.store.database.clone(),
        config.filter.min_millis,
    );
    let result = pipeline.run().await;

    // Runs on every path, aborted runs included
    selector.shutdown().await;

    Ok(result?)
}

/// Logs go to stderr (stdout carries the report), plus an optional daily
/// rolling file. The returned guard must live until exit.
fn init_logging(logging: &LoggingConfig) -> Option<WorkerGuard> {
    let log_filter = tracing_subscriber::EnvFilter::try_new(&logging.level)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(log_filter);

    if let Some(log_file) = &logging.file {
        let log_path = std::path::Path::new(log_file);
        if let Some(parent) = log_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }

        let log_dir = log_path
            .parent()
            .and_then(|p| p.to_str())
            .filter(|p| !p.is_empty())
            .unwrap_or(".");
        let file_name = log_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("index-advisor.log");
        // Rolling appender adds its own date suffix
        let file_prefix = file_name.strip_suffix(".log").unwrap_or(file_name);

        let file_appender = tracing_appender::rolling::daily(log_dir, file_prefix);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(non_blocking).with_ansi(false))
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
        Some(guard)
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
        None
    }
}
