//! GpuWatch monitor binary entrypoint.
//!
//! Runs exactly one sampling pass and exits; scheduling the next pass is left
//! to cron or a systemd timer.

use std::fs::OpenOptions;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

use gpuwatch_common::config::{AppConfig, LogFormat};
use gpuwatch_engine::orchestrator::{Orchestrator, OrchestratorSettings};
use gpuwatch_engine::sampler::{CommandQuery, GpuSampler};
use gpuwatch_notifier::{
    CommandShutdown, Notifier, NotifierSettings, TcpProbe, TemplateStore, WebhookTransport,
};

/// Matches every `gpuwatch_*` crate by target prefix.
const DEFAULT_FILTER: &str = "gpuwatch=info";

fn main() -> anyhow::Result<()> {
    // Load configuration; errors are reported once by `main`'s return value
    let config = AppConfig::from_env()?;

    // Initialize tracing
    init_tracing(&config)?;

    tracing::info!(
        host = %config.host_name,
        threshold = config.threshold,
        max_retries = config.max_retries,
        "Service has started."
    );

    let loaded;
    let templates = match &config.templates_path {
        Some(path) => {
            loaded = TemplateStore::from_path(path).inspect_err(|e| {
                tracing::error!(path = %path.display(), error = %e, "Failed to load templates");
            })?;
            &loaded
        }
        None => TemplateStore::builtin(),
    };

    let notifier = Notifier::new(
        templates,
        Box::new(TcpProbe::new(config.probe_address.clone(), config.probe_timeout)),
        Box::new(WebhookTransport::new(config.webhook_url.clone(), config.http_timeout)?),
        Box::new(CommandShutdown::new(config.shutdown_command.clone())),
        NotifierSettings::from(&config),
    );

    let orchestrator = Orchestrator::new(
        GpuSampler::new(Box::new(CommandQuery::new(config.query_command.clone()))),
        notifier,
        OrchestratorSettings::from(&config),
    );

    let report = orchestrator.run().inspect_err(|e| {
        tracing::error!(error = %e, contract = e.is_contract_error(), "Sampling pass aborted");
    })?;

    if report.shut_down() {
        tracing::warn!("Pass ended with host shutdown");
    }

    tracing::info!("Service has stopped.");
    Ok(())
}

fn init_tracing(config: &AppConfig) -> anyhow::Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_path)?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false);

    match config.log_format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }

    Ok(())
}
