//! One monitoring pass: sample → classify → notify.
//!
//! Notifications go out one at a time in the order the GPUs were reported.
//! If a delivery escalates to host shutdown, the remaining notifications are
//! dropped.

use gpuwatch_common::config::AppConfig;
use gpuwatch_common::error::MonitorError;
use gpuwatch_common::host;
use gpuwatch_common::types::{Context, Reading, keys};
use gpuwatch_notifier::template::{FAILURE, SUCCESS};
use gpuwatch_notifier::{Delivery, Notifier};

use crate::sampler::{GpuSampler, Sample, SamplerFailure, classify};

/// Per-pass inputs taken from [`AppConfig`].
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    /// Strict upper bound in °C.
    pub threshold: i64,
    pub host_name: String,
    pub timestamp_format: String,
}

impl From<&AppConfig> for OrchestratorSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            threshold: config.threshold,
            host_name: config.host_name.clone(),
            timestamp_format: config.timestamp_format.clone(),
        }
    }
}

/// What a pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassReport {
    /// Number of GPUs sampled.
    pub readings: usize,
    /// Readings strictly above the threshold.
    pub over_threshold: usize,
    /// Outcome of every notification attempted, in send order.
    pub deliveries: Vec<Delivery>,
    pub sampler_failure: Option<SamplerFailure>,
}

impl PassReport {
    pub fn shut_down(&self) -> bool {
        self.deliveries.iter().any(Delivery::is_shutdown)
    }
}

/// Drives one monitoring pass from a sampler to a notifier.
pub struct Orchestrator<'a> {
    sampler: GpuSampler<'a>,
    notifier: Notifier<'a>,
    settings: OrchestratorSettings,
}

impl<'a> Orchestrator<'a> {
    pub fn new(sampler: GpuSampler<'a>, notifier: Notifier<'a>, settings: OrchestratorSettings) -> Self {
        Self {
            sampler,
            notifier,
            settings,
        }
    }

    /// Run a single sampling pass.
    ///
    /// Contract errors (malformed sampler output, unknown template) and
    /// transport errors abort the pass.
    pub fn run(&self) -> Result<PassReport, MonitorError> {
        let readings = match self.sampler.sample_all()? {
            Sample::Readings(readings) => readings,
            Sample::Unavailable(failure) => return self.report_sampler_failure(failure),
        };

        let over: Vec<&Reading> = readings
            .iter()
            .filter(|r| classify(r, self.settings.threshold))
            .collect();

        let mut report = PassReport {
            readings: readings.len(),
            over_threshold: over.len(),
            ..Default::default()
        };

        for (index, reading) in over.iter().enumerate() {
            let delivery = self.notifier.notify(SUCCESS, &self.reading_context(reading))?;
            report.deliveries.push(delivery);

            if delivery.is_shutdown() {
                tracing::warn!(
                    skipped = over.len() - index - 1,
                    "Host shutdown invoked; remaining notifications dropped"
                );
                break;
            }
        }

        tracing::info!(
            readings = report.readings,
            over_threshold = report.over_threshold,
            sent = report.deliveries.len(),
            "Sampling pass finished"
        );
        Ok(report)
    }

    fn report_sampler_failure(&self, failure: SamplerFailure) -> Result<PassReport, MonitorError> {
        tracing::error!("Couldn't get GPU info from the server; sending failure notification");

        let context = Context::new()
            .with(keys::HOST, &self.settings.host_name)
            .with(keys::MESSAGE, format!("GPU query failed: {failure}"))
            .with(keys::TIMESTAMP, self.now());

        let delivery = self.notifier.notify(FAILURE, &context)?;
        Ok(PassReport {
            deliveries: vec![delivery],
            sampler_failure: Some(failure),
            ..Default::default()
        })
    }

    fn reading_context(&self, reading: &Reading) -> Context {
        Context::new()
            .with(keys::HOST, &self.settings.host_name)
            .with(keys::GPU_MODEL, &reading.gpu_model)
            .with(keys::TEMPERATURE, reading.temperature)
            .with(keys::TIMESTAMP, self.now())
    }

    fn now(&self) -> String {
        host::timestamp(&self.settings.timestamp_format)
    }
}
