//! Connectivity-gated delivery with bounded retry and shutdown escalation.
//!
//! ```text
//! ATTEMPT ──reachable──────────────────────────► DELIVERED
//!    │
//!    ├─unreachable, retries < bound──► WAITING ──sleep──► ATTEMPT
//!    │
//!    └─unreachable, retries = bound──► SHUTDOWN
//! ```
//!
//! Only the probe decides whether to retry. An HTTP error status is still a
//! delivery, so a webhook rejecting duplicates can never power the host off.

use std::time::Duration;

use gpuwatch_common::config::AppConfig;
use gpuwatch_common::error::MonitorError;
use gpuwatch_common::types::Context;

use crate::probe::ConnectivityProbe;
use crate::render::render;
use crate::shutdown::ShutdownAction;
use crate::template::TemplateStore;
use crate::transport::Transport;

/// Retry policy for a [`Notifier`].
#[derive(Debug, Clone, Copy)]
pub struct NotifierSettings {
    pub max_retries: u32,
    pub retry_interval: Duration,
}

impl From<&AppConfig> for NotifierSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            retry_interval: config.retry_interval,
        }
    }
}

/// Consecutive connectivity failures within one `notify` call.
///
/// Created at zero for every call and dropped when the call returns, so a
/// delivery always leaves the next call with a fresh count.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RetryState {
    count: u32,
}

impl RetryState {
    pub fn count(&self) -> u32 {
        self.count
    }

    fn exhausted(&self, bound: u32) -> bool {
        self.count >= bound
    }

    fn advance(&mut self) -> u32 {
        self.count += 1;
        self.count
    }
}

/// Terminal state of one `notify` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The webhook answered. `retries` is how many waits preceded delivery.
    Delivered { status: u16, retries: u32 },
    /// Retries ran out and the shutdown action was invoked.
    ShutDown { retries: u32 },
}

impl Delivery {
    pub fn is_shutdown(&self) -> bool {
        matches!(self, Delivery::ShutDown { .. })
    }
}

/// Renders named templates and delivers them while the network is reachable.
///
/// Each `notify` call owns its retry count; the templates, adapters and retry
/// policy are fixed at construction.
pub struct Notifier<'a> {
    templates: &'a TemplateStore,
    probe: Box<dyn ConnectivityProbe + 'a>,
    transport: Box<dyn Transport + 'a>,
    shutdown: Box<dyn ShutdownAction + 'a>,
    settings: NotifierSettings,
}

impl<'a> Notifier<'a> {
    pub fn new(
        templates: &'a TemplateStore,
        probe: Box<dyn ConnectivityProbe + 'a>,
        transport: Box<dyn Transport + 'a>,
        shutdown: Box<dyn ShutdownAction + 'a>,
        settings: NotifierSettings,
    ) -> Self {
        Self {
            templates,
            probe,
            transport,
            shutdown,
            settings,
        }
    }

    /// Render `template_name` with `context` and deliver it.
    ///
    /// Blocks for up to `max_retries * retry_interval` while offline. Errors
    /// are limited to an unknown template and a transport failure after a
    /// successful probe; neither is retried nor escalated.
    pub fn notify(&self, template_name: &str, context: &Context) -> Result<Delivery, MonitorError> {
        let template = self.templates.lookup(template_name)?;

        let missing = template.missing_keys(context);
        if !missing.is_empty() {
            tracing::warn!(
                template = template_name,
                missing = ?missing,
                "Context lacks placeholder values; affected fields are sent unrendered"
            );
        }

        let payload = render(template, context);
        let mut retry = RetryState::default();

        loop {
            if self.probe.is_reachable() {
                let status = self.transport.post(&payload).inspect_err(|e| {
                    tracing::error!(template = template_name, error = %e, "Webhook delivery failed");
                })?;

                let retries = retry.count();
                tracing::info!(
                    status,
                    template = template_name,
                    retries,
                    "Message has been sent to the webhook"
                );
                return Ok(Delivery::Delivered { status, retries });
            }

            if !retry.exhausted(self.settings.max_retries) {
                let attempt = retry.advance();
                tracing::warn!(
                    attempt,
                    max_retries = self.settings.max_retries,
                    "Connection refused, retrying..."
                );
                std::thread::sleep(self.settings.retry_interval);
                continue;
            }

            tracing::error!(
                retries = retry.count(),
                template = template_name,
                "Connectivity retries exhausted; shutting the host down"
            );
            if let Err(e) = self.shutdown.shutdown() {
                tracing::error!(error = %e, "Something went wrong while shutting down");
            }
            return Ok(Delivery::ShutDown {
                retries: retry.count(),
            });
        }
    }
}
