use std::path::PathBuf;
use std::time::Duration;

use chrono::format::{Item, StrftimeItems};

use crate::duration::parse_duration;
use crate::error::MonitorError;
use crate::host;

const ENV_PREFIX: &str = "GPUWATCH_";

/// Log line encoding for the service log file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// Global monitor configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Incoming-webhook URL the rendered payload is POSTed to
    pub webhook_url: String,

    /// Temperature in °C a reading must strictly exceed to be reported (default: 10)
    pub threshold: i64,

    /// Connectivity retries before the host is shut down (default: 10)
    pub max_retries: u32,

    /// Delay between connectivity retries (default: "50s")
    pub retry_interval: Duration,

    /// `host:port` the connectivity probe connects to (default: 8.8.8.8:53)
    pub probe_address: String,

    /// Connect timeout for the connectivity probe (default: "5s")
    pub probe_timeout: Duration,

    /// Command run when retries are exhausted, as argv
    pub shutdown_command: Vec<String>,

    /// Command that prints `<model>, <temperature>` rows, as argv
    pub query_command: Vec<String>,

    /// Append-only service log (default: service.log)
    pub log_path: PathBuf,

    pub log_format: LogFormat,

    /// Host identifier placed into notification contexts
    pub host_name: String,

    /// strftime format for context timestamps
    pub timestamp_format: String,

    /// Optional JSON file replacing the built-in templates
    pub templates_path: Option<PathBuf>,

    /// Request timeout for webhook delivery (default: "10s")
    pub http_timeout: Duration,
}

impl AppConfig {
    /// Load configuration from environment variables (and `.env`, if present).
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self::from_lookup(|key| std::env::var(key).ok())?)
    }

    /// Build the configuration from an arbitrary `GPUWATCH_*` key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, MonitorError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}")).filter(|v| !v.is_empty());
        let var_or = |name: &str, default: &str| var(name).unwrap_or_else(|| default.to_string());

        let webhook_url = var("WEBHOOK_URL").ok_or_else(|| {
            MonitorError::Config(format!("{ENV_PREFIX}WEBHOOK_URL environment variable is required"))
        })?;

        let threshold = var_or("THRESHOLD", "10").parse().map_err(|_| {
            MonitorError::Config(format!("{ENV_PREFIX}THRESHOLD must be a valid integer"))
        })?;

        let max_retries = var_or("MAX_RETRIES", "10").parse().map_err(|_| {
            MonitorError::Config(format!("{ENV_PREFIX}MAX_RETRIES must be a valid u32"))
        })?;

        let shutdown_command = split_command(&var_or("SHUTDOWN_COMMAND", "shutdown -h now"));
        if shutdown_command.is_empty() {
            return Err(MonitorError::Config(format!(
                "{ENV_PREFIX}SHUTDOWN_COMMAND must not be blank"
            )));
        }

        let query_command = split_command(&var_or(
            "QUERY_COMMAND",
            "nvidia-smi --query-gpu=name,temperature.gpu --format=csv,noheader,nounits",
        ));
        if query_command.is_empty() {
            return Err(MonitorError::Config(format!(
                "{ENV_PREFIX}QUERY_COMMAND must not be blank"
            )));
        }

        let log_format = match var_or("LOG_FORMAT", "text").to_lowercase().as_str() {
            "text" => LogFormat::Text,
            "json" => LogFormat::Json,
            other => {
                return Err(MonitorError::Config(format!(
                    "{ENV_PREFIX}LOG_FORMAT must be 'text' or 'json', got '{other}'"
                )));
            }
        };

        let timestamp_format = var_or("TIMESTAMP_FORMAT", "%Y-%m-%d %H:%M:%S %Z");
        if StrftimeItems::new(&timestamp_format).any(|item| matches!(item, Item::Error)) {
            return Err(MonitorError::Config(format!(
                "{ENV_PREFIX}TIMESTAMP_FORMAT is not a valid strftime format: '{timestamp_format}'"
            )));
        }

        let probe_timeout = parse_duration(&var_or("PROBE_TIMEOUT", "5s"))?;
        if probe_timeout.is_zero() {
            return Err(MonitorError::Config(format!(
                "{ENV_PREFIX}PROBE_TIMEOUT must be greater than zero"
            )));
        }

        Ok(Self {
            webhook_url,
            threshold,
            max_retries,
            retry_interval: parse_duration(&var_or("RETRY_INTERVAL", "50s"))?,
            probe_address: var_or("PROBE_ADDRESS", "8.8.8.8:53"),
            probe_timeout,
            shutdown_command,
            query_command,
            log_path: PathBuf::from(var_or("LOG_PATH", "service.log")),
            log_format,
            host_name: var("HOST_NAME").unwrap_or_else(host::node_name),
            timestamp_format,
            templates_path: var("TEMPLATES_PATH").map(PathBuf::from),
            http_timeout: parse_duration(&var_or("HTTP_TIMEOUT", "10s"))?,
        })
    }
}

fn split_command(raw: &str) -> Vec<String> {
    raw.split_whitespace().map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (format!("{ENV_PREFIX}{k}"), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_lookup(lookup(&[
            ("WEBHOOK_URL", "https://chat.example.com/hooks/abc"),
            ("HOST_NAME", "gpu-01"),
        ]))
        .unwrap();

        assert_eq!(config.threshold, 10);
        assert_eq!(config.max_retries, 10);
        assert_eq!(config.retry_interval, Duration::from_secs(50));
        assert_eq!(config.probe_address, "8.8.8.8:53");
        assert_eq!(config.probe_timeout, Duration::from_secs(5));
        assert_eq!(config.shutdown_command, vec!["shutdown", "-h", "now"]);
        assert_eq!(config.query_command[0], "nvidia-smi");
        assert_eq!(config.log_path, PathBuf::from("service.log"));
        assert_eq!(config.log_format, LogFormat::Text);
        assert_eq!(config.host_name, "gpu-01");
        assert!(config.templates_path.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = AppConfig::from_lookup(lookup(&[
            ("WEBHOOK_URL", "http://localhost/hook"),
            ("THRESHOLD", "80"),
            ("MAX_RETRIES", "3"),
            ("RETRY_INTERVAL", "500ms"),
            ("SHUTDOWN_COMMAND", "systemctl poweroff"),
            ("LOG_FORMAT", "JSON"),
            ("TEMPLATES_PATH", "/etc/gpuwatch/templates.json"),
        ]))
        .unwrap();

        assert_eq!(config.threshold, 80);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.retry_interval, Duration::from_millis(500));
        assert_eq!(config.shutdown_command, vec!["systemctl", "poweroff"]);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(
            config.templates_path,
            Some(PathBuf::from("/etc/gpuwatch/templates.json"))
        );
    }

    #[test]
    fn test_webhook_url_required() {
        let err = AppConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, MonitorError::Config(msg) if msg.contains("WEBHOOK_URL")));
    }

    #[test]
    fn test_bad_interval_propagates() {
        let err = AppConfig::from_lookup(lookup(&[
            ("WEBHOOK_URL", "http://localhost/hook"),
            ("RETRY_INTERVAL", "50x"),
        ]))
        .unwrap_err();
        assert!(matches!(err, MonitorError::UnsupportedDuration(_)));
    }

    #[test]
    fn test_zero_probe_timeout_rejected() {
        let err = AppConfig::from_lookup(lookup(&[
            ("WEBHOOK_URL", "http://localhost/hook"),
            ("PROBE_TIMEOUT", "0ms"),
        ]))
        .unwrap_err();
        assert!(matches!(err, MonitorError::Config(_)));
    }

    #[test]
    fn test_bad_threshold() {
        let err = AppConfig::from_lookup(lookup(&[
            ("WEBHOOK_URL", "http://localhost/hook"),
            ("THRESHOLD", "hot"),
        ]))
        .unwrap_err();
        assert!(matches!(err, MonitorError::Config(_)));
    }

    #[test]
    fn test_bad_timestamp_format() {
        let err = AppConfig::from_lookup(lookup(&[
            ("WEBHOOK_URL", "http://localhost/hook"),
            ("TIMESTAMP_FORMAT", "%Q"),
        ]))
        .unwrap_err();
        assert!(matches!(err, MonitorError::Config(_)));
    }
}
