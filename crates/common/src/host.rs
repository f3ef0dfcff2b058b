//! Host identity and wall-clock helpers used when building contexts.

use chrono::Local;

const KERNEL_HOSTNAME_PATH: &str = "/proc/sys/kernel/hostname";

/// Best-effort host name: `/proc/sys/kernel/hostname`, then `$HOSTNAME`,
/// then `"unknown"`.
pub fn node_name() -> String {
    std::fs::read_to_string(KERNEL_HOSTNAME_PATH)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .or_else(|| std::env::var("HOSTNAME").ok().filter(|s| !s.is_empty()))
        .unwrap_or_else(|| "unknown".to_string())
}

/// Current local time rendered with a strftime-style format.
pub fn timestamp(format: &str) -> String {
    Local::now().format(format).to_string()
}
