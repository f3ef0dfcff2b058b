//! Host shutdown — the last-resort escalation when connectivity never returns.

use std::process::Command;

use gpuwatch_common::error::MonitorError;

pub trait ShutdownAction {
    fn shutdown(&self) -> Result<(), MonitorError>;
}

/// Runs a privileged halt command such as `shutdown -h now`.
pub struct CommandShutdown {
    argv: Vec<String>,
}

impl CommandShutdown {
    pub fn new(argv: Vec<String>) -> Self {
        Self { argv }
    }
}

impl ShutdownAction for CommandShutdown {
    fn shutdown(&self) -> Result<(), MonitorError> {
        let Some((program, args)) = self.argv.split_first() else {
            return Err(MonitorError::Shutdown("empty shutdown command".to_string()));
        };

        tracing::warn!(command = %self.argv.join(" "), "Invoking host shutdown");

        let status = Command::new(program)
            .args(args)
            .status()
            .map_err(|e| MonitorError::Shutdown(format!("failed to run {program}: {e}")))?;

        if status.success() {
            Ok(())
        } else {
            Err(MonitorError::Shutdown(format!("{program} exited with {status}")))
        }
    }
}
