//! GPU sampler — runs the external temperature query and parses its rows.
//!
//! The query command must exit 0 and print one `<model>, <temperature>` row
//! per GPU (e.g. `nvidia-smi --query-gpu=name,temperature.gpu
//! --format=csv,noheader,nounits`). A command that cannot run or exits
//! non-zero is a [`SamplerFailure`], which the caller reports as a failure
//! notification. A row that does not match the format is a hard error: it
//! means the tool's output contract changed.

use std::fmt;
use std::process::Command;

use gpuwatch_common::error::MonitorError;
use gpuwatch_common::types::Reading;

/// The query tool could not produce readings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SamplerFailure {
    pub command: String,
    pub reason: String,
}

impl fmt::Display for SamplerFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.command, self.reason)
    }
}

/// Source of raw sampler output.
pub trait GpuQuery {
    fn query(&self) -> Result<String, SamplerFailure>;
}

/// Runs a command to completion and captures its stdout.
pub struct CommandQuery {
    argv: Vec<String>,
}

impl CommandQuery {
    pub fn new(argv: Vec<String>) -> Self {
        Self { argv }
    }

    fn display(&self) -> String {
        self.argv.join(" ")
    }
}

impl GpuQuery for CommandQuery {
    fn query(&self) -> Result<String, SamplerFailure> {
        let failure = |reason: String| SamplerFailure {
            command: self.display(),
            reason,
        };

        let Some((program, args)) = self.argv.split_first() else {
            return Err(failure("empty query command".to_string()));
        };

        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|e| failure(format!("command could not be run ({e})")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stderr = stderr.trim();
            return Err(failure(if stderr.is_empty() {
                format!("exited with {}", output.status)
            } else {
                format!("exited with {}: {stderr}", output.status)
            }));
        }

        String::from_utf8(output.stdout).map_err(|_| failure("output is not valid UTF-8".to_string()))
    }
}

/// Result of one sampling attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sample {
    Readings(Vec<Reading>),
    Unavailable(SamplerFailure),
}

pub struct GpuSampler<'a> {
    query: Box<dyn GpuQuery + 'a>,
}

impl<'a> GpuSampler<'a> {
    pub fn new(query: Box<dyn GpuQuery + 'a>) -> Self {
        Self { query }
    }

    /// Sample every GPU once.
    ///
    /// Tool failures come back as [`Sample::Unavailable`]; only malformed
    /// output is an `Err`.
    pub fn sample_all(&self) -> Result<Sample, MonitorError> {
        let stdout = match self.query.query() {
            Ok(stdout) => stdout,
            Err(failure) => {
                tracing::error!(command = %failure.command, reason = %failure.reason, "GPU query failed");
                return Ok(Sample::Unavailable(failure));
            }
        };

        let readings = parse_rows(&stdout)?;
        if readings.is_empty() {
            tracing::warn!("GPU query returned no readings");
        } else {
            tracing::debug!(count = readings.len(), "Sampled GPUs");
        }
        Ok(Sample::Readings(readings))
    }
}

/// Parse `<model>, <temperature>` rows. Blank lines are ignored.
pub fn parse_rows(stdout: &str) -> Result<Vec<Reading>, MonitorError> {
    stdout
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(parse_row)
        .collect()
}

fn parse_row(line: &str) -> Result<Reading, MonitorError> {
    let malformed = |reason: String| {
        tracing::error!(line, %reason, "Malformed GPU query row");
        MonitorError::MalformedRow {
            line: line.to_string(),
            reason,
        }
    };

    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    let [model, temperature] = fields.as_slice() else {
        return Err(malformed(format!("expected 2 fields, got {}", fields.len())));
    };

    if model.is_empty() {
        return Err(malformed("empty GPU model".to_string()));
    }

    let temperature = temperature
        .parse::<i64>()
        .map_err(|_| malformed(format!("temperature '{temperature}' is not an integer")))?;

    Ok(Reading::new(*model, temperature))
}

/// `true` when the reading is strictly above `threshold`.
pub fn classify(reading: &Reading, threshold: i64) -> bool {
    if reading.temperature > threshold {
        tracing::info!(
            gpu_model = %reading.gpu_model,
            temperature = reading.temperature,
            threshold,
            "{} temperature is above {}. (current temp is {})",
            reading.gpu_model,
            threshold,
            reading.temperature
        );
        true
    } else {
        tracing::info!(
            gpu_model = %reading.gpu_model,
            temperature = reading.temperature,
            threshold,
            "{} temperature is below {}. (current temp is {})",
            reading.gpu_model,
            threshold,
            reading.temperature
        );
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_classify_is_strict() {
        assert!(!classify(&Reading::new("RTX4090", 10), 10));
        assert!(classify(&Reading::new("RTX4090", 11), 10));
        assert!(!classify(&Reading::new("RTX4090", -5), 10));
    }

    #[test]
    fn test_parse_rows() {
        let readings = parse_rows("RTX4090, 85\nNVIDIA A100-SXM4-80GB, 60\n\n").unwrap();
        assert_eq!(
            readings,
            vec![
                Reading::new("RTX4090", 85),
                Reading::new("NVIDIA A100-SXM4-80GB", 60),
            ]
        );
    }

    #[test]
    fn test_parse_rows_empty_output() {
        assert!(parse_rows("").unwrap().is_empty());
    }

    #[test]
    fn test_parse_rows_wrong_field_count() {
        for line in ["RTX4090", "RTX4090, 85, 300W"] {
            assert!(matches!(
                parse_rows(line),
                Err(MonitorError::MalformedRow { .. })
            ));
        }
    }

    #[test]
    fn test_parse_rows_non_integer_temperature() {
        for line in ["RTX4090, hot", "RTX4090, 85.5", "RTX4090, [N/A]", ", 40"] {
            assert!(parse_rows(line).is_err(), "input {line:?}");
        }
    }

    #[test]
    fn test_one_bad_row_fails_the_pass() {
        assert!(parse_rows("RTX4090, 85\ngarbage\nRTX3080, 60").is_err());
    }

    #[test]
    fn test_command_query_success() {
        let query = CommandQuery::new(argv(&["sh", "-c", "printf 'RTX4090, 85\\nRTX3080, 60\\n'"]));
        let sampler = GpuSampler::new(Box::new(query));

        assert_eq!(
            sampler.sample_all().unwrap(),
            Sample::Readings(vec![
                Reading::new("RTX4090", 85),
                Reading::new("RTX3080", 60),
            ])
        );
    }

    #[test]
    fn test_command_query_nonzero_exit() {
        let query = CommandQuery::new(argv(&["sh", "-c", "echo 'NVML: driver not loaded' >&2; exit 9"]));
        let failure = query.query().unwrap_err();
        assert!(failure.reason.contains("driver not loaded"), "{failure}");
    }

    #[test]
    fn test_command_query_missing_binary() {
        let sampler = GpuSampler::new(Box::new(CommandQuery::new(argv(&[
            "gpuwatch-no-such-query-tool",
        ]))));

        match sampler.sample_all().unwrap() {
            Sample::Unavailable(failure) => {
                assert_eq!(failure.command, "gpuwatch-no-such-query-tool");
                assert!(failure.reason.contains("could not be run"));
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn test_command_query_empty_argv() {
        assert!(CommandQuery::new(vec![]).query().is_err());
    }
}
