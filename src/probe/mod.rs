pub mod command;

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::ProbeConfig;

/// What ffprobe prints when the container has no duration (e.g. an iCloud
/// placeholder that has not been downloaded yet).
pub const UNAVAILABLE_MARKER: &str = "N/A";

/// Outcome class of a single probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeStatus {
    /// Tool printed a usable duration.
    Ok,
    /// Tool ran but printed nothing usable (empty or "N/A").
    Unavailable,
    /// Tool could not be run, timed out, or printed garbage. Carries the cause.
    Error(String),
}

/// Result of probing one file. Duration is 0 for anything but `Ok`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    pub path: PathBuf,
    pub duration_ms: u64,
    pub status: ProbeStatus,
}

/// Reads container durations by shelling out to ffprobe.
#[derive(Debug, Clone)]
pub struct Prober {
    tool: PathBuf,
    timeout: Duration,
}

impl Prober {
    pub fn new(tool: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            tool: tool.into(),
            timeout,
        }
    }

    pub fn from_config(config: &ProbeConfig) -> Self {
        Self::new(config.ffprobe.clone(), Duration::from_secs(config.timeout_secs))
    }

    pub fn tool(&self) -> &Path {
        &self.tool
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Arguments asking for `format.duration` only, printed bare (no section
    /// wrappers, no key), so stdout is a single number of seconds.
    pub fn duration_args(path: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = [
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ]
        .iter()
        .map(OsString::from)
        .collect();
        args.push(path.as_os_str().to_os_string());
        args
    }

    /// Probe one file. Never fails: every problem is folded into the status.
    pub fn probe(&self, path: &Path) -> ProbeResult {
        let (status, duration_ms) =
            match command::run(&self.tool, Self::duration_args(path), self.timeout) {
                Ok(output) => classify_output(&output.stdout),
                Err(e) => (ProbeStatus::Error(e.to_string()), 0),
            };

        match &status {
            ProbeStatus::Ok => {
                log::debug!("{}: {} ms", path.display(), duration_ms);
            }
            ProbeStatus::Unavailable => {
                log::warn!(
                    "Could not read duration for {} (file may still be syncing from cloud storage)",
                    file_label(path)
                );
            }
            ProbeStatus::Error(cause) => {
                log::error!("Error reading {}: {}", path.display(), cause);
            }
        }

        ProbeResult {
            path: path.to_path_buf(),
            duration_ms,
            status,
        }
    }
}

impl Default for Prober {
    fn default() -> Self {
        Self::from_config(&ProbeConfig::default())
    }
}

/// Classify raw ffprobe stdout into a status and a millisecond duration.
///
/// Seconds are converted by multiplying by 1000 and truncating toward zero.
/// Anything that is not a finite, non-negative number is an error.
pub fn classify_output(stdout: &str) -> (ProbeStatus, u64) {
    let text = stdout.trim();
    if text.is_empty() || text == UNAVAILABLE_MARKER {
        return (ProbeStatus::Unavailable, 0);
    }

    match text.parse::<f64>() {
        Ok(secs) if secs.is_finite() && secs >= 0.0 => (ProbeStatus::Ok, (secs * 1000.0) as u64),
        Ok(secs) => (
            ProbeStatus::Error(format!("invalid duration value: {secs}")),
            0,
        ),
        Err(e) => (
            ProbeStatus::Error(format!("could not parse duration {text:?}: {e}")),
            0,
        ),
    }
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}
