use std::ffi::{OsStr, OsString};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use thiserror::Error;
use tokio::process::Command;

#[derive(Error, Debug)]
pub enum CommandError {
    #[error("could not run {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{tool} did not finish within {timeout:?}")]
    Timeout { tool: String, timeout: Duration },
    #[error("tokio runtime unavailable: {0}")]
    Runtime(String),
}

/// Captured output of a finished external tool.
#[derive(Debug)]
pub struct ToolOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

// One current-thread runtime per worker thread. Probes run on rayon threads,
// so each thread keeps its own instead of building one per file.
thread_local! {
    static THREAD_RT: Result<tokio::runtime::Runtime, String> =
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| e.to_string());
}

/// Run `program` with `args`, capturing stdout/stderr as lossy UTF-8.
///
/// The child is killed if it outlives `timeout`. The exit status is returned
/// as-is; callers decide whether a non-zero exit matters to them.
pub fn run<P, I, S>(program: P, args: I, timeout: Duration) -> Result<ToolOutput, CommandError>
where
    P: AsRef<OsStr>,
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let program = program.as_ref().to_os_string();
    let args: Vec<OsString> = args.into_iter().map(|a| a.as_ref().to_os_string()).collect();
    let tool = program.to_string_lossy().to_string();

    THREAD_RT.with(|rt| {
        let rt = rt.as_ref().map_err(|e| CommandError::Runtime(e.clone()))?;
        rt.block_on(async {
            let child = Command::new(&program)
                .args(&args)
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true)
                .output();

            match tokio::time::timeout(timeout, child).await {
                Ok(Ok(output)) => Ok(ToolOutput {
                    status: output.status,
                    stdout: String::from_utf8_lossy(&output.stdout).to_string(),
                    stderr: String::from_utf8_lossy(&output.stderr).to_string(),
                }),
                Ok(Err(source)) => Err(CommandError::Spawn { tool, source }),
                Err(_) => Err(CommandError::Timeout { tool, timeout }),
            }
        })
    })
}
