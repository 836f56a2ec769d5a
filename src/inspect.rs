//! Side-by-side diagnostics for one troublesome file.
//!
//! Runs several unrelated inspection tools and prints what each says. Nothing
//! here feeds back into probing; it is for eyeballing why a file won't probe.

use std::ffi::OsString;
use std::io::Write;
use std::path::Path;

use crate::probe::{command, ProbeStatus, Prober};

struct Check {
    title: &'static str,
    program: OsString,
    args: Vec<OsString>,
    show_stderr: bool,
}

fn checks(path: &Path, prober: &Prober) -> Vec<Check> {
    let file = path.as_os_str().to_os_string();
    let ffprobe = prober.tool().as_os_str().to_os_string();
    vec![
        Check {
            title: "file command",
            program: "file".into(),
            args: vec![file.clone()],
            show_stderr: false,
        },
        Check {
            title: "afinfo (macOS native)",
            program: "afinfo".into(),
            args: vec![file.clone()],
            show_stderr: true,
        },
        Check {
            title: "mdls (Spotlight metadata)",
            program: "mdls".into(),
            args: vec!["-name".into(), "kMDItemDurationSeconds".into(), file.clone()],
            show_stderr: false,
        },
        Check {
            title: "ffprobe",
            program: ffprobe.clone(),
            args: vec!["-v".into(), "error".into(), "-show_format".into(), file.clone()],
            show_stderr: true,
        },
        Check {
            title: "ffprobe streams",
            program: ffprobe,
            args: vec!["-v".into(), "error".into(), "-show_streams".into(), file],
            show_stderr: true,
        },
    ]
}

/// Print existence, size, and every tool's view of `path` to `out`.
pub fn inspect<W: Write>(out: &mut W, path: &Path, prober: &Prober) -> std::io::Result<()> {
    writeln!(out, "{}", "=".repeat(60))?;
    writeln!(out, "Audio File Inspection")?;
    writeln!(out, "{}", "=".repeat(60))?;

    writeln!(out, "File path: {}", path.display())?;
    let meta = std::fs::metadata(path).ok();
    writeln!(out, "File exists: {}", meta.is_some())?;
    let Some(meta) = meta else {
        writeln!(out)?;
        writeln!(out, "File does not exist!")?;
        return Ok(());
    };
    let size = meta.len();
    writeln!(
        out,
        "File size: {} bytes ({:.2} MB)",
        group_thousands(size),
        size as f64 / 1024.0 / 1024.0
    )?;

    for check in checks(path, prober) {
        writeln!(out)?;
        writeln!(out, "--- {} ---", check.title)?;
        match command::run(&check.program, &check.args, prober.timeout()) {
            Ok(output) => {
                writeln!(out, "stdout: {}", or_empty(&output.stdout))?;
                if check.show_stderr {
                    writeln!(out, "stderr: {}", or_empty(&output.stderr))?;
                }
            }
            Err(e) => writeln!(out, "Error: {e}")?,
        }
    }

    writeln!(out)?;
    writeln!(out, "--- duration probe ---")?;
    let result = prober.probe(path);
    let verdict = match &result.status {
        ProbeStatus::Ok => "ok".to_string(),
        ProbeStatus::Unavailable => "unavailable (empty or N/A)".to_string(),
        ProbeStatus::Error(cause) => format!("error: {cause}"),
    };
    writeln!(out, "status: {verdict}")?;
    writeln!(out, "duration_ms: {}", result.duration_ms)?;

    Ok(())
}

fn or_empty(s: &str) -> &str {
    if s.is_empty() { "(empty)" } else { s }
}

/// `1234567` → `"1,234,567"`.
pub fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
