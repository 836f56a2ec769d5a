pub mod groups;

use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use thiserror::Error;
use walkdir::WalkDir;

use crate::durations::DurationEntry;
use crate::probe::{ProbeResult, ProbeStatus, Prober};
use crate::SUPPORTED_EXTENSIONS;
use groups::GroupTable;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Not a directory: {0}")]
    NotADirectory(String),
    #[error("Could not start worker pool: {0}")]
    ThreadPool(String),
}

/// Directory layout to scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMode {
    /// Audio files directly in the root; entries have no group.
    Flat,
    /// One level of sub-folders, each folder name resolved to a group.
    Grouped,
}

/// An audio file found by the walk, not yet probed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFile {
    pub path: PathBuf,
    pub id: String,
    pub group: Option<String>,
}

pub struct ScanResult {
    pub entries: Vec<DurationEntry>,
    /// Probes that did not come back `Ok`, in scan order.
    pub problems: Vec<ProbeResult>,
    pub ok: u64,
    pub unavailable: u64,
    pub errors: u64,
}

/// True if the path has one of the supported audio extensions (any case).
pub fn is_audio_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| SUPPORTED_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Walk `root` and list the audio files a scan in `mode` would probe.
///
/// Order follows the directory walk and is not meaningful.
pub fn collect_files(
    root: &Path,
    mode: ScanMode,
    groups: &GroupTable,
) -> Result<Vec<AudioFile>, ScanError> {
    let meta = std::fs::metadata(root).map_err(|source| ScanError::Io {
        path: root.display().to_string(),
        source,
    })?;
    if !meta.is_dir() {
        return Err(ScanError::NotADirectory(root.display().to_string()));
    }

    let file_depth = match mode {
        ScanMode::Flat => 1,
        ScanMode::Grouped => 2,
    };

    let mut files = Vec::new();
    let walker = WalkDir::new(root)
        .follow_links(true)
        .min_depth(1)
        .max_depth(file_depth);

    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                log::warn!("Skipping unreadable entry under {}: {}", root.display(), e);
                continue;
            }
        };
        if !entry.file_type().is_file() || !is_audio_file(entry.path()) {
            continue;
        }
        if entry.depth() != file_depth {
            log::debug!("Skipping {} (not inside a group folder)", entry.path().display());
            continue;
        }

        let id = entry.file_name().to_string_lossy().to_string();
        let group = match mode {
            ScanMode::Flat => None,
            ScanMode::Grouped => {
                let folder = entry
                    .path()
                    .parent()
                    .and_then(|p| p.file_name())
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default();
                let tag = groups.resolve(&folder);
                if tag.is_fallback() {
                    log::debug!("Folder {:?} not in group table, using {:?}", folder, tag.as_str());
                }
                Some(tag.into_string())
            }
        };

        files.push(AudioFile {
            path: entry.into_path(),
            id,
            group,
        });
    }

    Ok(files)
}

/// Probe every audio file under `root` with up to `workers` probes in flight.
///
/// A file that fails to probe still yields an entry (duration 0); only a bad
/// root aborts the scan.
pub fn scan(
    root: &Path,
    mode: ScanMode,
    groups: &GroupTable,
    prober: &Prober,
    workers: usize,
) -> Result<ScanResult, ScanError> {
    let files = collect_files(root, mode, groups)?;
    log::info!(
        "Probing {} files under {} with {} workers",
        files.len(),
        root.display(),
        workers
    );

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} ({per_sec}) ({eta}) {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-"),
    );
    pb.set_message("Probing...");

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers.max(1))
        .build()
        .map_err(|e| ScanError::ThreadPool(e.to_string()))?;

    let probed: Vec<(AudioFile, ProbeResult)> = pool.install(|| {
        files
            .into_par_iter()
            .map(|file| {
                let result = prober.probe(&file.path);
                pb.inc(1);
                (file, result)
            })
            .collect()
    });

    let mut result = ScanResult {
        entries: Vec::with_capacity(probed.len()),
        problems: Vec::new(),
        ok: 0,
        unavailable: 0,
        errors: 0,
    };

    for (file, probe) in probed {
        match probe.status {
            ProbeStatus::Ok => result.ok += 1,
            ProbeStatus::Unavailable => result.unavailable += 1,
            ProbeStatus::Error(_) => result.errors += 1,
        }
        result
            .entries
            .push(DurationEntry::new(file.id, file.group, probe.duration_ms));
        if probe.status != ProbeStatus::Ok {
            result.problems.push(probe);
        }
    }

    pb.finish_with_message(format!(
        "Done: {} ok, {} unavailable, {} errors",
        result.ok, result.unavailable, result.errors
    ));

    Ok(result)
}
