use std::collections::BTreeMap;
use std::path::PathBuf;

use directories::ProjectDirs;
use serde::Deserialize;

/// Name of the song list inside the catalog document.
pub const DEFAULT_CATALOG_LIST_KEY: &str = "firebaseSongs";

/// Application configuration loaded from TOML config file.
/// All fields have sensible defaults — the config file is optional.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Music folder to scan (used when `scan` has no CLI arg).
    pub music_dir: Option<PathBuf>,
    /// Song catalog JSON file patched by `reconcile`.
    pub catalog_path: Option<PathBuf>,
    /// Duration table read by `reconcile` and written by `scan --write-table`.
    pub durations_path: Option<PathBuf>,
    /// Key of the song list inside the catalog document.
    pub catalog_list_key: String,
    /// Number of parallel probe workers. 0 = auto-detect (cores / 2, min 1).
    pub workers: usize,
    /// ffprobe settings.
    pub probe: ProbeConfig,
    /// Extra folder name → group tag mappings (merged over the built-in table).
    pub groups: BTreeMap<String, String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            music_dir: None,
            catalog_path: None,
            durations_path: None,
            catalog_list_key: DEFAULT_CATALOG_LIST_KEY.to_string(),
            workers: 0,
            probe: ProbeConfig::default(),
            groups: BTreeMap::new(),
        }
    }
}

/// External probe tool configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// ffprobe executable (bare name resolved via PATH, or a full path).
    pub ffprobe: PathBuf,
    /// Per-file timeout in seconds before the probe is abandoned.
    pub timeout_secs: u64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            ffprobe: PathBuf::from("ffprobe"),
            timeout_secs: 30,
        }
    }
}

impl AppConfig {
    /// Load config from `~/.config/rinktunes/config.toml`.
    /// Returns default config if file doesn't exist.
    /// Logs a warning if the file exists but can't be parsed.
    pub fn load() -> Self {
        let config_path = Self::config_path();
        match config_path {
            Some(path) if path.exists() => match std::fs::read_to_string(&path) {
                Ok(contents) => match Self::parse(&contents) {
                    Ok(config) => {
                        log::info!("Loaded config from {}", path.display());
                        config
                    }
                    Err(e) => {
                        log::warn!("Failed to parse {}: {}. Using defaults.", path.display(), e);
                        Self::default()
                    }
                },
                Err(e) => {
                    log::warn!("Failed to read {}: {}. Using defaults.", path.display(), e);
                    Self::default()
                }
            },
            _ => {
                log::debug!("No config file found, using defaults");
                Self::default()
            }
        }
    }

    /// Parse config from TOML text.
    pub fn parse(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    /// Resolve worker count: 0 → auto-detect (cores / 2, min 1).
    pub fn resolve_workers(&self) -> usize {
        if self.workers > 0 {
            self.workers
        } else {
            let cores = std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(2);
            (cores / 2).max(1)
        }
    }

    /// Get the config file path.
    fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", crate::APP_NAME).map(|dirs| dirs.config_dir().join("config.toml"))
    }
}
