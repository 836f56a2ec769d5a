mod atomic;
pub mod catalog;
pub mod config;
pub mod durations;
pub mod inspect;
pub mod probe;
pub mod report;
pub mod scanner;

/// Audio file extensions picked up by a scan
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    "mp3", "m4a", "aac", "wav", "flac", "ogg", "opus", "aif", "aiff",
];

/// Application name for XDG paths
pub const APP_NAME: &str = "rinktunes";
