//! The song catalog: a hand-maintained JSON document whose named list of song
//! records gets its `duration` fields patched from a [`DurationTable`].
//!
//! The document is kept as a `serde_json::Value` with insertion-ordered maps,
//! so every field this module does not own (and its position) survives a
//! rewrite untouched.

pub mod lock;

use std::path::Path;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::durations::DurationTable;
pub use lock::CatalogLock;

/// Field holding the song's id (its audio file name).
pub const ID_FIELD: &str = "id";
/// Field holding the song's duration in milliseconds.
pub const DURATION_FIELD: &str = "duration";

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Catalog is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Unexpected catalog layout: {0}")]
    Shape(String),
    #[error("Catalog is locked by another run ({0} exists)")]
    Locked(String),
}

/// Read-only view of one song record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub id: String,
    pub duration: Option<i64>,
}

/// Outcome of merging a duration table into a catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Songs whose duration was set from the table.
    pub updated: usize,
    /// Catalog ids with no duration in the table, in catalog order.
    pub unmatched: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Catalog {
    document: Value,
    list_key: String,
    trailing_newline: bool,
}

impl Catalog {
    /// Parse catalog text. `list_key` names the song list in the top-level
    /// object; a missing list is treated as empty.
    pub fn parse(contents: &str, list_key: &str) -> Result<Self, CatalogError> {
        let document: Value = serde_json::from_str(contents)?;

        let root = document
            .as_object()
            .ok_or_else(|| CatalogError::Shape("top level is not an object".to_string()))?;
        match root.get(list_key) {
            None => log::warn!("Catalog has no \"{}\" list; nothing to update", list_key),
            Some(Value::Array(songs)) => {
                if let Some(i) = songs.iter().position(|s| !s.is_object()) {
                    return Err(CatalogError::Shape(format!(
                        "\"{}\"[{}] is not an object",
                        list_key, i
                    )));
                }
            }
            Some(_) => {
                return Err(CatalogError::Shape(format!("\"{}\" is not a list", list_key)));
            }
        }

        Ok(Self {
            document,
            list_key: list_key.to_string(),
            trailing_newline: contents.ends_with('\n'),
        })
    }

    pub fn load(path: &Path, list_key: &str) -> Result<Self, CatalogError> {
        let contents = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let catalog = Self::parse(&contents, list_key)?;
        log::info!("Loaded {} songs from {}", catalog.len(), path.display());
        Ok(catalog)
    }

    /// Serialize with two-space indentation, non-ASCII kept verbatim, and the
    /// same trailing newline (or lack of one) as the parsed input.
    pub fn to_json_string(&self) -> Result<String, CatalogError> {
        let mut json = serde_json::to_string_pretty(&self.document)?;
        if self.trailing_newline {
            json.push('\n');
        }
        Ok(json)
    }

    /// Rewrite the whole catalog at `path` atomically.
    pub fn save(&self, path: &Path) -> Result<(), CatalogError> {
        let json = self.to_json_string()?;
        crate::atomic::write_atomic(path, json.as_bytes()).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        log::info!("Wrote {} songs to {}", self.len(), path.display());
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.songs().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Songs in catalog order.
    pub fn entries(&self) -> Vec<CatalogEntry> {
        self.songs()
            .map(|song| CatalogEntry {
                id: id_label(song),
                duration: song.get(DURATION_FIELD).and_then(Value::as_i64),
            })
            .collect()
    }

    fn songs(&self) -> impl Iterator<Item = &Map<String, Value>> {
        self.document
            .get(&self.list_key)
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(Value::as_object)
    }

    fn songs_mut(&mut self) -> impl Iterator<Item = &mut Map<String, Value>> {
        self.document
            .get_mut(&self.list_key)
            .and_then(Value::as_array_mut)
            .into_iter()
            .flatten()
            .filter_map(Value::as_object_mut)
    }
}

/// Set `duration` on every song whose id is in `durations`.
///
/// Songs not in the table keep their current duration and are reported as
/// unmatched. Table ids with no song are ignored. Songs are never added or
/// removed.
pub fn reconcile(catalog: &mut Catalog, durations: &DurationTable) -> ReconcileReport {
    let mut report = ReconcileReport::default();

    for song in catalog.songs_mut() {
        let duration = song
            .get(ID_FIELD)
            .and_then(Value::as_str)
            .and_then(|id| durations.get(id));

        match duration {
            Some(ms) => {
                song.insert(DURATION_FIELD.to_string(), Value::from(ms));
                report.updated += 1;
            }
            None => report.unmatched.push(id_label(song)),
        }
    }

    report
}

/// Lock, load, reconcile and rewrite the catalog at `path`.
///
/// The catalog is rewritten even when nothing changed. With `dry_run` the
/// merge is computed and reported but the file is left alone. Any failure
/// leaves the file as it was.
pub fn reconcile_file(
    path: &Path,
    list_key: &str,
    durations: &DurationTable,
    dry_run: bool,
) -> Result<ReconcileReport, CatalogError> {
    let _lock = CatalogLock::acquire(path)?;
    let mut catalog = Catalog::load(path, list_key)?;
    let report = reconcile(&mut catalog, durations);
    if dry_run {
        log::info!("Dry run: {} not written", path.display());
    } else {
        catalog.save(path)?;
    }
    Ok(report)
}

// Songs without a string id can never match. A missing or null id reads as
// "", anything else is reported by its raw JSON.
fn id_label(song: &Map<String, Value>) -> String {
    match song.get(ID_FIELD) {
        Some(Value::String(id)) => id.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIST: &str = "firebaseSongs";

    fn table(pairs: &[(&str, u64)]) -> DurationTable {
        pairs.iter().map(|(id, ms)| (id.to_string(), *ms)).collect()
    }

    fn two_songs() -> Catalog {
        Catalog::parse(
            r#"{"firebaseSongs": [{"id": "a.mp3", "duration": 0}, {"id": "b.mp3", "duration": 0}]}"#,
            LIST,
        )
        .unwrap()
    }

    #[test]
    fn updates_matching_and_reports_unmatched() {
        let mut catalog = two_songs();
        let report = reconcile(&mut catalog, &table(&[("a.mp3", 5000)]));

        assert_eq!(report.updated, 1);
        assert_eq!(report.unmatched, vec!["b.mp3".to_string()]);
        assert_eq!(
            catalog.entries(),
            vec![
                CatalogEntry { id: "a.mp3".into(), duration: Some(5000) },
                CatalogEntry { id: "b.mp3".into(), duration: Some(0) },
            ]
        );
    }

    #[test]
    fn unmatched_keep_prior_duration_in_catalog_order() {
        let mut catalog = Catalog::parse(
            r#"{"firebaseSongs": [
                {"id": "z.mp3", "duration": 111},
                {"id": "m.mp3", "duration": 222},
                {"id": "a.mp3", "duration": 333}
            ]}"#,
            LIST,
        )
        .unwrap();
        let report = reconcile(&mut catalog, &table(&[("m.mp3", 1)]));

        assert_eq!(report.unmatched, vec!["z.mp3".to_string(), "a.mp3".to_string()]);
        let durations: Vec<Option<i64>> = catalog.entries().iter().map(|e| e.duration).collect();
        assert_eq!(durations, vec![Some(111), Some(1), Some(333)]);
    }

    #[test]
    fn extra_table_ids_are_ignored() {
        let mut catalog = two_songs();
        let report = reconcile(
            &mut catalog,
            &table(&[("a.mp3", 1), ("b.mp3", 2), ("not_in_catalog.mp3", 3)]),
        );
        assert_eq!(report.updated, 2);
        assert!(report.unmatched.is_empty());
        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn repeated_ids_are_counted_each_time() {
        let mut catalog = Catalog::parse(
            r#"{"firebaseSongs": [{"id": "a.mp3"}, {"id": "a.mp3"}]}"#,
            LIST,
        )
        .unwrap();
        let report = reconcile(&mut catalog, &table(&[("a.mp3", 7)]));
        assert_eq!(report.updated, 2);
    }

    #[test]
    fn reconcile_is_idempotent() {
        let durations = table(&[("a.mp3", 5000)]);
        let mut once = two_songs();
        reconcile(&mut once, &durations);
        let mut twice = once.clone();
        reconcile(&mut twice, &durations);
        assert_eq!(once.to_json_string().unwrap(), twice.to_json_string().unwrap());
    }

    #[test]
    fn preserves_other_fields_order_and_unicode() {
        let input = r#"{
  "firebaseSongs": [
    {
      "id": "hey_baby_by_dj_ötzi.mp3",
      "name": "Hey Baby",
      "duration": 0,
      "group": "crowd",
      "startSeconds": 12
    }
  ],
  "version": 3
}"#;
        let mut catalog = Catalog::parse(input, LIST).unwrap();
        reconcile(&mut catalog, &table(&[("hey_baby_by_dj_ötzi.mp3", 219_559)]));

        let expected = input.replace("\"duration\": 0", "\"duration\": 219559");
        assert_eq!(catalog.to_json_string().unwrap(), expected);
    }

    #[test]
    fn unchanged_input_round_trips_byte_for_byte() {
        let input = "{\n  \"firebaseSongs\": [\n    {\n      \"id\": \"a.mp3\",\n      \"duration\": 5000\n    }\n  ]\n}\n";
        let catalog = Catalog::parse(input, LIST).unwrap();
        assert_eq!(catalog.to_json_string().unwrap(), input);
    }

    #[test]
    fn missing_duration_field_is_appended() {
        let mut catalog =
            Catalog::parse(r#"{"firebaseSongs": [{"id": "a.mp3", "name": "A"}]}"#, LIST).unwrap();
        reconcile(&mut catalog, &table(&[("a.mp3", 42)]));
        let json = catalog.to_json_string().unwrap();
        assert!(json.find("\"name\"").unwrap() < json.find("\"duration\"").unwrap());
    }

    #[test]
    fn songs_without_id_are_unmatched() {
        let mut catalog = Catalog::parse(
            r#"{"firebaseSongs": [{"name": "no id"}, {"id": 17}]}"#,
            LIST,
        )
        .unwrap();
        let report = reconcile(&mut catalog, &table(&[("17", 1)]));
        assert_eq!(report.updated, 0);
        assert_eq!(report.unmatched, vec![String::new(), "17".to_string()]);
    }

    #[test]
    fn missing_list_is_empty() {
        let mut catalog = Catalog::parse(r#"{"otherSongs": []}"#, LIST).unwrap();
        assert!(catalog.is_empty());
        assert_eq!(reconcile(&mut catalog, &table(&[("a.mp3", 1)])), ReconcileReport::default());
    }

    #[test]
    fn bad_layouts_are_rejected() {
        assert!(matches!(Catalog::parse("[1, 2]", LIST), Err(CatalogError::Shape(_))));
        assert!(matches!(
            Catalog::parse(r#"{"firebaseSongs": {}}"#, LIST),
            Err(CatalogError::Shape(_))
        ));
        assert!(matches!(
            Catalog::parse(r#"{"firebaseSongs": [{"id": "a.mp3"}, "b.mp3"]}"#, LIST),
            Err(CatalogError::Shape(_))
        ));
        assert!(matches!(Catalog::parse("{not json", LIST), Err(CatalogError::Json(_))));
    }

    #[test]
    fn custom_list_key() {
        let mut catalog =
            Catalog::parse(r#"{"warmup": [{"id": "a.mp3", "duration": 0}]}"#, "warmup").unwrap();
        assert_eq!(reconcile(&mut catalog, &table(&[("a.mp3", 9)])).updated, 1);
    }

    #[test]
    fn reconcile_file_rewrites_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("songs.json");
        std::fs::write(
            &path,
            r#"{"firebaseSongs": [{"id": "a.mp3", "duration": 0}, {"id": "b.mp3", "duration": 0}]}"#,
        )
        .unwrap();

        let report = reconcile_file(&path, LIST, &table(&[("a.mp3", 5000)]), false).unwrap();
        assert_eq!(report.updated, 1);

        let written = Catalog::load(&path, LIST).unwrap();
        assert_eq!(written.entries()[0].duration, Some(5000));
        assert!(!dir.path().join("songs.json.lock").exists());

        // Second run with the same table leaves identical bytes
        let first = std::fs::read(&path).unwrap();
        reconcile_file(&path, LIST, &table(&[("a.mp3", 5000)]), false).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), first);
    }

    #[test]
    fn reconcile_file_dry_run_leaves_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("songs.json");
        let original = r#"{"firebaseSongs": [{"id": "a.mp3", "duration": 0}]}"#;
        std::fs::write(&path, original).unwrap();

        let report = reconcile_file(&path, LIST, &table(&[("a.mp3", 5000)]), true).unwrap();
        assert_eq!(report.updated, 1);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), original);
    }

    #[test]
    fn reconcile_file_bad_json_leaves_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("songs.json");
        std::fs::write(&path, "{\"firebaseSongs\": [").unwrap();

        assert!(reconcile_file(&path, LIST, &table(&[]), false).is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{\"firebaseSongs\": [");
        assert!(!dir.path().join("songs.json.lock").exists());
    }

    #[test]
    fn null_id_reads_as_empty() {
        let mut catalog =
            Catalog::parse(r#"{"firebaseSongs": [{"id": null, "duration": 4}]}"#, LIST).unwrap();
        let report = reconcile(&mut catalog, &table(&[("null", 1)]));
        assert_eq!(report.unmatched, vec![String::new()]);
        assert_eq!(catalog.entries()[0].duration, Some(4));
    }

    #[test]
    fn reconcile_file_rewrites_even_when_nothing_matches() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("songs.json");
        let compact = r#"{"firebaseSongs":[{"id":"a.mp3","duration":0}]}"#;
        std::fs::write(&path, compact).unwrap();

        let report = reconcile_file(&path, LIST, &table(&[("other.mp3", 1)]), false).unwrap();
        assert_eq!(report.updated, 0);
        assert_eq!(report.unmatched, vec!["a.mp3".to_string()]);

        let expected = Catalog::parse(compact, LIST).unwrap().to_json_string().unwrap();
        assert_ne!(expected, compact);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), expected);
    }

    #[test]
    fn reconcile_file_write_failure_leaves_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("songs.json");
        let original = r#"{"firebaseSongs": [{"id": "a.mp3", "duration": 0}]}"#;
        std::fs::write(&path, original).unwrap();
        // A directory where the temp file should go makes the write fail
        std::fs::create_dir(dir.path().join(".songs.json.tmp")).unwrap();

        let result = reconcile_file(&path, LIST, &table(&[("a.mp3", 5000)]), false);
        assert!(matches!(result, Err(CatalogError::Io { .. })));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), original);
        assert!(!dir.path().join("songs.json.lock").exists());
    }

    #[test]
    fn reconcile_file_refuses_when_locked() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("songs.json");
        std::fs::write(&path, r#"{"firebaseSongs": []}"#).unwrap();

        let _held = CatalogLock::acquire(&path).unwrap();
        assert!(matches!(
            reconcile_file(&path, LIST, &table(&[]), false),
            Err(CatalogError::Locked(_))
        ));
    }
}
