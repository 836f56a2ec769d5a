use std::io::Write;
use std::path::{Path, PathBuf};

use super::CatalogError;

/// Exclusive hold on a catalog file for one load-merge-write run.
///
/// Backed by a `<catalog>.lock` file created with `create_new`; released when
/// dropped. A stale lock left by a crashed run must be removed by hand.
#[derive(Debug)]
pub struct CatalogLock {
    path: PathBuf,
}

impl CatalogLock {
    pub fn acquire(catalog: &Path) -> Result<Self, CatalogError> {
        let path = lock_path(catalog);
        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|source| {
                if source.kind() == std::io::ErrorKind::AlreadyExists {
                    CatalogError::Locked(path.display().to_string())
                } else {
                    CatalogError::Io {
                        path: path.display().to_string(),
                        source,
                    }
                }
            })?;
        writeln!(file, "{}", std::process::id()).ok();
        log::debug!("Acquired {}", path.display());
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for CatalogLock {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            log::warn!("Could not remove lock {}: {}", self.path.display(), e);
        }
    }
}

fn lock_path(catalog: &Path) -> PathBuf {
    let mut name = catalog
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".lock");
    catalog.with_file_name(name)
}
