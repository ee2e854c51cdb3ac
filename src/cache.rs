//! On-disk cache of extracted tables
//!
//! Each (table, language) pair owns a directory under the cache root:
//!
//! ```text
//! <root>/<id>-<lang>.lock
//! <root>/<id>-<lang>/<id>-<lang>.csv     canonical table
//! <root>/<id>-<lang>/manifest.json       where and when it was fetched
//! <root>/<id>-<lang>/...                 other archive members
//! ```
//!
//! An entry is cached as soon as its canonical CSV exists. Nothing is ever
//! refetched or expired.

use crate::{
    error::{Error, Result},
    language::Language,
};
use chrono::{DateTime, Utc};
use fs2::FileExt;
use glob::glob;
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, File},
    path::{Path, PathBuf},
};
use tracing::warn;

const MANIFEST_FILE: &str = "manifest.json";

/// Location of one (table, language) pair inside a cache root.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CacheEntry {
    key: String,
    dir: PathBuf,
    csv_path: PathBuf,
    lock_path: PathBuf,
}

impl CacheEntry {
    pub fn new(root: &Path, table_id: &str, language: Language) -> Self {
        let key = format!("{}-{}", table_id, language.tag());
        let dir = root.join(&key);
        Self {
            csv_path: dir.join(format!("{key}.csv")),
            lock_path: root.join(format!("{key}.lock")),
            dir,
            key,
        }
    }

    /// `<id>-<lang>`
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Canonical CSV path, whether or not it exists yet.
    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }

    pub fn is_cached(&self) -> bool {
        self.csv_path.is_file()
    }

    /// Block until this process holds the entry's exclusive lock.
    pub fn lock(&self) -> Result<EntryLock> {
        let file = File::create(&self.lock_path).map_err(Error::io(&self.lock_path))?;
        FileExt::lock_exclusive(&file).map_err(Error::io(&self.lock_path))?;
        Ok(EntryLock { _file: file })
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.dir.join(MANIFEST_FILE)
    }

    pub fn write_manifest(&self, manifest: &Manifest) -> Result<()> {
        let path = self.manifest_path();
        let json = serde_json::to_vec_pretty(manifest).map_err(|source| Error::Manifest {
            path: path.clone(),
            source,
        })?;
        fs::write(&path, json).map_err(Error::io(&path))
    }

    /// `None` when the entry has no manifest, e.g. a hand-seeded file.
    pub fn read_manifest(&self) -> Result<Option<Manifest>> {
        read_manifest_at(&self.manifest_path())
    }
}

/// Held while an entry is being fetched; the lock is released on drop.
#[derive(Debug)]
pub struct EntryLock {
    _file: File,
}

/// Record of how a cache entry was obtained.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Manifest {
    pub table_id: String,
    pub language: Language,
    pub url: String,
    /// Archive member that became the canonical CSV
    pub member: String,
    pub archive_bytes: u64,
    pub fetched_at: DateTime<Utc>,
}

/// A cache entry found on disk.
#[derive(Clone, Debug)]
pub struct CachedTable {
    pub key: String,
    pub csv_path: PathBuf,
    pub size_bytes: u64,
    pub manifest: Option<Manifest>,
}

/// Every complete entry under `root`, sorted by key.
pub fn list_entries(root: &Path) -> Result<Vec<CachedTable>> {
    let pattern = format!("{}/*/", glob::Pattern::escape(&root.to_string_lossy()));
    let dirs = glob(&pattern).expect("escaped cache root should be a valid pattern");
    let mut out = Vec::new();
    for dir in dirs.filter_map(|e| e.ok()) {
        let Some(key) = dir.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            continue;
        };
        let csv_path = dir.join(format!("{key}.csv"));
        let Ok(meta) = fs::metadata(&csv_path) else {
            continue;
        };
        if !meta.is_file() {
            continue;
        }
        let manifest = match read_manifest_at(&dir.join(MANIFEST_FILE)) {
            Ok(m) => m,
            Err(e) => {
                warn!(%key, error = %e, "unreadable manifest");
                None
            }
        };
        out.push(CachedTable {
            key,
            csv_path,
            size_bytes: meta.len(),
            manifest,
        });
    }
    out.sort_by(|a, b| a.key.cmp(&b.key));
    Ok(out)
}

fn read_manifest_at(path: &Path) -> Result<Option<Manifest>> {
    if !path.is_file() {
        return Ok(None);
    }
    let bytes = fs::read(path).map_err(Error::io(path))?;
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|source| Error::Manifest {
            path: path.to_path_buf(),
            source,
        })
}
