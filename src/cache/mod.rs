use std::path::PathBuf;

use chrono::NaiveDate;
use serde_json::Value;

use crate::errors::ModelError;

/// How much of a snapshot is actually there.
///
/// Only `Complete` snapshots are safe to consume without a re-fetch.
/// `Partial` means the file exists but a required sub-field is absent;
/// `Missing` means no file at all. A file that exists but will not parse is
/// an error, never `Missing` -- quietly re-fetching over a corrupt file
/// could hide a real upstream problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completeness {
    Missing,
    Partial,
    Complete,
}

/// The records read for one (category, date) key plus their completeness.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub records: Vec<Value>,
    pub completeness: Completeness,
}

impl Snapshot {
    pub fn is_complete(&self) -> bool {
        self.completeness == Completeness::Complete
    }
}

/// Flat-file JSON store with one file per (category, date).
///
/// Records are opaque JSON objects; their schema belongs to whatever fetched
/// them. The cache only promises presence, atomic replacement, and the
/// completeness predicate.
#[derive(Debug, Clone)]
pub struct SnapshotCache {
    root: PathBuf,
}

/// `YYYYMMDD` stamp used in cache and results filenames.
pub fn date_stamp(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

impl SnapshotCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `<root>/json/<category>_<YYYYMMDD>.json`
    pub fn path(&self, category: &str, stamp: &str) -> PathBuf {
        self.root
            .join("json")
            .join(format!("{}_{}.json", category, stamp))
    }

    /// Read the snapshot for one key. A missing file is a valid state
    /// (`Missing`, empty records); a file that will not parse is reported as
    /// a distinct error so the operator can look at it.
    pub fn read(
        &self,
        category: &str,
        stamp: &str,
        required_field: Option<&str>,
    ) -> Result<Snapshot, ModelError> {
        let path = self.path(category, stamp);
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Snapshot {
                    records: Vec::new(),
                    completeness: Completeness::Missing,
                });
            }
            Err(e) => return Err(ModelError::Io(e)),
        };

        let records: Vec<Value> =
            serde_json::from_str(&raw).map_err(|e| ModelError::SnapshotParse {
                path: path.clone(),
                reason: e.to_string(),
            })?;

        let completeness = if Self::is_complete(&records, required_field) {
            Completeness::Complete
        } else {
            Completeness::Partial
        };

        Ok(Snapshot {
            records,
            completeness,
        })
    }

    /// Overwrite the snapshot for one key atomically: serialize to a
    /// temporary file in the same directory, then rename over the target, so
    /// a concurrent reader never sees a half-written file.
    pub fn write(
        &self,
        category: &str,
        stamp: &str,
        records: &[Value],
    ) -> Result<PathBuf, ModelError> {
        let path = self.path(category, stamp);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(records).expect("records are plain JSON values");
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &path)?;
        Ok(path)
    }

    /// Category-specific completeness predicate. Odds are attached to
    /// schedule records after the schedule rows themselves are written, so
    /// the last record carrying the required field means the second pass
    /// finished. An empty record set is complete: a date can simply have no
    /// games, and refetching it forever would not change that.
    pub fn is_complete(records: &[Value], required_field: Option<&str>) -> bool {
        let Some(field) = required_field else {
            return true;
        };
        match records.last() {
            None => true,
            Some(last) => last.get(field).map(|v| !v.is_null()).unwrap_or(false),
        }
    }
}
