//! In-process backend used as a substitutable fake of the hosted platform.
//!
//! # Responsibility
//! - Mirror the observable storage and table contracts without a network.
//! - Let callers inspect stored objects and toggle an unavailable state.
//!
//! # Invariants
//! - Clones share state; a clone kept by a test sees gateway writes.
//! - Listing follows the platform's folder semantics: entries directly under
//!   the prefix, sorted by name, nested paths collapsed to folder entries.
//! - Range selects are inclusive and keep insertion order.

use super::{BackendError, BackendResult, LogTable, ObjectStore};
use crate::model::log_row::{parse_timestamp, LogRow, TIMESTAMP_COLUMN};
use crate::model::object_entry::ObjectEntry;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

const UNAVAILABLE_STATUS: u16 = 503;

/// Object stored by `MemoryBackend`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

#[derive(Debug, Default)]
struct MemoryState {
    buckets: HashMap<String, BTreeMap<String, StoredObject>>,
    tables: HashMap<String, Vec<LogRow>>,
    unavailable: bool,
}

/// Shared in-memory storage container and log tables.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call fail with a `503` status until reset.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.lock().unavailable = unavailable;
    }

    /// Returns one stored object, bypassing availability checks.
    pub fn object(&self, bucket: &str, path: &str) -> Option<StoredObject> {
        self.lock()
            .buckets
            .get(bucket)
            .and_then(|objects| objects.get(path))
            .cloned()
    }

    /// Stores raw bytes directly, e.g. to seed malformed documents.
    pub fn put_raw(&self, bucket: &str, path: &str, bytes: impl Into<Vec<u8>>) {
        let stored = StoredObject {
            bytes: bytes.into(),
            content_type: "application/octet-stream".to_string(),
        };
        let mut state = self.lock();
        state
            .buckets
            .entry(bucket.to_string())
            .or_default()
            .insert(path.to_string(), stored);
    }

    /// Returns every row of `table` in insertion order.
    pub fn rows(&self, table: &str) -> Vec<LogRow> {
        self.lock().tables.get(table).cloned().unwrap_or_default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn available(&self) -> BackendResult<MutexGuard<'_, MemoryState>> {
        let state = self.lock();
        if state.unavailable {
            return Err(BackendError::Status {
                code: UNAVAILABLE_STATUS,
                message: "backend unavailable".to_string(),
            });
        }
        Ok(state)
    }
}

impl ObjectStore for MemoryBackend {
    fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
        upsert: bool,
    ) -> BackendResult<()> {
        let mut state = self.available()?;
        let objects = state.buckets.entry(bucket.to_string()).or_default();
        if !upsert && objects.contains_key(path) {
            return Err(BackendError::Status {
                code: 409,
                message: format!("object already exists: {path}"),
            });
        }
        objects.insert(
            path.to_string(),
            StoredObject {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    fn download(&self, bucket: &str, path: &str) -> BackendResult<Vec<u8>> {
        let state = self.available()?;
        state
            .buckets
            .get(bucket)
            .and_then(|objects| objects.get(path))
            .map(|object| object.bytes.clone())
            .ok_or_else(|| BackendError::NotFound(path.to_string()))
    }

    fn list(&self, bucket: &str, prefix: &str) -> BackendResult<Vec<ObjectEntry>> {
        let state = self.available()?;
        let Some(objects) = state.buckets.get(bucket) else {
            return Ok(Vec::new());
        };

        let folder = prefix.trim_matches('/');
        let mut files = Vec::new();
        let mut folders = BTreeSet::new();
        for path in objects.keys() {
            let relative = if folder.is_empty() {
                path.as_str()
            } else {
                match path
                    .strip_prefix(folder)
                    .and_then(|rest| rest.strip_prefix('/'))
                {
                    Some(rest) => rest,
                    None => continue,
                }
            };
            match relative.split_once('/') {
                Some((child_folder, _)) => {
                    folders.insert(child_folder.to_string());
                }
                None => files.push(relative.to_string()),
            }
        }

        let mut entries: Vec<ObjectEntry> = folders
            .into_iter()
            .chain(files)
            .map(ObjectEntry::named)
            .collect();
        entries.sort_by(|left, right| left.name.cmp(&right.name));
        Ok(entries)
    }

    fn remove(&self, bucket: &str, paths: &[&str]) -> BackendResult<()> {
        let mut state = self.available()?;
        if let Some(objects) = state.buckets.get_mut(bucket) {
            for path in paths {
                objects.remove(*path);
            }
        }
        Ok(())
    }
}

impl LogTable for MemoryBackend {
    fn select_range(
        &self,
        table: &str,
        column: &str,
        gte: &str,
        lte: &str,
    ) -> BackendResult<Vec<LogRow>> {
        let state = self.available()?;
        if column != TIMESTAMP_COLUMN {
            return Err(BackendError::Status {
                code: 400,
                message: format!("column `{column}` is not filterable"),
            });
        }
        let (Some(lower), Some(upper)) = (parse_timestamp(gte), parse_timestamp(lte)) else {
            return Err(BackendError::Status {
                code: 400,
                message: "invalid timestamp filter".to_string(),
            });
        };

        let rows = state
            .tables
            .get(table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| {
                        row.parsed_timestamp()
                            .is_some_and(|instant| lower <= instant && instant <= upper)
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(rows)
    }

    fn insert(&self, table: &str, rows: &[LogRow]) -> BackendResult<()> {
        let mut state = self.available()?;
        state
            .tables
            .entry(table.to_string())
            .or_default()
            .extend(rows.iter().cloned());
        Ok(())
    }
}
