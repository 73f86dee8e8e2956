//! Local inventory of uploaded datasets.
//!
//! Optimization jobs need transit data on the backend; the inventory is
//! the client-side record of what has been uploaded this session, used to
//! guard job starts before any network call is made.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One uploaded dataset file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadedFile {
    pub name: String,
    pub size_bytes: u64,
    /// Dataset category, e.g. "gtfs", "ridership", "schedule".
    pub kind: String,
    #[serde(default)]
    pub rows: Option<u64>,
    pub uploaded_at: DateTime<Utc>,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, size_bytes: u64, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            size_bytes,
            kind: kind.into(),
            rows: None,
            uploaded_at: Utc::now(),
        }
    }
}

/// The set of datasets uploaded in this session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataInventory {
    files: Vec<UploadedFile>,
}

impl DataInventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, file: UploadedFile) {
        self.files.push(file);
    }

    pub fn clear(&mut self) {
        self.files.clear();
    }

    pub fn files(&self) -> &[UploadedFile] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Whether at least one dataset is available for optimization.
    pub fn has_data(&self) -> bool {
        !self.files.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inventory_tracks_files() {
        let mut inv = DataInventory::new();
        assert!(!inv.has_data());

        inv.add(UploadedFile::new("stops.csv", 10_240, "gtfs"));
        inv.add(UploadedFile::new("ridership.csv", 204_800, "ridership"));
        assert!(inv.has_data());
        assert_eq!(inv.len(), 2);
        assert_eq!(inv.files()[0].name, "stops.csv");

        inv.clear();
        assert!(inv.is_empty());
    }
}
