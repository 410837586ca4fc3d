//! Entry table built once per open.
//!
//! The table is an index-stable, read-only list of [`EntryRecord`]s. It is
//! backed by an `Arc<[EntryRecord]>` so that a host can hand a clone to a UI
//! thread while a worker keeps extracting from the same handler.

use crate::entry::EntryRecord;
use crate::error::{ArcError, Result};
use std::ops::Index;
use std::sync::Arc;

/// Ordered collection of entry records.
#[derive(Debug, Clone, Default)]
pub struct EntryTable {
    records: Arc<[EntryRecord]>,
}

/// Result of translating entry paths into table indices.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathResolution {
    /// Matched indices in table order, without duplicates.
    pub indices: Vec<u32>,
    /// Requested paths that matched nothing.
    pub missing: Vec<String>,
}

impl EntryTable {
    /// Build a table from records in archive order.
    pub fn new(records: Vec<EntryRecord>) -> Self {
        Self {
            records: records.into(),
        }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Number of entries as a `u32` index bound.
    pub fn count(&self) -> u32 {
        self.records.len() as u32
    }

    /// True when the archive holds no entries.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Get the record at `index`.
    pub fn get(&self, index: u32) -> Result<&EntryRecord> {
        self.records
            .get(index as usize)
            .ok_or_else(|| ArcError::index_out_of_range(index, self.count()))
    }

    /// Check that every index is inside the table.
    pub fn check_indices(&self, indices: &[u32]) -> Result<()> {
        match indices.iter().find(|&&i| i >= self.count()) {
            Some(&index) => Err(ArcError::index_out_of_range(index, self.count())),
            None => Ok(()),
        }
    }

    /// Iterate over records in table order.
    pub fn iter(&self) -> std::slice::Iter<'_, EntryRecord> {
        self.records.iter()
    }

    /// All records as a slice.
    pub fn records(&self) -> &[EntryRecord] {
        &self.records
    }

    /// Find the first entry with exactly this stored name.
    ///
    /// A trailing `/` on either side is ignored so directory names match
    /// whether or not the archiver stored the separator.
    pub fn find(&self, name: &str) -> Option<u32> {
        let wanted = trim_separator(name);
        self.records
            .iter()
            .position(|r| r.trimmed_name() == wanted)
            .map(|i| i as u32)
    }

    /// Translate paths to indices.
    ///
    /// A path selects the entry with that name plus, when it names a
    /// directory, every entry stored below it.
    pub fn resolve_paths<S: AsRef<str>>(&self, paths: &[S]) -> PathResolution {
        let mut selected = vec![false; self.records.len()];
        let mut missing = Vec::new();

        for path in paths {
            let wanted = trim_separator(path.as_ref());
            let prefix = format!("{}/", wanted);
            let mut matched = false;

            for (i, record) in self.records.iter().enumerate() {
                if record.trimmed_name() == wanted || record.name().starts_with(&prefix) {
                    selected[i] = true;
                    matched = true;
                }
            }

            if !matched {
                missing.push(path.as_ref().to_string());
            }
        }

        let indices = selected
            .iter()
            .enumerate()
            .filter(|(_, s)| **s)
            .map(|(i, _)| i as u32)
            .collect();

        PathResolution { indices, missing }
    }

    /// A new table with the record at `index` replaced.
    ///
    /// The original table is left untouched, so clones held elsewhere keep
    /// seeing the old record.
    pub fn with_replaced(&self, index: u32, record: EntryRecord) -> Result<Self> {
        self.get(index)?;
        let mut records = self.records.to_vec();
        records[index as usize] = record;
        Ok(Self::new(records))
    }

    /// Sum of known entry sizes.
    pub fn total_size(&self) -> u64 {
        self.records.iter().filter_map(|r| r.size()).sum()
    }
}

impl Index<u32> for EntryTable {
    type Output = EntryRecord;

    fn index(&self, index: u32) -> &Self::Output {
        &self.records[index as usize]
    }
}

impl<'a> IntoIterator for &'a EntryTable {
    type Item = &'a EntryRecord;
    type IntoIter = std::slice::Iter<'a, EntryRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

fn trim_separator(name: &str) -> &str {
    let trimmed = name.trim_end_matches('/');
    if trimmed.is_empty() { name } else { trimmed }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> EntryTable {
        EntryTable::new(vec![
            EntryRecord::directory("docs/"),
            EntryRecord::file("docs/readme.txt", 10),
            EntryRecord::file("docs/guide/intro.md", 20),
            EntryRecord::file("main.rs", 30),
        ])
    }

    #[test]
    fn test_get_and_count() {
        let table = sample();
        assert_eq!(table.count(), 4);
        assert_eq!(table.get(3).unwrap().name(), "main.rs");
        assert!(matches!(
            table.get(4),
            Err(ArcError::IndexOutOfRange { index: 4, count: 4 })
        ));
        assert_eq!(table.total_size(), 60);
    }

    #[test]
    fn test_find_ignores_trailing_separator() {
        let table = sample();
        assert_eq!(table.find("docs"), Some(0));
        assert_eq!(table.find("docs/"), Some(0));
        assert_eq!(table.find("main.rs"), Some(3));
        assert_eq!(table.find("missing"), None);
    }

    #[test]
    fn test_resolve_paths() {
        let table = sample();
        let resolution = table.resolve_paths(&["main.rs", "docs/guide", "nope"]);
        assert_eq!(resolution.indices, vec![2, 3]);
        assert_eq!(resolution.missing, vec!["nope".to_string()]);

        let resolution = table.resolve_paths(&["docs"]);
        assert_eq!(resolution.indices, vec![0, 1, 2]);
        assert!(resolution.missing.is_empty());
    }

    #[test]
    fn test_check_indices() {
        let table = sample();
        assert!(table.check_indices(&[0, 3, 1]).is_ok());
        assert!(table.check_indices(&[0, 9]).is_err());
    }

    #[test]
    fn test_with_replaced_keeps_original() {
        let table = sample();
        let shared = table.clone();
        let updated = table
            .with_replaced(3, EntryRecord::file("main.rs", 31))
            .unwrap();

        assert_eq!(updated[3].size(), Some(31));
        assert_eq!(shared[3].size(), Some(30));
        assert!(table.with_replaced(7, EntryRecord::file("x", 1)).is_err());
    }

    #[test]
    fn test_table_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<EntryTable>();
    }
}
