//! Catalog record models.
//!
//! A `CatalogRecord` is keyed by a composite content identifier and carries
//! a 16-bit flag mask that only ever grows.

use serde::{Deserialize, Serialize};

use crate::error::SyncResult;
use crate::registry::FlagRegistry;

/// Bitmask of flags set on a record.
pub type Flags = u16;

/// Separator used when `ParentKeys` is persisted as a single column.
pub const PARENT_KEYS_DELIMITER: char = ',';

// =============================================================================
// Parent keys
// =============================================================================

/// Ordered set of parent keys. Insertion order is kept so that the persisted
/// list reads in the order parents were linked.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentKeys(Vec<String>);

impl ParentKeys {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a delimited list, dropping empty tokens and duplicates.
    pub fn from_delimited(s: &str) -> Self {
        let mut keys = Self::new();
        for token in s.split(PARENT_KEYS_DELIMITER) {
            keys.insert(token.trim());
        }
        keys
    }

    pub fn to_delimited(&self) -> String {
        self.0.join(&PARENT_KEYS_DELIMITER.to_string())
    }

    /// Exact token membership.
    pub fn contains(&self, key: &str) -> bool {
        self.0.iter().any(|k| k == key)
    }

    /// Append `key` unless it is already present. Returns true if it was added.
    pub fn insert(&mut self, key: &str) -> bool {
        if key.is_empty() || self.contains(key) {
            return false;
        }
        self.0.push(key.to_string());
        true
    }

    pub fn remove(&mut self, key: &str) -> bool {
        let before = self.0.len();
        self.0.retain(|k| k != key);
        self.0.len() != before
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|k| k.as_str())
    }
}

impl<S: AsRef<str>> FromIterator<S> for ParentKeys {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut keys = Self::new();
        for key in iter {
            keys.insert(key.as_ref());
        }
        keys
    }
}

// =============================================================================
// Record fields
// =============================================================================

/// Every mergeable field of a `CatalogRecord`, in merge order.
///
/// The key is not listed: it is immutable once the record exists. Flags are
/// merged separately since they accumulate instead of being replaced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RecordField {
    TitleRef,
    Name,
    AltName,
    Comments,
    ParentKeys,
    CategoryId,
    PackageId,
    LicenseToken,
}

impl RecordField {
    pub const ALL: [RecordField; 8] = [
        RecordField::TitleRef,
        RecordField::Name,
        RecordField::AltName,
        RecordField::Comments,
        RecordField::ParentKeys,
        RecordField::CategoryId,
        RecordField::PackageId,
        RecordField::LicenseToken,
    ];

    /// Symbolic name, also the prefix of the field's protection flag.
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordField::TitleRef => "TITLE_REF",
            RecordField::Name => "NAME",
            RecordField::AltName => "ALT_NAME",
            RecordField::Comments => "COMMENTS",
            RecordField::ParentKeys => "PARENT_KEYS",
            RecordField::CategoryId => "CATEGORY_ID",
            RecordField::PackageId => "PACKAGE_ID",
            RecordField::LicenseToken => "LICENSE_TOKEN",
        }
    }

    /// Name of the flag that write-protects this field.
    pub fn protection_flag(&self) -> &'static str {
        match self {
            RecordField::TitleRef => "TITLE_REF_RO",
            RecordField::Name => "NAME_RO",
            RecordField::AltName => "ALT_NAME_RO",
            RecordField::Comments => "COMMENTS_RO",
            RecordField::ParentKeys => "PARENT_KEYS_RO",
            RecordField::CategoryId => "CATEGORY_ID_RO",
            RecordField::PackageId => "PACKAGE_ID_RO",
            RecordField::LicenseToken => "LICENSE_TOKEN_RO",
        }
    }
}

impl std::fmt::Display for RecordField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Catalog record
// =============================================================================

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogRecord {
    pub key: String,
    pub title_ref: Option<String>,
    pub name: Option<String>,
    pub alt_name: Option<String>,
    pub comments: Option<String>,
    /// `None` means "not supplied", never "clear the parents".
    pub parent_keys: Option<ParentKeys>,
    pub category_id: Option<i64>,
    pub package_id: Option<u64>,
    pub license_token: Option<String>,
    pub flags: Flags,
}

impl CatalogRecord {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Default::default()
        }
    }

    /// Link `parent_key` as a parent of this record. A record never becomes
    /// its own parent. Returns true if the key was added.
    pub fn add_parent(&mut self, parent_key: &str) -> bool {
        if parent_key == self.key {
            return false;
        }
        self.parent_keys
            .get_or_insert_with(ParentKeys::new)
            .insert(parent_key)
    }

    pub fn has_flag(&self, bit: Flags) -> bool {
        self.flags & bit != 0
    }

    /// OR the named flag into this record's mask.
    pub fn set_flag(&mut self, name: &str, registry: &FlagRegistry) -> SyncResult<()> {
        self.flags |= registry.resolve(name)?;
        Ok(())
    }

    /// Write-protect `field` once this record has been merged.
    pub fn mark_read_only(&mut self, field: RecordField, registry: &FlagRegistry) -> SyncResult<()> {
        self.set_flag(field.protection_flag(), registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyncError;

    #[test]
    fn test_parent_keys_dedup_is_exact() {
        let mut keys = ParentKeys::new();
        assert!(keys.insert("UP0001-CUSA00001_00-ABCDEFGHABCDEFGH"));
        assert!(!keys.insert("UP0001-CUSA00001_00-ABCDEFGHABCDEFGH"));
        // A textual substring of an existing key is a different key
        assert!(keys.insert("UP0001-CUSA00001_00-ABCDEFGH"));
        assert_eq!(keys.len(), 2);
    }

    #[test]
    fn test_parent_keys_delimited() {
        let keys = ParentKeys::from_delimited("A, B,,A,C");
        assert_eq!(keys.iter().collect::<Vec<_>>(), vec!["A", "B", "C"]);
        assert_eq!(keys.to_delimited(), "A,B,C");
        assert!(ParentKeys::from_delimited("").is_empty());
    }

    #[test]
    fn test_parent_keys_remove() {
        let mut keys: ParentKeys = ["A", "B"].into_iter().collect();
        assert!(keys.remove("A"));
        assert!(!keys.remove("A"));
        assert_eq!(keys.to_delimited(), "B");
    }

    #[test]
    fn test_record_never_parents_itself() {
        let mut record = CatalogRecord::new("A");
        assert!(!record.add_parent("A"));
        assert!(record.parent_keys.is_none());
        assert!(record.add_parent("B"));
        assert!(!record.add_parent("B"));
        assert_eq!(record.parent_keys.unwrap().to_delimited(), "B");
    }

    #[test]
    fn test_protection_flag_names_follow_convention() {
        for field in RecordField::ALL {
            assert_eq!(
                field.protection_flag(),
                format!("{}_RO", field.as_str())
            );
        }
    }

    #[test]
    fn test_mark_read_only() {
        let registry = FlagRegistry::from_entries([("NAME_RO", 0x0001)]).unwrap();
        let mut record = CatalogRecord::new("A");
        record.mark_read_only(RecordField::Name, &registry).unwrap();
        assert!(record.has_flag(0x0001));

        let err = record
            .mark_read_only(RecordField::Comments, &registry)
            .unwrap_err();
        assert!(matches!(err, SyncError::UnknownFlag(name) if name == "COMMENTS_RO"));
        assert_eq!(record.flags, 0x0001);
    }
}
