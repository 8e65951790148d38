//! Field-by-field merge decision.
//!
//! Pure functions: given what the remote source says (`incoming`), what the
//! store currently tracks (`existing`) and what was last committed
//! (`baseline`), compute the record to stage. Nothing here touches a store.

use crate::catalog_store::{CatalogRecord, Flags, RecordField};
use crate::registry::FlagRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldDecision {
    Unchanged,
    Protected,
    Written,
}

/// Outcome of merging one incoming record onto a tracked one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeDecision {
    pub merged: CatalogRecord,
    /// Fields whose stored value was replaced, in merge order.
    pub changed: Vec<RecordField>,
    /// Fields where the incoming value differed but the field is read-only.
    pub protected: Vec<RecordField>,
    pub flags_changed: bool,
}

impl MergeDecision {
    pub fn has_changes(&self) -> bool {
        self.flags_changed || !self.changed.is_empty()
    }
}

fn merge_value<T: PartialEq + Clone>(
    incoming: &Option<T>,
    baseline: &Option<T>,
    stored: &mut Option<T>,
    protected: bool,
) -> FieldDecision {
    let Some(value) = incoming else {
        return FieldDecision::Unchanged;
    };
    if baseline.as_ref() == Some(value) {
        return FieldDecision::Unchanged;
    }
    if protected {
        return FieldDecision::Protected;
    }
    *stored = Some(value.clone());
    FieldDecision::Written
}

fn is_protected(field: RecordField, guard: Flags, registry: &FlagRegistry) -> bool {
    registry
        .get(field.protection_flag())
        .is_some_and(|bit| guard & bit != 0)
}

/// Drop the record's own key from its parents, and treat an empty parent
/// list as "not supplied".
pub fn normalize_incoming(mut incoming: CatalogRecord) -> CatalogRecord {
    if let Some(parents) = incoming.parent_keys.as_mut() {
        parents.remove(&incoming.key);
        if parents.is_empty() {
            incoming.parent_keys = None;
        }
    }
    incoming
}

/// Merge `incoming` onto `existing`, deciding each field against `baseline`.
///
/// A field is overwritten only when the incoming value is set, differs from
/// the committed baseline, and the field's `<FIELD>_RO` flag is not set.
/// Flags are OR-ed and never cleared.
pub fn merge_records(
    incoming: &CatalogRecord,
    existing: &CatalogRecord,
    baseline: &CatalogRecord,
    registry: &FlagRegistry,
) -> MergeDecision {
    let mut merged = existing.clone();
    // Bits staged earlier in this batch protect as much as committed ones
    let guard = baseline.flags | existing.flags;

    let mut changed = Vec::new();
    let mut protected = Vec::new();

    for field in RecordField::ALL {
        let locked = is_protected(field, guard, registry);
        let decision = match field {
            RecordField::TitleRef => merge_value(
                &incoming.title_ref,
                &baseline.title_ref,
                &mut merged.title_ref,
                locked,
            ),
            RecordField::Name => {
                merge_value(&incoming.name, &baseline.name, &mut merged.name, locked)
            }
            RecordField::AltName => merge_value(
                &incoming.alt_name,
                &baseline.alt_name,
                &mut merged.alt_name,
                locked,
            ),
            RecordField::Comments => merge_value(
                &incoming.comments,
                &baseline.comments,
                &mut merged.comments,
                locked,
            ),
            RecordField::ParentKeys => merge_value(
                &incoming.parent_keys,
                &baseline.parent_keys,
                &mut merged.parent_keys,
                locked,
            ),
            RecordField::CategoryId => merge_value(
                &incoming.category_id,
                &baseline.category_id,
                &mut merged.category_id,
                locked,
            ),
            RecordField::PackageId => merge_value(
                &incoming.package_id,
                &baseline.package_id,
                &mut merged.package_id,
                locked,
            ),
            RecordField::LicenseToken => merge_value(
                &incoming.license_token,
                &baseline.license_token,
                &mut merged.license_token,
                locked,
            ),
        };
        match decision {
            FieldDecision::Written => changed.push(field),
            FieldDecision::Protected => protected.push(field),
            FieldDecision::Unchanged => {}
        }
    }

    let accumulated = incoming.flags | baseline.flags;
    let flags_changed = accumulated != baseline.flags;
    merged.flags |= accumulated;

    MergeDecision {
        merged,
        changed,
        protected,
        flags_changed,
    }
}
