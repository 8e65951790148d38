//! Decomposes a remote metadata record into catalog records.
//!
//! A primary title is upserted itself and pulls in the add-ons of the same
//! title family as children. A bundle is not upserted as a title: each
//! entitlement of its default configuration becomes a child of the bundle.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::catalog_store::validation::{platform_marker, title_ref_of, validate_key};
use crate::catalog_store::{CatalogRecord, RecordField, RecordStore};
use crate::error::SyncResult;
use crate::metadata::RemoteMetadata;
use crate::registry::{CategoryRegistry, FlagRegistry};

/// How a root record is decomposed, picked from its `top_category`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootPolicy {
    PrimaryTitle,
    Bundle,
    Unsupported,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkerSettings {
    /// Remote categories treated as primary purchasable titles.
    pub title_categories: Vec<String>,
    /// Remote categories treated as multi-platform bundles.
    pub bundle_categories: Vec<String>,
    /// Platform family marker of the entitlements to keep from bundles.
    pub target_platform: char,
    /// Locale of the query, stored as the root's comment when set.
    pub locale: Option<String>,
}

impl Default for LinkerSettings {
    fn default() -> Self {
        Self {
            title_categories: vec!["downloadable_game".to_string()],
            bundle_categories: vec!["bundle".to_string()],
            target_platform: 'C',
            locale: None,
        }
    }
}

/// Records to upsert for one root, in upsert order (root first when present).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkPlan {
    pub policy: RootPolicy,
    pub candidates: Vec<CatalogRecord>,
    /// Sub-items dropped because of family, platform or key format.
    pub skipped: usize,
}

impl LinkPlan {
    fn empty(policy: RootPolicy) -> Self {
        Self {
            policy,
            candidates: Vec::new(),
            skipped: 0,
        }
    }
}

pub struct HierarchyLinker {
    flags: Arc<FlagRegistry>,
    categories: Arc<CategoryRegistry>,
    settings: LinkerSettings,
}

impl HierarchyLinker {
    pub fn new(
        flags: Arc<FlagRegistry>,
        categories: Arc<CategoryRegistry>,
        settings: LinkerSettings,
    ) -> Self {
        Self {
            flags,
            categories,
            settings,
        }
    }

    pub fn policy_for(&self, top_category: &str) -> RootPolicy {
        if self.settings.title_categories.iter().any(|c| c == top_category) {
            RootPolicy::PrimaryTitle
        } else if self.settings.bundle_categories.iter().any(|c| c == top_category) {
            RootPolicy::Bundle
        } else {
            RootPolicy::Unsupported
        }
    }

    /// Build the records to upsert for `metadata`, fetched for `root_key`.
    ///
    /// `store` is only read, to carry over the parents a child already has.
    /// Fails with `UnknownFlag` if a protection flag is not registered; in
    /// that case nothing should be upserted for this root.
    pub fn link<S: RecordStore + ?Sized>(
        &self,
        root_key: &str,
        metadata: &RemoteMetadata,
        store: &S,
    ) -> SyncResult<LinkPlan> {
        let policy = self.policy_for(&metadata.top_category);
        if !validate_key(Some(root_key)) {
            warn!("Skipping metadata for malformed key {:?}", root_key);
            return Ok(LinkPlan::empty(policy));
        }

        match policy {
            RootPolicy::PrimaryTitle => self.link_primary_title(root_key, metadata, store),
            RootPolicy::Bundle => self.link_bundle(root_key, metadata, store),
            RootPolicy::Unsupported => {
                debug!(
                    "{}: category {:?} is neither a title nor a bundle, skipping",
                    root_key, metadata.top_category
                );
                Ok(LinkPlan::empty(policy))
            }
        }
    }

    fn link_primary_title<S: RecordStore + ?Sized>(
        &self,
        root_key: &str,
        metadata: &RemoteMetadata,
        store: &S,
    ) -> SyncResult<LinkPlan> {
        let mut plan = LinkPlan::empty(RootPolicy::PrimaryTitle);

        let mut root = self.authoritative_record(
            root_key,
            metadata.name.as_deref(),
            self.resolve_category(root_key, Some(metadata.top_category.as_str())),
        )?;
        if let Some(locale) = &self.settings.locale {
            root.comments = Some(locale.clone());
            root.mark_read_only(RecordField::Comments, &self.flags)?;
        }
        plan.candidates.push(root);

        let family = title_ref_of(root_key);
        let mut seen = HashSet::from([root_key.to_string()]);
        for link in metadata.links.iter().flatten() {
            if !validate_key(Some(&link.id)) {
                warn!("{}: skipping link with malformed id {:?}", root_key, link.id);
                plan.skipped += 1;
                continue;
            }
            if title_ref_of(&link.id) != family {
                debug!("{}: {} belongs to another title, skipping", root_key, link.id);
                plan.skipped += 1;
                continue;
            }
            if !seen.insert(link.id.clone()) {
                continue;
            }
            let category = self.resolve_category(&link.id, link.top_category.as_deref());
            let mut child = self.authoritative_record(&link.id, link.name.as_deref(), category)?;
            Self::link_parent(&mut child, root_key, store)?;
            plan.candidates.push(child);
        }
        Ok(plan)
    }

    fn link_bundle<S: RecordStore + ?Sized>(
        &self,
        root_key: &str,
        metadata: &RemoteMetadata,
        store: &S,
    ) -> SyncResult<LinkPlan> {
        let mut plan = LinkPlan::empty(RootPolicy::Bundle);
        let category = self.resolve_category(root_key, Some(metadata.top_category.as_str()));

        let mut seen = HashSet::from([root_key.to_string()]);
        let entitlements = metadata
            .default_sku
            .iter()
            .flat_map(|sku| sku.entitlements.iter());
        for entitlement in entitlements {
            if !validate_key(Some(&entitlement.id)) {
                warn!(
                    "{}: skipping entitlement with malformed id {:?}",
                    root_key, entitlement.id
                );
                plan.skipped += 1;
                continue;
            }
            if platform_marker(&entitlement.id) != Some(self.settings.target_platform) {
                debug!(
                    "{}: {} is not for platform {}, skipping",
                    root_key, entitlement.id, self.settings.target_platform
                );
                plan.skipped += 1;
                continue;
            }
            if !seen.insert(entitlement.id.clone()) {
                continue;
            }
            let mut child =
                self.authoritative_record(&entitlement.id, entitlement.name.as_deref(), category)?;
            Self::link_parent(&mut child, root_key, store)?;
            plan.candidates.push(child);
        }
        Ok(plan)
    }

    /// Record carrying the remote's name and category, both marked read-only
    /// when supplied.
    fn authoritative_record(
        &self,
        key: &str,
        name: Option<&str>,
        category_id: Option<i64>,
    ) -> SyncResult<CatalogRecord> {
        let mut record = CatalogRecord::new(key);
        record.title_ref = title_ref_of(key).map(str::to_string);
        if let Some(name) = name {
            record.name = Some(name.to_string());
            record.mark_read_only(RecordField::Name, &self.flags)?;
        }
        if let Some(category_id) = category_id {
            record.category_id = Some(category_id);
            record.mark_read_only(RecordField::CategoryId, &self.flags)?;
        }
        Ok(record)
    }

    /// Append `parent_key` to the parents `child` already has in the store.
    fn link_parent<S: RecordStore + ?Sized>(
        child: &mut CatalogRecord,
        parent_key: &str,
        store: &S,
    ) -> SyncResult<()> {
        child.parent_keys = store
            .find_tracked(&child.key)?
            .and_then(|existing| existing.parent_keys);
        child.add_parent(parent_key);
        Ok(())
    }

    fn resolve_category(&self, key: &str, name: Option<&str>) -> Option<i64> {
        let name = name?;
        let resolved = self.categories.resolve(name);
        if resolved.is_none() {
            warn!("{}: unknown category {:?}, leaving it unset", key, name);
        }
        resolved
    }
}
