//! SQLite-backed record store.
//!
//! Committed records live in the `catalog_records` table. Staged records are
//! held in memory until `commit_batch` writes all of them in one transaction.

use super::models::{CatalogRecord, ParentKeys};
use super::schema::{seed_default_flags, CATALOG_VERSIONED_SCHEMAS};
use super::trait_def::RecordStore;
use crate::error::SyncResult;
use crate::registry::{CategoryRegistry, FlagRegistry};
use crate::sqlite_persistence::BASE_DB_VERSION;
use anyhow::{bail, Context, Result};
use rusqlite::{params, Connection};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

const RECORD_COLUMNS: &str = "key, title_ref, name, alt_name, comments, parent_keys,
    category_id, package_id, license_token, flags";

/// SQLite-backed catalog record store.
#[derive(Clone)]
pub struct SqliteRecordStore {
    conn: Arc<Mutex<Connection>>,
    staged: Arc<Mutex<BTreeMap<String, CatalogRecord>>>,
}

fn migrate_if_needed(conn: &mut Connection) -> Result<()> {
    let db_version: i64 = conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;

    let latest_version = CATALOG_VERSIONED_SCHEMAS.len() - 1;
    let latest_schema = &CATALOG_VERSIONED_SCHEMAS[latest_version];

    let table_count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
        [],
        |r| r.get(0),
    )?;

    if table_count == 0 {
        info!("Creating catalog db schema at version {}", latest_version);
        latest_schema.create(conn)?;
        seed_default_flags(conn)?;
        return Ok(());
    }

    if db_version < BASE_DB_VERSION as i64 {
        bail!(
            "Database has user_version {} and was not created by catalog-sync",
            db_version
        );
    }

    let mut current_version = (db_version - BASE_DB_VERSION as i64) as usize;
    if current_version >= latest_version {
        return latest_schema.validate(conn);
    }

    let tx = conn.transaction()?;
    for schema in CATALOG_VERSIONED_SCHEMAS.iter().skip(current_version + 1) {
        if let Some(migration_fn) = schema.migration {
            info!(
                "Migrating catalog db from version {} to {}",
                current_version, schema.version
            );
            migration_fn(&tx)?;
        }
        current_version = schema.version;
    }
    tx.pragma_update(None, "user_version", BASE_DB_VERSION + current_version)?;
    tx.commit()?;
    Ok(())
}

impl SqliteRecordStore {
    /// Open (creating and migrating if needed) the catalog database at `db_path`.
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_path = db_path.as_ref();
        let mut conn = Connection::open(db_path)
            .with_context(|| format!("Failed to open catalog database {:?}", db_path))?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Self::from_connection(&mut conn)?;
        Ok(Self::wrap(conn))
    }

    /// Fresh in-memory database, used by tests and one-off runs.
    pub fn open_in_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        Self::from_connection(&mut conn)?;
        Ok(Self::wrap(conn))
    }

    fn from_connection(conn: &mut Connection) -> Result<()> {
        migrate_if_needed(conn)?;
        let record_count: i64 =
            conn.query_row("SELECT COUNT(*) FROM catalog_records", [], |r| r.get(0))?;
        info!("Opened catalog: {} records", record_count);
        Ok(())
    }

    fn wrap(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
            staged: Arc::new(Mutex::new(BTreeMap::new())),
        }
    }

    // =========================================================================
    // Registries
    // =========================================================================

    pub fn load_flag_registry(&self) -> SyncResult<FlagRegistry> {
        let entries = {
            let conn = self.conn.lock().unwrap();
            let mut stmt = conn
                .prepare("SELECT name, value FROM flags ORDER BY value")
                .context("Failed to read flag registry")?;
            let entries = stmt
                .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))
                .context("Failed to read flag registry")?
                .collect::<rusqlite::Result<Vec<_>>>()
                .context("Failed to read flag registry")?;
            entries
        };
        let registry = FlagRegistry::from_entries(entries)?;
        info!("Loaded {} flags", registry.len());
        Ok(registry)
    }

    pub fn load_category_registry(&self) -> Result<CategoryRegistry> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT name, id FROM categories")?;
        let entries = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        let registry = CategoryRegistry::from_entries(entries);
        info!("Loaded {} categories", registry.len());
        Ok(registry)
    }

    /// Insert categories that are not yet known. Returns how many were added.
    pub fn seed_categories<'a, I>(&self, entries: I) -> Result<usize>
    where
        I: IntoIterator<Item = (&'a str, i64)>,
    {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let mut added = 0;
        {
            let mut stmt =
                tx.prepare("INSERT OR IGNORE INTO categories (name, id) VALUES (?1, ?2)")?;
            for (name, id) in entries {
                added += stmt.execute(params![name, id])?;
            }
        }
        tx.commit()?;
        Ok(added)
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    /// Number of committed records.
    pub fn record_count(&self) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM catalog_records", [], |r| r.get(0))?;
        Ok(count as usize)
    }

    /// Committed records that list `parent_key` among their parents.
    pub fn list_children(&self, parent_key: &str) -> Result<Vec<CatalogRecord>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {} FROM catalog_records WHERE instr(parent_keys, ?1) > 0 ORDER BY key",
            RECORD_COLUMNS
        ))?;
        let candidates = stmt
            .query_map(params![parent_key], Self::parse_record_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        // instr() is only a prefilter, a key can be a substring of another key
        Ok(candidates
            .into_iter()
            .filter(|r| {
                r.parent_keys
                    .as_ref()
                    .is_some_and(|parents| parents.contains(parent_key))
            })
            .collect())
    }

    // =========================================================================
    // Internal Helper Methods
    // =========================================================================

    fn parse_record_row(row: &rusqlite::Row) -> rusqlite::Result<CatalogRecord> {
        let parent_keys: Option<String> = row.get(5)?;
        Ok(CatalogRecord {
            key: row.get(0)?,
            title_ref: row.get(1)?,
            name: row.get(2)?,
            alt_name: row.get(3)?,
            comments: row.get(4)?,
            parent_keys: parent_keys
                .map(|s| ParentKeys::from_delimited(&s))
                .filter(|keys| !keys.is_empty()),
            category_id: row.get(6)?,
            // Stored as the same 64 bits, SQLite integers are signed
            package_id: row.get::<_, Option<i64>>(7)?.map(|id| id as u64),
            license_token: row.get(8)?,
            flags: row.get(9)?,
        })
    }

    fn write_record(conn: &Connection, record: &CatalogRecord) -> Result<()> {
        let mut stmt = conn.prepare_cached(&format!(
            "INSERT INTO catalog_records ({})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
             ON CONFLICT(key) DO UPDATE SET
                title_ref = excluded.title_ref,
                name = excluded.name,
                alt_name = excluded.alt_name,
                comments = excluded.comments,
                parent_keys = excluded.parent_keys,
                category_id = excluded.category_id,
                package_id = excluded.package_id,
                license_token = excluded.license_token,
                flags = excluded.flags",
            RECORD_COLUMNS
        ))?;
        stmt.execute(params![
            record.key,
            record.title_ref,
            record.name,
            record.alt_name,
            record.comments,
            record.parent_keys.as_ref().map(|p| p.to_delimited()),
            record.category_id,
            record.package_id.map(|id| id as i64),
            record.license_token,
            record.flags,
        ])
        .with_context(|| format!("Failed to write record {}", record.key))?;
        Ok(())
    }
}

impl RecordStore for SqliteRecordStore {
    fn find_tracked(&self, key: &str) -> Result<Option<CatalogRecord>> {
        if let Some(staged) = self.staged.lock().unwrap().get(key) {
            return Ok(Some(staged.clone()));
        }
        self.snapshot_committed(key)
    }

    fn snapshot_committed(&self, key: &str) -> Result<Option<CatalogRecord>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {} FROM catalog_records WHERE key = ?1",
            RECORD_COLUMNS
        ))?;
        match stmt.query_row(params![key], Self::parse_record_row) {
            Ok(record) => Ok(Some(record)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn stage_upsert(&self, record: CatalogRecord) -> Result<()> {
        self.staged.lock().unwrap().insert(record.key.clone(), record);
        Ok(())
    }

    fn commit_batch(&self) -> Result<usize> {
        let mut staged = self.staged.lock().unwrap();
        if staged.is_empty() {
            return Ok(0);
        }

        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        for record in staged.values() {
            Self::write_record(&tx, record)?;
        }
        tx.commit().context("Failed to commit catalog batch")?;

        let written = staged.len();
        staged.clear();
        debug!("Committed {} staged records", written);
        Ok(written)
    }

    fn staged_count(&self) -> usize {
        self.staged.lock().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_record(key: &str) -> CatalogRecord {
        CatalogRecord {
            key: key.to_string(),
            title_ref: Some("CUSA00001".to_string()),
            name: Some("Game".to_string()),
            alt_name: None,
            comments: Some("en-US".to_string()),
            parent_keys: Some(["EP1234-CUSA00001_00-BUNDLE0000000000"].into_iter().collect()),
            category_id: Some(3),
            package_id: Some(42),
            license_token: Some("tok".to_string()),
            flags: 0x0005,
        }
    }

    const KEY: &str = "EP1234-CUSA00001_00-AAAAAAAAAAAAAAAA";

    #[test]
    fn test_staged_record_is_tracked_but_not_committed() {
        let store = SqliteRecordStore::open_in_memory().unwrap();
        store.stage_upsert(sample_record(KEY)).unwrap();

        assert_eq!(store.find_tracked(KEY).unwrap(), Some(sample_record(KEY)));
        assert_eq!(store.snapshot_committed(KEY).unwrap(), None);
        assert_eq!(store.staged_count(), 1);
    }

    #[test]
    fn test_package_id_keeps_full_unsigned_range() {
        let store = SqliteRecordStore::open_in_memory().unwrap();
        let mut record = sample_record(KEY);
        record.package_id = Some(u64::MAX);
        store.stage_upsert(record.clone()).unwrap();
        store
            .stage_upsert(CatalogRecord {
                package_id: Some(1 << 63),
                ..sample_record("EP1234-CUSA00001_00-DLC0000000000001")
            })
            .unwrap();

        assert_eq!(store.commit_batch().unwrap(), 2);
        assert_eq!(store.staged_count(), 0);
        assert_eq!(store.snapshot_committed(KEY).unwrap(), Some(record));
        assert_eq!(
            store
                .snapshot_committed("EP1234-CUSA00001_00-DLC0000000000001")
                .unwrap()
                .unwrap()
                .package_id,
            Some(1 << 63)
        );
    }

    #[test]
    fn test_commit_makes_staged_records_durable() {
        let store = SqliteRecordStore::open_in_memory().unwrap();
        store.stage_upsert(sample_record(KEY)).unwrap();

        assert_eq!(store.commit_batch().unwrap(), 1);
        assert_eq!(store.staged_count(), 0);
        assert_eq!(
            store.snapshot_committed(KEY).unwrap(),
            Some(sample_record(KEY))
        );
        assert_eq!(store.record_count().unwrap(), 1);
    }

    #[test]
    fn test_restaging_replaces_previous_version() {
        let store = SqliteRecordStore::open_in_memory().unwrap();
        store.stage_upsert(sample_record(KEY)).unwrap();
        let mut second = sample_record(KEY);
        second.name = Some("Renamed".to_string());
        store.stage_upsert(second.clone()).unwrap();

        assert_eq!(store.staged_count(), 1);
        store.commit_batch().unwrap();
        assert_eq!(store.snapshot_committed(KEY).unwrap(), Some(second));
    }

    #[test]
    fn test_commit_updates_existing_row() {
        let store = SqliteRecordStore::open_in_memory().unwrap();
        store.stage_upsert(sample_record(KEY)).unwrap();
        store.commit_batch().unwrap();

        let mut updated = sample_record(KEY);
        updated.flags = 0x0007;
        updated.parent_keys = None;
        store.stage_upsert(updated.clone()).unwrap();

        // Committed view still shows the old row until the next commit
        assert_eq!(store.snapshot_committed(KEY).unwrap().unwrap().flags, 0x0005);
        store.commit_batch().unwrap();
        assert_eq!(store.snapshot_committed(KEY).unwrap(), Some(updated));
        assert_eq!(store.record_count().unwrap(), 1);
    }

    #[test]
    fn test_commit_with_nothing_staged() {
        let store = SqliteRecordStore::open_in_memory().unwrap();
        assert_eq!(store.commit_batch().unwrap(), 0);
    }

    #[test]
    fn test_new_database_has_default_flags() {
        let store = SqliteRecordStore::open_in_memory().unwrap();
        let flags = store.load_flag_registry().unwrap();
        assert_eq!(flags.resolve("NAME_RO").unwrap(), 0x0001);
        assert_eq!(flags.resolve("PARENT_KEYS_RO").unwrap(), 0x0020);
        assert!(flags.get("PACKAGE_ID_RO").is_none());
    }

    #[test]
    fn test_seed_and_load_categories() {
        let store = SqliteRecordStore::open_in_memory().unwrap();
        assert_eq!(
            store
                .seed_categories([("downloadable_game", 1), ("add_on", 2)])
                .unwrap(),
            2
        );
        assert_eq!(store.seed_categories([("add_on", 9)]).unwrap(), 0);

        let categories = store.load_category_registry().unwrap();
        assert_eq!(categories.resolve("add_on"), Some(2));
    }

    #[test]
    fn test_list_children_uses_exact_parent_tokens() {
        let store = SqliteRecordStore::open_in_memory().unwrap();
        let mut child = CatalogRecord::new("EP1234-CUSA00001_00-CHILD00000000000");
        child.add_parent("EP1234-CUSA00001_00-PARENT0000000001");
        store.stage_upsert(child.clone()).unwrap();
        store.commit_batch().unwrap();

        assert_eq!(
            store
                .list_children("EP1234-CUSA00001_00-PARENT0000000001")
                .unwrap(),
            vec![child]
        );
        assert!(store
            .list_children("EP1234-CUSA00001_00-PARENT000000000")
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_reopen_on_disk_database() {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("catalog.db");
        {
            let store = SqliteRecordStore::new(&db_path).unwrap();
            store.stage_upsert(sample_record(KEY)).unwrap();
            store.commit_batch().unwrap();
            // Staged but never committed: lost on close
            store
                .stage_upsert(sample_record("EP1234-CUSA00001_00-BBBBBBBBBBBBBBBB"))
                .unwrap();
        }

        let store = SqliteRecordStore::new(&db_path).unwrap();
        assert_eq!(store.record_count().unwrap(), 1);
        assert_eq!(
            store.snapshot_committed(KEY).unwrap(),
            Some(sample_record(KEY))
        );
    }

    #[test]
    fn test_rejects_foreign_database() {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("other.db");
        {
            let conn = Connection::open(&db_path).unwrap();
            conn.execute("CREATE TABLE something (id INTEGER)", [])
                .unwrap();
        }
        let err = SqliteRecordStore::new(&db_path).err().unwrap();
        assert!(err.to_string().contains("was not created by catalog-sync"));
    }
}
