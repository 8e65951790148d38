//! SQLite schema for the catalog database.
//!
//! Records are keyed by their content key. Parent keys are stored as a single
//! delimited column. The flag and category registries live next to the
//! records so that a database carries its own vocabulary.

use anyhow::Result;
use rusqlite::{params, Connection};

use crate::sqlite_column;
use crate::sqlite_persistence::{Column, SqlType, Table, VersionedSchema};

/// Catalog records - committed state only
const CATALOG_RECORDS_TABLE: Table = Table {
    name: "catalog_records",
    columns: &[
        sqlite_column!("key", &SqlType::Text, is_primary_key = true),
        sqlite_column!("title_ref", &SqlType::Text),
        sqlite_column!("name", &SqlType::Text),
        sqlite_column!("alt_name", &SqlType::Text),
        sqlite_column!("comments", &SqlType::Text),
        sqlite_column!("parent_keys", &SqlType::Text), // ','-delimited keys
        sqlite_column!("category_id", &SqlType::Integer),
        sqlite_column!("package_id", &SqlType::Integer),
        sqlite_column!("license_token", &SqlType::Text),
        sqlite_column!(
            "flags",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
    ],
    indices: &[
        ("idx_catalog_records_title_ref", "title_ref"),
        ("idx_catalog_records_category", "category_id"),
    ],
};

/// Flag registry - symbolic name to single-bit value
const FLAGS_TABLE: Table = Table {
    name: "flags",
    columns: &[
        sqlite_column!("name", &SqlType::Text, is_primary_key = true),
        sqlite_column!("value", &SqlType::Integer, non_null = true),
    ],
    indices: &[],
};

/// Category registry - remote category name to local id
const CATEGORIES_TABLE: Table = Table {
    name: "categories",
    columns: &[
        sqlite_column!("name", &SqlType::Text, is_primary_key = true),
        sqlite_column!("id", &SqlType::Integer, non_null = true),
    ],
    indices: &[],
};

/// Protection flags every new database starts with.
pub const DEFAULT_FLAGS: &[(&str, i64)] = &[
    ("NAME_RO", 0x0001),
    ("CATEGORY_ID_RO", 0x0002),
    ("COMMENTS_RO", 0x0004),
    ("ALT_NAME_RO", 0x0008),
    ("TITLE_REF_RO", 0x0010),
    ("PARENT_KEYS_RO", 0x0020),
];

/// Insert the default flags. Existing rows are left alone.
pub fn seed_default_flags(conn: &Connection) -> Result<()> {
    let mut stmt = conn.prepare("INSERT OR IGNORE INTO flags (name, value) VALUES (?1, ?2)")?;
    for (name, value) in DEFAULT_FLAGS {
        stmt.execute(params![name, value])?;
    }
    Ok(())
}

pub const CATALOG_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 0,
    tables: &[CATALOG_RECORDS_TABLE, FLAGS_TABLE, CATEGORIES_TABLE],
    migration: None,
}];
