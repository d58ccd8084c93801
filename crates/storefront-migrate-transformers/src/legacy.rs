// crates/storefront-migrate-transformers/src/legacy.rs
// ============================================================================
// Module: Legacy Storage Access
// Description: Paged readers over legacy objects, metadata, and option blobs.
// Purpose: Give every transformer the same stable ordering and error mapping.
// Dependencies: rusqlite, serde_json, time, storefront-migrate-store-sqlite
// ============================================================================

//! ## Overview
//! Objects page on ascending legacy id; option blobs are exploded into
//! entries ordered by numeric key (array blobs by index). Both orderings are
//! append-only, so an offset cursor never skips or repeats a record.
//! Read failures are fatal; write failures inside `migrate_one` are
//! per-record.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::cmp::Ordering;
use std::collections::BTreeMap;

use rusqlite::OptionalExtension;
use rusqlite::params;
use serde_json::Value;
use storefront_migrate_core::LegacyBlobEntry;
use storefront_migrate_core::LegacyObject;
use storefront_migrate_core::LegacyRecord;
use storefront_migrate_core::TransformError;
use storefront_migrate_store_sqlite::SqliteDatabase;
use storefront_migrate_store_sqlite::SqliteStoreError;
use time::Date;
use time::PrimitiveDateTime;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Legacy object type of payments.
pub const PAYMENT_TYPE: &str = "edd_payment";
/// Legacy object type of log entries.
pub const LOG_TYPE: &str = "edd_log";
/// Legacy object type of payment notes.
pub const NOTE_TYPE: &str = "edd_payment_note";
/// Option holding the discount blob.
pub const DISCOUNTS_OPTION: &str = "edd_discounts";
/// Option holding the tax rate blob.
pub const TAX_RATES_OPTION: &str = "edd_tax_rates";

// ============================================================================
// SECTION: Error Mapping
// ============================================================================

/// Maps a storage failure to a fatal transform error.
pub(crate) fn fatal(err: SqliteStoreError) -> TransformError {
    TransformError::Fatal(err.to_string())
}

/// Returns a mapper from storage failures to a per-record error.
pub(crate) fn record_failure(record: &LegacyRecord) -> impl FnOnce(SqliteStoreError) -> TransformError {
    let id = record.record_id();
    move |err| TransformError::Record {
        record: id,
        message: err.to_string(),
    }
}

/// Builds a per-record error with a message.
pub(crate) fn invalid_record(record: &LegacyRecord, message: impl Into<String>) -> TransformError {
    TransformError::Record {
        record: record.record_id(),
        message: message.into(),
    }
}

/// Fails fatally when any of `tables` is missing.
pub(crate) fn require_tables(db: &SqliteDatabase, tables: &[&str]) -> Result<(), TransformError> {
    let missing = db.missing_tables(tables).map_err(fatal)?;
    if missing.is_empty() {
        return Ok(());
    }
    Err(TransformError::Fatal(format!("target schema missing tables: {}", missing.join(", "))))
}

/// Converts a cursor or page size into a SQL integer.
fn sql_int(value: u64) -> Result<i64, TransformError> {
    i64::try_from(value).map_err(|_| TransformError::Fatal(format!("offset {value} out of range")))
}

// ============================================================================
// SECTION: Record Views
// ============================================================================

/// Returns the object inside `record` or a per-record error.
pub(crate) fn expect_object(record: &LegacyRecord) -> Result<&LegacyObject, TransformError> {
    match record {
        LegacyRecord::Object(object) => Ok(object),
        _ => Err(invalid_record(record, "expected a legacy object")),
    }
}

/// Returns the blob entry inside `record` or a per-record error.
pub(crate) fn expect_entry(record: &LegacyRecord) -> Result<&LegacyBlobEntry, TransformError> {
    match record {
        LegacyRecord::BlobEntry(entry) => Ok(entry),
        _ => Err(invalid_record(record, "expected an option blob entry")),
    }
}

// ============================================================================
// SECTION: Objects
// ============================================================================

/// Counts legacy objects of one type.
pub(crate) fn count_objects(db: &SqliteDatabase, object_type: &str) -> Result<u64, TransformError> {
    let count: i64 = db
        .with_connection(|connection| {
            Ok(connection.query_row(
                "SELECT COUNT(*) FROM legacy_objects WHERE object_type = ?1",
                params![object_type],
                |row| row.get(0),
            )?)
        })
        .map_err(fatal)?;
    Ok(u64::try_from(count).unwrap_or(0))
}

/// Fetches a page of legacy objects of one type with their metadata.
pub(crate) fn fetch_objects(
    db: &SqliteDatabase,
    object_type: &str,
    offset: u64,
    page_size: u64,
) -> Result<Vec<LegacyRecord>, TransformError> {
    let offset = sql_int(offset)?;
    let limit = sql_int(page_size)?;
    db.with_connection(|connection| {
        let mut stmt = connection.prepare(
            "SELECT id, object_type, status, title, content, parent_id, created_at, modified_at \
             FROM legacy_objects WHERE object_type = ?1 ORDER BY id LIMIT ?2 OFFSET ?3",
        )?;
        let objects = stmt
            .query_map(params![object_type, limit, offset], |row| {
                Ok(LegacyObject {
                    id: row.get(0)?,
                    object_type: row.get(1)?,
                    status: row.get(2)?,
                    title: row.get(3)?,
                    content: row.get(4)?,
                    parent_id: row.get(5)?,
                    created_at: row.get(6)?,
                    modified_at: row.get(7)?,
                    meta: BTreeMap::new(),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        let mut meta_stmt = connection.prepare(
            "SELECT meta_key, meta_value FROM legacy_meta WHERE object_id = ?1 AND meta_value IS \
             NOT NULL ORDER BY meta_id",
        )?;
        let mut records = Vec::with_capacity(objects.len());
        for mut object in objects {
            let rows = meta_stmt.query_map(params![object.id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?;
            for row in rows {
                let (key, value) = row?;
                // First value wins for repeated keys.
                object.meta.entry(key).or_insert(value);
            }
            records.push(LegacyRecord::Object(object));
        }
        Ok(records)
    })
    .map_err(fatal)
}

// ============================================================================
// SECTION: Option Blobs
// ============================================================================

/// Loads an option blob. Missing or unparsable blobs read as `None`.
pub(crate) fn load_option(db: &SqliteDatabase, name: &str) -> Result<Option<Value>, TransformError> {
    let raw: Option<Option<String>> = db
        .with_connection(|connection| {
            Ok(connection
                .query_row(
                    "SELECT option_value FROM legacy_options WHERE option_name = ?1",
                    params![name],
                    |row| row.get(0),
                )
                .optional()?)
        })
        .map_err(fatal)?;
    Ok(raw.flatten().and_then(|text| serde_json::from_str(&text).ok()))
}

/// Explodes an option blob into stably ordered entries.
pub(crate) fn blob_entries(
    db: &SqliteDatabase,
    option_name: &str,
) -> Result<Vec<LegacyBlobEntry>, TransformError> {
    let pairs: Vec<(String, Value)> = match load_option(db, option_name)? {
        Some(Value::Object(map)) => {
            let mut pairs: Vec<(String, Value)> = map.into_iter().collect();
            pairs.sort_by(|(left, _), (right, _)| blob_key_order(left, right));
            pairs
        }
        Some(Value::Array(items)) => {
            items.into_iter().enumerate().map(|(index, value)| (index.to_string(), value)).collect()
        }
        _ => Vec::new(),
    };
    Ok(pairs
        .into_iter()
        .enumerate()
        .map(|(index, (key, value))| LegacyBlobEntry {
            option_name: option_name.to_string(),
            key,
            position: u64::try_from(index).unwrap_or(u64::MAX),
            value,
        })
        .collect())
}

/// Returns one page of a blob's entries.
pub(crate) fn blob_page(
    db: &SqliteDatabase,
    option_name: &str,
    offset: u64,
    page_size: u64,
) -> Result<Vec<LegacyRecord>, TransformError> {
    let skip = usize::try_from(offset).unwrap_or(usize::MAX);
    let take = usize::try_from(page_size).unwrap_or(usize::MAX);
    Ok(blob_entries(db, option_name)?
        .into_iter()
        .skip(skip)
        .take(take)
        .map(LegacyRecord::BlobEntry)
        .collect())
}

/// Orders numeric keys ascending, then other keys lexically.
fn blob_key_order(left: &str, right: &str) -> Ordering {
    match (left.parse::<i64>(), right.parse::<i64>()) {
        (Ok(left), Ok(right)) => left.cmp(&right),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => left.cmp(right),
    }
}

// ============================================================================
// SECTION: Dates
// ============================================================================

/// Converts a legacy timestamp to RFC 3339 UTC.
///
/// Accepts `Y-m-d H:i:s`, `Y-m-d`, `m/d/Y H:i:s`, and `m/d/Y`. Zero dates
/// and anything unparsable yield `None`.
#[must_use]
pub fn legacy_date(text: &str) -> Option<String> {
    let text = text.trim();
    let parsed = PrimitiveDateTime::parse(
        text,
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
    )
    .or_else(|_| Date::parse(text, format_description!("[year]-[month]-[day]")).map(Date::midnight))
    .or_else(|_| {
        PrimitiveDateTime::parse(
            text,
            format_description!("[month]/[day]/[year] [hour]:[minute]:[second]"),
        )
    })
    .or_else(|_| Date::parse(text, format_description!("[month]/[day]/[year]")).map(Date::midnight))
    .ok()?;
    parsed.assume_utc().format(&Rfc3339).ok()
}
