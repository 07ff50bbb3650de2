//! SQLite bulk cache engine
//!
//! The tag collection is large and read-mostly, so it is cached in SQLite
//! and rewritten by a chunked bulk import. For the duration of an import
//! `journal_mode`/`synchronous` are tuned to `MEMORY`/`OFF` and restored
//! to `DELETE`/`FULL` afterwards - on every path, including failures, so
//! the database is never left in a fragile durability mode.
//!
//! See <https://www.sqlite.org/pragma.html> for the tuning trade-offs.

use std::fs;

use rusqlite::{params, Connection};
use tracing::{debug, warn};

use crate::core::config::Settings;
use crate::core::error::StoreError;
use crate::core::relation::Handle;
use crate::entities::tag::{Tag, TagColumns};

/// Open the SQLite cache, seeding the file from a bundled asset when the
/// writable copy does not exist yet.
pub fn open_database(settings: &Settings) -> Result<Connection, StoreError> {
    let path = settings.data_path(&settings.db_file);
    if !path.exists() {
        fs::create_dir_all(&settings.data_dir).map_err(|e| StoreError::io(&settings.data_dir, e))?;
        if let Some(asset) = settings.asset_path(&settings.db_file) {
            if asset.exists() {
                if let Err(e) = fs::copy(&asset, &path) {
                    debug!("cannot copy asset db {} to data path: {e}", asset.display());
                    // a fresh database will be created below
                }
            }
        }
    }
    let conn = Connection::open(&path)?;
    debug!("database opened: {}", settings.db_file);
    Ok(conn)
}

fn synchronous_label(value: i64) -> String {
    match value {
        0 => "OFF".to_string(),
        1 => "NORMAL".to_string(),
        2 => "FULL".to_string(),
        other => other.to_string(),
    }
}

/// Tune (or restore) the PRAGMAs around a bulk import. `tune == true`
/// switches to `MEMORY`/`OFF`, `tune == false` back to `DELETE`/`FULL`.
/// The current values are read and logged before switching.
pub fn tune_for_bulk_import(conn: &Connection, tune: bool) -> Result<(), StoreError> {
    let journal: String = conn.query_row("PRAGMA journal_mode", [], |row| row.get(0))?;
    let synchronous: i64 = conn.query_row("PRAGMA synchronous", [], |row| row.get(0))?;
    debug!(
        "PRAGMA current values - journal: {journal} synchronous: {}",
        synchronous_label(synchronous)
    );

    let journal_target = if tune { "MEMORY" } else { "DELETE" };
    let sync_target = if tune { "OFF" } else { "FULL" };
    // "PRAGMA journal_mode = X" returns the new mode as a result row
    let new_journal: String = conn.query_row(
        &format!("PRAGMA journal_mode = {journal_target}"),
        [],
        |row| row.get(0),
    )?;
    debug!("PRAGMA new value journal_mode: {new_journal}");

    conn.execute_batch(&format!("PRAGMA synchronous = {sync_target}"))?;
    let new_sync: i64 = conn.query_row("PRAGMA synchronous", [], |row| row.get(0))?;
    debug!("PRAGMA synchronous new value: {}", synchronous_label(new_sync));
    Ok(())
}

/// Replace the tag table with the given live collection.
///
/// Drop + create, then insert in chunks of `chunk_size` rows, each chunk
/// inside an explicit transaction. A failure aborts the remaining chunks
/// (rows committed by earlier chunks stay committed - callers must treat
/// the table as suspect and re-import) but still restores the PRAGMAs.
pub fn bulk_save_tags(
    conn: &Connection,
    tags: &[Handle<Tag>],
    chunk_size: usize,
) -> Result<(), StoreError> {
    debug!("now caching tags: {}", tags.len());
    tune_for_bulk_import(conn, true)?;
    let result = import_tags(conn, tags, chunk_size.max(1));
    // the restore must happen even when the import failed
    if let Err(e) = tune_for_bulk_import(conn, false) {
        warn!("cannot restore journal_mode/synchronous after bulk import: {e}");
    }
    result
}

fn import_tags(conn: &Connection, tags: &[Handle<Tag>], chunk_size: usize) -> Result<(), StoreError> {
    conn.execute_batch("DROP TABLE IF EXISTS tag")?;
    debug!("table dropped: tag");
    conn.execute_batch(Tag::CREATE_TABLE_SQL)?;
    debug!("table created: tag");

    debug!("begin insert chunks of tag ({chunk_size} rows per chunk)");
    let mut stmt = conn.prepare(Tag::INSERT_SQL)?;
    for chunk in tags.chunks(chunk_size) {
        conn.execute_batch("BEGIN TRANSACTION")?;
        let inserted = (|| -> rusqlite::Result<()> {
            for rc in chunk {
                let tag = rc.borrow();
                stmt.execute(params![tag.uuid, tag.name, tag.value, tag.color])?;
            }
            Ok(())
        })();
        match inserted {
            Ok(()) => conn.execute_batch("END TRANSACTION")?,
            Err(e) => {
                warn!("no success inserting tag batch: {e}");
                if let Err(rollback) = conn.execute_batch("ROLLBACK") {
                    warn!("cannot roll back failed tag batch: {rollback}");
                }
                return Err(e.into());
            }
        }
    }
    debug!("end insert chunks of tag");
    Ok(())
}

/// Stream the tag table into entities. Column positions are resolved once
/// per query, not per row.
pub fn load_tags(conn: &Connection) -> Result<Vec<Tag>, StoreError> {
    let mut stmt = conn.prepare("SELECT * FROM tag")?;
    let cols = TagColumns::from_stmt(&stmt)?;
    let rows = stmt.query_map([], |row| Tag::from_row(row, &cols))?;
    let mut tags = Vec::new();
    for tag in rows {
        tags.push(tag?);
    }
    Ok(tags)
}
