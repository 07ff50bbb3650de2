//! Tag entity - high-volume read-only reference collection
//!
//! Tags are the one collection large enough to be bulk-cached in SQLite,
//! so the entity carries its own SQL surface: table DDL, a
//! positional-parameter insert, and column positions resolved once per
//! query instead of per row.

use rusqlite::{Row, Statement};
use serde_json::json;

use crate::core::entity::{DataObject, MapKind};
use crate::core::identity::{ensure_uuid, new_uuid};
use crate::core::map::{self, DataMap};

#[derive(Debug, Clone, Default)]
pub struct Tag {
    pub uuid: String,
    pub name: String,
    pub value: i32,
    pub color: String,
}

/// Column positions of a `SELECT * FROM tag` result, resolved once.
#[derive(Debug, Clone, Copy)]
pub struct TagColumns {
    uuid: usize,
    name: usize,
    value: usize,
    color: usize,
}

impl TagColumns {
    pub fn from_stmt(stmt: &Statement<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            uuid: stmt.column_index("uuid")?,
            name: stmt.column_index("name")?,
            value: stmt.column_index("value")?,
            color: stmt.column_index("color")?,
        })
    }
}

impl Tag {
    pub const TABLE: &'static str = "tag";

    pub const CREATE_TABLE_SQL: &'static str =
        "CREATE TABLE tag (uuid TEXT PRIMARY KEY, name TEXT, value INTEGER, color TEXT);";

    pub const INSERT_SQL: &'static str =
        "INSERT INTO tag (uuid, name, value, color) VALUES (?, ?, ?, ?)";

    /// Build a tag from a query row using pre-resolved column positions.
    pub fn from_row(row: &Row<'_>, cols: &TagColumns) -> rusqlite::Result<Tag> {
        let mut tag = Tag {
            uuid: row.get::<_, Option<String>>(cols.uuid)?.unwrap_or_default(),
            name: row.get::<_, Option<String>>(cols.name)?.unwrap_or_default(),
            value: row.get::<_, Option<i32>>(cols.value)?.unwrap_or_default(),
            color: row.get::<_, Option<String>>(cols.color)?.unwrap_or_default(),
        };
        if let Some(fresh) = ensure_uuid(&tag.uuid) {
            tag.uuid = fresh;
        }
        Ok(tag)
    }
}

impl DataObject for Tag {
    fn uuid(&self) -> &str {
        &self.uuid
    }

    fn prepare_new(&mut self) {
        self.uuid = new_uuid();
    }

    fn is_valid(&self) -> bool {
        !self.uuid.is_empty()
    }

    fn fill(&mut self, m: &DataMap, _kind: MapKind) {
        if let Some(uuid) = map::get_string(m, "uuid") {
            self.uuid = uuid;
        }
        if let Some(fresh) = ensure_uuid(&self.uuid) {
            self.uuid = fresh;
        }
        if let Some(name) = map::get_string(m, "name") {
            self.name = name;
        }
        if let Some(value) = map::get_i32(m, "value") {
            self.value = value;
        }
        if let Some(color) = map::get_string(m, "color") {
            self.color = color;
        }
    }

    fn export(&self, _kind: MapKind) -> DataMap {
        let mut m = DataMap::new();
        m.insert("uuid".into(), json!(self.uuid));
        m.insert("name".into(), json!(self.name));
        m.insert("value".into(), json!(self.value));
        m.insert("color".into(), json!(self.color));
        m
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_round_trip() {
        let mut tag = Tag::default();
        tag.prepare_new();
        tag.name = "priority".into();
        tag.value = 3;
        tag.color = "#ff8800".into();

        let mut back = Tag::default();
        back.fill_from_cache_map(&tag.to_cache_map());
        assert_eq!(back.uuid, tag.uuid);
        assert_eq!(back.name, "priority");
        assert_eq!(back.value, 3);
        assert_eq!(back.color, "#ff8800");
    }

    #[test]
    fn test_fill_generates_missing_uuid() {
        let mut m = DataMap::new();
        m.insert("name".into(), json!("loose"));
        let mut tag = Tag::default();
        tag.fill_from_map(&m);
        assert_eq!(tag.uuid.len(), 36);
        assert_eq!(tag.name, "loose");
        assert!(tag.is_valid());
    }

    #[test]
    fn test_sql_round_trip() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch(Tag::CREATE_TABLE_SQL).unwrap();
        conn.execute(
            Tag::INSERT_SQL,
            rusqlite::params!["u-1", "alpha", 7, "#000000"],
        )
        .unwrap();

        let mut stmt = conn.prepare("SELECT * FROM tag").unwrap();
        let cols = TagColumns::from_stmt(&stmt).unwrap();
        let tags: Vec<Tag> = stmt
            .query_map([], |row| Tag::from_row(row, &cols))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].uuid, "u-1");
        assert_eq!(tags[0].value, 7);
    }

    #[test]
    fn test_from_row_tolerates_nulls() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch(Tag::CREATE_TABLE_SQL).unwrap();
        conn.execute("INSERT INTO tag (uuid) VALUES (NULL)", [])
            .unwrap();

        let mut stmt = conn.prepare("SELECT * FROM tag").unwrap();
        let cols = TagColumns::from_stmt(&stmt).unwrap();
        let tags: Vec<Tag> = stmt
            .query_map([], |row| Tag::from_row(row, &cols))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        // a NULL uuid is replaced by a generated one
        assert_eq!(tags[0].uuid.len(), 36);
        assert_eq!(tags[0].value, 0);
    }
}
