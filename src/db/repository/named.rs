//! Lookup tables that carry nothing but a unique name.

use rusqlite::{params, Connection, OptionalExtension};

use crate::db::DatabaseError;
use crate::models::{MeetingType, Role, RoomType, Specialty};

/// A record stored in an `(id, name)` table with a unique, case-insensitive name.
pub trait NamedRecord: Sized {
    const TABLE: &'static str;
    const ENTITY: &'static str;

    fn from_parts(id: i64, name: String) -> Self;

    fn id(&self) -> i64;
}

impl NamedRecord for Role {
    const TABLE: &'static str = "roles";
    const ENTITY: &'static str = "Role";

    fn from_parts(id: i64, name: String) -> Self {
        Self { id, name }
    }

    fn id(&self) -> i64 {
        self.id
    }
}

impl NamedRecord for Specialty {
    const TABLE: &'static str = "specialties";
    const ENTITY: &'static str = "Specialty";

    fn from_parts(id: i64, name: String) -> Self {
        Self { id, name }
    }

    fn id(&self) -> i64 {
        self.id
    }
}

impl NamedRecord for RoomType {
    const TABLE: &'static str = "room_types";
    const ENTITY: &'static str = "RoomType";

    fn from_parts(id: i64, name: String) -> Self {
        Self { id, name }
    }

    fn id(&self) -> i64 {
        self.id
    }
}

impl NamedRecord for MeetingType {
    const TABLE: &'static str = "meeting_types";
    const ENTITY: &'static str = "MeetingType";

    fn from_parts(id: i64, name: String) -> Self {
        Self { id, name }
    }

    fn id(&self) -> i64 {
        self.id
    }
}

pub fn insert_named<T: NamedRecord>(conn: &Connection, name: &str) -> Result<T, DatabaseError> {
    conn.execute(
        &format!("INSERT INTO {} (name) VALUES (?1)", T::TABLE),
        params![name],
    )?;
    Ok(T::from_parts(conn.last_insert_rowid(), name.to_string()))
}

pub fn get_named<T: NamedRecord>(conn: &Connection, id: i64) -> Result<Option<T>, DatabaseError> {
    let found = conn
        .query_row(
            &format!("SELECT id, name FROM {} WHERE id = ?1", T::TABLE),
            params![id],
            |row| Ok(T::from_parts(row.get(0)?, row.get(1)?)),
        )
        .optional()?;
    Ok(found)
}

/// Case-insensitive lookup by name.
pub fn find_named<T: NamedRecord>(
    conn: &Connection,
    name: &str,
) -> Result<Option<T>, DatabaseError> {
    let found = conn
        .query_row(
            &format!("SELECT id, name FROM {} WHERE name = ?1 COLLATE NOCASE", T::TABLE),
            params![name],
            |row| Ok(T::from_parts(row.get(0)?, row.get(1)?)),
        )
        .optional()?;
    Ok(found)
}

pub fn list_named<T: NamedRecord>(conn: &Connection) -> Result<Vec<T>, DatabaseError> {
    let mut stmt = conn.prepare(&format!("SELECT id, name FROM {} ORDER BY name", T::TABLE))?;
    let rows = stmt
        .query_map([], |row| Ok(T::from_parts(row.get(0)?, row.get(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn rename_named<T: NamedRecord>(
    conn: &Connection,
    id: i64,
    name: &str,
) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        &format!("UPDATE {} SET name = ?1 WHERE id = ?2", T::TABLE),
        params![name, id],
    )?;
    if updated == 0 {
        return Err(DatabaseError::not_found(T::ENTITY, id));
    }
    Ok(())
}

pub fn delete_named<T: NamedRecord>(conn: &Connection, id: i64) -> Result<(), DatabaseError> {
    let deleted = conn.execute(&format!("DELETE FROM {} WHERE id = ?1", T::TABLE), params![id])?;
    if deleted == 0 {
        return Err(DatabaseError::not_found(T::ENTITY, id));
    }
    Ok(())
}
