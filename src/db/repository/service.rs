use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::DatabaseError;
use crate::models::*;

pub(crate) const SERVICE_COLUMNS: &str = "id, name, description, price_cents";

pub(crate) fn service_from_row(row: &Row<'_>) -> rusqlite::Result<Service> {
    Ok(Service {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        price_cents: row.get(3)?,
    })
}

pub fn insert_service(conn: &Connection, svc: &NewService) -> Result<Service, DatabaseError> {
    conn.execute(
        "INSERT INTO services (name, description, price_cents) VALUES (?1, ?2, ?3)",
        params![svc.name, svc.description, svc.price_cents],
    )?;
    Ok(Service {
        id: conn.last_insert_rowid(),
        name: svc.name.clone(),
        description: svc.description.clone(),
        price_cents: svc.price_cents,
    })
}

pub fn get_service(conn: &Connection, id: i64) -> Result<Option<Service>, DatabaseError> {
    let found = conn
        .query_row(
            &format!("SELECT {SERVICE_COLUMNS} FROM services WHERE id = ?1"),
            params![id],
            service_from_row,
        )
        .optional()?;
    Ok(found)
}

pub fn find_service_by_name(conn: &Connection, name: &str) -> Result<Option<Service>, DatabaseError> {
    let found = conn
        .query_row(
            &format!("SELECT {SERVICE_COLUMNS} FROM services WHERE name = ?1 COLLATE NOCASE"),
            params![name],
            service_from_row,
        )
        .optional()?;
    Ok(found)
}

pub fn list_services(conn: &Connection) -> Result<Vec<Service>, DatabaseError> {
    let mut stmt = conn.prepare(&format!("SELECT {SERVICE_COLUMNS} FROM services ORDER BY name"))?;
    let rows = stmt
        .query_map([], service_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn update_service(conn: &Connection, id: i64, svc: &NewService) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        "UPDATE services SET name = ?1, description = ?2, price_cents = ?3 WHERE id = ?4",
        params![svc.name, svc.description, svc.price_cents, id],
    )?;
    if updated == 0 {
        return Err(DatabaseError::not_found("Service", id));
    }
    Ok(())
}

pub fn delete_service(conn: &Connection, id: i64) -> Result<(), DatabaseError> {
    let deleted = conn.execute("DELETE FROM services WHERE id = ?1", params![id])?;
    if deleted == 0 {
        return Err(DatabaseError::not_found("Service", id));
    }
    Ok(())
}
