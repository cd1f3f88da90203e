//! Create/rename/delete for the `(id, name)` lookup tables.

use rusqlite::Connection;

use super::{ensure_unreferenced, required, ServiceError};
use crate::db::repository::{self as repo, NamedRecord, ReferenceCheck};

fn ensure_name_free<T: NamedRecord>(
    conn: &Connection,
    entity: &'static str,
    name: &str,
    except: Option<i64>,
) -> Result<(), ServiceError> {
    match repo::find_named::<T>(conn, name)? {
        Some(existing) if Some(existing.id()) != except => Err(ServiceError::Duplicate {
            entity,
            field: "name",
            value: name.to_string(),
        }),
        _ => Ok(()),
    }
}

pub(crate) fn create<T: NamedRecord>(
    conn: &Connection,
    entity: &'static str,
    name: &str,
) -> Result<T, ServiceError> {
    let name = required("Name", name)?;
    ensure_name_free::<T>(conn, entity, &name, None)?;
    Ok(repo::insert_named(conn, &name)?)
}

pub(crate) fn rename<T: NamedRecord>(
    conn: &Connection,
    entity: &'static str,
    id: i64,
    name: &str,
) -> Result<(), ServiceError> {
    let name = required("Name", name)?;
    ensure_name_free::<T>(conn, entity, &name, Some(id))?;
    Ok(repo::rename_named::<T>(conn, id, &name)?)
}

pub(crate) fn delete<T: NamedRecord>(
    conn: &Connection,
    entity: &'static str,
    checks: &[ReferenceCheck],
    id: i64,
) -> Result<(), ServiceError> {
    if repo::get_named::<T>(conn, id)?.is_none() {
        return Err(ServiceError::not_found(T::ENTITY, id));
    }
    ensure_unreferenced(conn, checks, entity, id)?;
    Ok(repo::delete_named::<T>(conn, id)?)
}
