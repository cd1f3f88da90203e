use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{datetime_at, fmt_datetime, opt_datetime_at};
use crate::db::DatabaseError;
use crate::models::*;

const ACCOUNT_COLUMNS: &str =
    "id, employee_id, username, role_id, is_active, created_at, last_login_at";

fn account_from_row(row: &Row<'_>) -> rusqlite::Result<UserAccount> {
    Ok(UserAccount {
        id: row.get(0)?,
        employee_id: row.get(1)?,
        username: row.get(2)?,
        role_id: row.get(3)?,
        is_active: row.get(4)?,
        created_at: datetime_at(row, 5)?,
        last_login_at: opt_datetime_at(row, 6)?,
    })
}

/// Password material plus the fields login needs. Never leaves the crate.
#[derive(Debug, Clone)]
pub struct StoredCredentials {
    pub account: UserAccount,
    pub password_hash: String,
    pub password_salt: String,
}

pub fn insert_account(
    conn: &Connection,
    employee_id: i64,
    username: &str,
    password_hash: &str,
    password_salt: &str,
    role_id: i64,
    created_at: NaiveDateTime,
) -> Result<UserAccount, DatabaseError> {
    conn.execute(
        "INSERT INTO users_accounts
            (employee_id, username, password_hash, password_salt, role_id, is_active, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6)",
        params![
            employee_id,
            username,
            password_hash,
            password_salt,
            role_id,
            fmt_datetime(&created_at),
        ],
    )?;
    Ok(UserAccount {
        id: conn.last_insert_rowid(),
        employee_id,
        username: username.to_string(),
        role_id,
        is_active: true,
        created_at,
        last_login_at: None,
    })
}

pub fn get_account(conn: &Connection, id: i64) -> Result<Option<UserAccount>, DatabaseError> {
    let found = conn
        .query_row(
            &format!("SELECT {ACCOUNT_COLUMNS} FROM users_accounts WHERE id = ?1"),
            params![id],
            account_from_row,
        )
        .optional()?;
    Ok(found)
}

pub fn find_account_by_username(
    conn: &Connection,
    username: &str,
) -> Result<Option<UserAccount>, DatabaseError> {
    let found = conn
        .query_row(
            &format!(
                "SELECT {ACCOUNT_COLUMNS} FROM users_accounts WHERE username = ?1 COLLATE NOCASE"
            ),
            params![username],
            account_from_row,
        )
        .optional()?;
    Ok(found)
}

pub fn find_account_by_employee(
    conn: &Connection,
    employee_id: i64,
) -> Result<Option<UserAccount>, DatabaseError> {
    let found = conn
        .query_row(
            &format!("SELECT {ACCOUNT_COLUMNS} FROM users_accounts WHERE employee_id = ?1"),
            params![employee_id],
            account_from_row,
        )
        .optional()?;
    Ok(found)
}

pub fn get_credentials(
    conn: &Connection,
    username: &str,
) -> Result<Option<StoredCredentials>, DatabaseError> {
    let found = conn
        .query_row(
            &format!(
                "SELECT {ACCOUNT_COLUMNS}, password_hash, password_salt
                 FROM users_accounts WHERE username = ?1 COLLATE NOCASE"
            ),
            params![username],
            |row| {
                Ok(StoredCredentials {
                    account: account_from_row(row)?,
                    password_hash: row.get(7)?,
                    password_salt: row.get(8)?,
                })
            },
        )
        .optional()?;
    Ok(found)
}

pub fn get_credentials_by_id(
    conn: &Connection,
    id: i64,
) -> Result<Option<StoredCredentials>, DatabaseError> {
    let found = conn
        .query_row(
            &format!(
                "SELECT {ACCOUNT_COLUMNS}, password_hash, password_salt
                 FROM users_accounts WHERE id = ?1"
            ),
            params![id],
            |row| {
                Ok(StoredCredentials {
                    account: account_from_row(row)?,
                    password_hash: row.get(7)?,
                    password_salt: row.get(8)?,
                })
            },
        )
        .optional()?;
    Ok(found)
}

pub fn list_accounts(conn: &Connection) -> Result<Vec<UserAccount>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ACCOUNT_COLUMNS} FROM users_accounts ORDER BY username"
    ))?;
    let rows = stmt
        .query_map([], account_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn count_accounts(conn: &Connection) -> Result<i64, DatabaseError> {
    Ok(conn.query_row("SELECT COUNT(*) FROM users_accounts", [], |row| row.get(0))?)
}

pub fn update_account_role(conn: &Connection, id: i64, role_id: i64) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        "UPDATE users_accounts SET role_id = ?1 WHERE id = ?2",
        params![role_id, id],
    )?;
    if updated == 0 {
        return Err(DatabaseError::not_found("UserAccount", id));
    }
    Ok(())
}

pub fn set_account_active(conn: &Connection, id: i64, active: bool) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        "UPDATE users_accounts SET is_active = ?1 WHERE id = ?2",
        params![active, id],
    )?;
    if updated == 0 {
        return Err(DatabaseError::not_found("UserAccount", id));
    }
    Ok(())
}

pub fn update_password(
    conn: &Connection,
    id: i64,
    password_hash: &str,
    password_salt: &str,
) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        "UPDATE users_accounts SET password_hash = ?1, password_salt = ?2 WHERE id = ?3",
        params![password_hash, password_salt, id],
    )?;
    if updated == 0 {
        return Err(DatabaseError::not_found("UserAccount", id));
    }
    Ok(())
}

pub fn record_login(conn: &Connection, id: i64, at: NaiveDateTime) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE users_accounts SET last_login_at = ?1 WHERE id = ?2",
        params![fmt_datetime(&at), id],
    )?;
    Ok(())
}

pub fn delete_account(conn: &Connection, id: i64) -> Result<(), DatabaseError> {
    let deleted = conn.execute("DELETE FROM users_accounts WHERE id = ?1", params![id])?;
    if deleted == 0 {
        return Err(DatabaseError::not_found("UserAccount", id));
    }
    Ok(())
}
