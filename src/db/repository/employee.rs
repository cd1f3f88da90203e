use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{date_at, fmt_date, service_from_row, SERVICE_COLUMNS};
use crate::db::DatabaseError;
use crate::models::*;

const EMPLOYEE_COLUMNS: &str =
    "id, first_name, last_name, email, phone, hire_date, role_id, is_active";

fn employee_from_row(row: &Row<'_>) -> rusqlite::Result<Employee> {
    Ok(Employee {
        id: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        email: row.get(3)?,
        phone: row.get(4)?,
        hire_date: date_at(row, 5)?,
        role_id: row.get(6)?,
        is_active: row.get(7)?,
    })
}

pub fn insert_employee(conn: &Connection, emp: &NewEmployee) -> Result<Employee, DatabaseError> {
    conn.execute(
        "INSERT INTO employees (first_name, last_name, email, phone, hire_date, role_id, is_active)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1)",
        params![
            emp.first_name,
            emp.last_name,
            emp.email,
            emp.phone,
            fmt_date(&emp.hire_date),
            emp.role_id,
        ],
    )?;
    Ok(Employee {
        id: conn.last_insert_rowid(),
        first_name: emp.first_name.clone(),
        last_name: emp.last_name.clone(),
        email: emp.email.clone(),
        phone: emp.phone.clone(),
        hire_date: emp.hire_date,
        role_id: emp.role_id,
        is_active: true,
    })
}

pub fn get_employee(conn: &Connection, id: i64) -> Result<Option<Employee>, DatabaseError> {
    let found = conn
        .query_row(
            &format!("SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE id = ?1"),
            params![id],
            employee_from_row,
        )
        .optional()?;
    Ok(found)
}

/// Case-insensitive lookup used by the uniqueness pre-check.
pub fn find_employee_by_email(
    conn: &Connection,
    email: &str,
) -> Result<Option<Employee>, DatabaseError> {
    let found = conn
        .query_row(
            &format!("SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE email = ?1 COLLATE NOCASE"),
            params![email],
            employee_from_row,
        )
        .optional()?;
    Ok(found)
}

pub fn list_employees(conn: &Connection, active_only: bool) -> Result<Vec<Employee>, DatabaseError> {
    let sql = if active_only {
        format!("SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE is_active = 1 ORDER BY last_name, first_name")
    } else {
        format!("SELECT {EMPLOYEE_COLUMNS} FROM employees ORDER BY last_name, first_name")
    };
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], employee_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn update_employee(conn: &Connection, id: i64, emp: &NewEmployee) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        "UPDATE employees
         SET first_name = ?1, last_name = ?2, email = ?3, phone = ?4, hire_date = ?5, role_id = ?6
         WHERE id = ?7",
        params![
            emp.first_name,
            emp.last_name,
            emp.email,
            emp.phone,
            fmt_date(&emp.hire_date),
            emp.role_id,
            id,
        ],
    )?;
    if updated == 0 {
        return Err(DatabaseError::not_found("Employee", id));
    }
    Ok(())
}

pub fn set_employee_active(conn: &Connection, id: i64, active: bool) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        "UPDATE employees SET is_active = ?1 WHERE id = ?2",
        params![active, id],
    )?;
    if updated == 0 {
        return Err(DatabaseError::not_found("Employee", id));
    }
    Ok(())
}

pub fn delete_employee(conn: &Connection, id: i64) -> Result<(), DatabaseError> {
    let deleted = conn.execute("DELETE FROM employees WHERE id = ?1", params![id])?;
    if deleted == 0 {
        return Err(DatabaseError::not_found("Employee", id));
    }
    Ok(())
}

// ── Employee ↔ service links ─────────────────────────────

pub fn employee_has_service(
    conn: &Connection,
    employee_id: i64,
    service_id: i64,
) -> Result<bool, DatabaseError> {
    Ok(conn
        .query_row(
            "SELECT 1 FROM employee_services WHERE employee_id = ?1 AND service_id = ?2",
            params![employee_id, service_id],
            |_| Ok(()),
        )
        .optional()?
        .is_some())
}

pub fn link_employee_service(
    conn: &Connection,
    employee_id: i64,
    service_id: i64,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO employee_services (employee_id, service_id) VALUES (?1, ?2)",
        params![employee_id, service_id],
    )?;
    Ok(())
}

/// Returns false when the link did not exist.
pub fn unlink_employee_service(
    conn: &Connection,
    employee_id: i64,
    service_id: i64,
) -> Result<bool, DatabaseError> {
    let deleted = conn.execute(
        "DELETE FROM employee_services WHERE employee_id = ?1 AND service_id = ?2",
        params![employee_id, service_id],
    )?;
    Ok(deleted > 0)
}

pub fn list_services_of_employee(
    conn: &Connection,
    employee_id: i64,
) -> Result<Vec<Service>, DatabaseError> {
    let columns = SERVICE_COLUMNS
        .split(", ")
        .map(|c| format!("s.{c}"))
        .collect::<Vec<_>>()
        .join(", ");
    let mut stmt = conn.prepare(&format!(
        "SELECT {columns} FROM services s
         JOIN employee_services es ON es.service_id = s.id
         WHERE es.employee_id = ?1
         ORDER BY s.name"
    ))?;
    let rows = stmt
        .query_map(params![employee_id], service_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ── Employee ↔ specialty links ───────────────────────────

pub fn employee_has_specialty(
    conn: &Connection,
    employee_id: i64,
    specialty_id: i64,
) -> Result<bool, DatabaseError> {
    Ok(conn
        .query_row(
            "SELECT 1 FROM employee_specialties WHERE employee_id = ?1 AND specialty_id = ?2",
            params![employee_id, specialty_id],
            |_| Ok(()),
        )
        .optional()?
        .is_some())
}

pub fn link_employee_specialty(
    conn: &Connection,
    employee_id: i64,
    specialty_id: i64,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO employee_specialties (employee_id, specialty_id) VALUES (?1, ?2)",
        params![employee_id, specialty_id],
    )?;
    Ok(())
}

pub fn unlink_employee_specialty(
    conn: &Connection,
    employee_id: i64,
    specialty_id: i64,
) -> Result<bool, DatabaseError> {
    let deleted = conn.execute(
        "DELETE FROM employee_specialties WHERE employee_id = ?1 AND specialty_id = ?2",
        params![employee_id, specialty_id],
    )?;
    Ok(deleted > 0)
}

pub fn list_specialties_of_employee(
    conn: &Connection,
    employee_id: i64,
) -> Result<Vec<Specialty>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT s.id, s.name FROM specialties s
         JOIN employee_specialties es ON es.specialty_id = s.id
         WHERE es.employee_id = ?1
         ORDER BY s.name",
    )?;
    let rows = stmt
        .query_map(params![employee_id], |row| {
            Ok(Specialty {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}
