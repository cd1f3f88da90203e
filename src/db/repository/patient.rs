use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{date_at, datetime_at, enum_at, fmt_date, fmt_datetime};
use crate::db::DatabaseError;
use crate::models::*;

const PATIENT_COLUMNS: &str = "id, first_name, last_name, birth_date, gender, national_id, \
     phone, email, address, created_at";

fn patient_from_row(row: &Row<'_>) -> rusqlite::Result<Patient> {
    Ok(Patient {
        id: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        birth_date: date_at(row, 3)?,
        gender: enum_at(row, 4)?,
        national_id: row.get(5)?,
        phone: row.get(6)?,
        email: row.get(7)?,
        address: row.get(8)?,
        created_at: datetime_at(row, 9)?,
    })
}

pub fn insert_patient(
    conn: &Connection,
    p: &NewPatient,
    created_at: NaiveDateTime,
) -> Result<Patient, DatabaseError> {
    conn.execute(
        "INSERT INTO patients
            (first_name, last_name, birth_date, gender, national_id, phone, email, address, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            p.first_name,
            p.last_name,
            fmt_date(&p.birth_date),
            p.gender.as_str(),
            p.national_id,
            p.phone,
            p.email,
            p.address,
            fmt_datetime(&created_at),
        ],
    )?;
    Ok(Patient {
        id: conn.last_insert_rowid(),
        first_name: p.first_name.clone(),
        last_name: p.last_name.clone(),
        birth_date: p.birth_date,
        gender: p.gender,
        national_id: p.national_id.clone(),
        phone: p.phone.clone(),
        email: p.email.clone(),
        address: p.address.clone(),
        created_at,
    })
}

pub fn get_patient(conn: &Connection, id: i64) -> Result<Option<Patient>, DatabaseError> {
    let found = conn
        .query_row(
            &format!("SELECT {PATIENT_COLUMNS} FROM patients WHERE id = ?1"),
            params![id],
            patient_from_row,
        )
        .optional()?;
    Ok(found)
}

pub fn find_patient_by_national_id(
    conn: &Connection,
    national_id: &str,
) -> Result<Option<Patient>, DatabaseError> {
    let found = conn
        .query_row(
            &format!("SELECT {PATIENT_COLUMNS} FROM patients WHERE national_id = ?1"),
            params![national_id],
            patient_from_row,
        )
        .optional()?;
    Ok(found)
}

pub fn list_patients(conn: &Connection, filter: &PatientFilter) -> Result<Vec<Patient>, DatabaseError> {
    let name_pattern = filter
        .name
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| format!("%{s}%"));
    let mut stmt = conn.prepare(&format!(
        "SELECT {PATIENT_COLUMNS} FROM patients
         WHERE (?1 IS NULL OR first_name LIKE ?1 OR last_name LIKE ?1)
           AND (?2 IS NULL OR national_id = ?2)
         ORDER BY last_name, first_name"
    ))?;
    let rows = stmt
        .query_map(params![name_pattern, filter.national_id], patient_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Patients an employee is responsible for: active assignments, plus
/// (when `include_appointments`) anyone with an appointment with them.
pub fn list_patients_for_employee(
    conn: &Connection,
    employee_id: i64,
    include_appointments: bool,
) -> Result<Vec<Patient>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PATIENT_COLUMNS} FROM patients
         WHERE id IN (SELECT patient_id FROM assigned_patients
                      WHERE employee_id = ?1 AND is_active = 1)
            OR (?2 AND id IN (SELECT patient_id FROM appointments WHERE employee_id = ?1))
         ORDER BY last_name, first_name"
    ))?;
    let rows = stmt
        .query_map(params![employee_id, include_appointments], patient_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Single-patient form of `list_patients_for_employee`.
pub fn patient_linked_to_employee(
    conn: &Connection,
    patient_id: i64,
    employee_id: i64,
    include_appointments: bool,
) -> Result<bool, DatabaseError> {
    let found: bool = conn.query_row(
        "SELECT EXISTS (SELECT 1 FROM assigned_patients
                        WHERE patient_id = ?1 AND employee_id = ?2 AND is_active = 1)
             OR (?3 AND EXISTS (SELECT 1 FROM appointments
                                WHERE patient_id = ?1 AND employee_id = ?2))",
        params![patient_id, employee_id, include_appointments],
        |row| row.get(0),
    )?;
    Ok(found)
}

pub fn update_patient(conn: &Connection, id: i64, p: &NewPatient) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        "UPDATE patients
         SET first_name = ?1, last_name = ?2, birth_date = ?3, gender = ?4, national_id = ?5,
             phone = ?6, email = ?7, address = ?8
         WHERE id = ?9",
        params![
            p.first_name,
            p.last_name,
            fmt_date(&p.birth_date),
            p.gender.as_str(),
            p.national_id,
            p.phone,
            p.email,
            p.address,
            id,
        ],
    )?;
    if updated == 0 {
        return Err(DatabaseError::not_found("Patient", id));
    }
    Ok(())
}

pub fn delete_patient(conn: &Connection, id: i64) -> Result<(), DatabaseError> {
    let deleted = conn.execute("DELETE FROM patients WHERE id = ?1", params![id])?;
    if deleted == 0 {
        return Err(DatabaseError::not_found("Patient", id));
    }
    Ok(())
}

// ── Assignments ──────────────────────────────────────────

const ASSIGNMENT_COLUMNS: &str = "id, patient_id, employee_id, assigned_at, is_active";

fn assignment_from_row(row: &Row<'_>) -> rusqlite::Result<PatientAssignment> {
    Ok(PatientAssignment {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        employee_id: row.get(2)?,
        assigned_at: datetime_at(row, 3)?,
        is_active: row.get(4)?,
    })
}

pub fn insert_assignment(
    conn: &Connection,
    patient_id: i64,
    employee_id: i64,
    assigned_at: NaiveDateTime,
) -> Result<PatientAssignment, DatabaseError> {
    conn.execute(
        "INSERT INTO assigned_patients (patient_id, employee_id, assigned_at, is_active)
         VALUES (?1, ?2, ?3, 1)",
        params![patient_id, employee_id, fmt_datetime(&assigned_at)],
    )?;
    Ok(PatientAssignment {
        id: conn.last_insert_rowid(),
        patient_id,
        employee_id,
        assigned_at,
        is_active: true,
    })
}

pub fn get_assignment(conn: &Connection, id: i64) -> Result<Option<PatientAssignment>, DatabaseError> {
    let found = conn
        .query_row(
            &format!("SELECT {ASSIGNMENT_COLUMNS} FROM assigned_patients WHERE id = ?1"),
            params![id],
            assignment_from_row,
        )
        .optional()?;
    Ok(found)
}

pub fn find_active_assignment(
    conn: &Connection,
    patient_id: i64,
) -> Result<Option<PatientAssignment>, DatabaseError> {
    let found = conn
        .query_row(
            &format!(
                "SELECT {ASSIGNMENT_COLUMNS} FROM assigned_patients
                 WHERE patient_id = ?1 AND is_active = 1"
            ),
            params![patient_id],
            assignment_from_row,
        )
        .optional()?;
    Ok(found)
}

/// Full assignment history for a patient, newest first.
pub fn list_assignments_for_patient(
    conn: &Connection,
    patient_id: i64,
) -> Result<Vec<PatientAssignment>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ASSIGNMENT_COLUMNS} FROM assigned_patients
         WHERE patient_id = ?1 ORDER BY assigned_at DESC, id DESC"
    ))?;
    let rows = stmt
        .query_map(params![patient_id], assignment_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn list_active_assignments_for_employee(
    conn: &Connection,
    employee_id: i64,
) -> Result<Vec<PatientAssignment>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ASSIGNMENT_COLUMNS} FROM assigned_patients
         WHERE employee_id = ?1 AND is_active = 1 ORDER BY assigned_at"
    ))?;
    let rows = stmt
        .query_map(params![employee_id], assignment_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn deactivate_assignment(conn: &Connection, id: i64) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        "UPDATE assigned_patients SET is_active = 0 WHERE id = ?1",
        params![id],
    )?;
    if updated == 0 {
        return Err(DatabaseError::not_found("PatientAssignment", id));
    }
    Ok(())
}

pub fn delete_assignment(conn: &Connection, id: i64) -> Result<(), DatabaseError> {
    let deleted = conn.execute("DELETE FROM assigned_patients WHERE id = ?1", params![id])?;
    if deleted == 0 {
        return Err(DatabaseError::not_found("PatientAssignment", id));
    }
    Ok(())
}
