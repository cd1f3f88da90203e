use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{datetime_at, fmt_datetime};
use crate::db::DatabaseError;
use crate::models::*;

const DIAGNOSIS_COLUMNS: &str =
    "id, appointment_id, patient_id, employee_id, icd_code, description, diagnosed_at";

fn diagnosis_from_row(row: &Row<'_>) -> rusqlite::Result<Diagnosis> {
    Ok(Diagnosis {
        id: row.get(0)?,
        appointment_id: row.get(1)?,
        patient_id: row.get(2)?,
        employee_id: row.get(3)?,
        icd_code: row.get(4)?,
        description: row.get(5)?,
        diagnosed_at: datetime_at(row, 6)?,
    })
}

/// Insert a diagnosis. Patient and employee come from the owning appointment.
pub fn insert_diagnosis(
    conn: &Connection,
    appointment: &Appointment,
    icd_code: Option<&str>,
    description: &str,
    diagnosed_at: NaiveDateTime,
) -> Result<Diagnosis, DatabaseError> {
    conn.execute(
        "INSERT INTO diagnoses (appointment_id, patient_id, employee_id, icd_code, description, diagnosed_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            appointment.id,
            appointment.patient_id,
            appointment.employee_id,
            icd_code,
            description,
            fmt_datetime(&diagnosed_at),
        ],
    )?;
    Ok(Diagnosis {
        id: conn.last_insert_rowid(),
        appointment_id: appointment.id,
        patient_id: appointment.patient_id,
        employee_id: appointment.employee_id,
        icd_code: icd_code.map(str::to_string),
        description: description.to_string(),
        diagnosed_at,
    })
}

pub fn get_diagnosis(conn: &Connection, id: i64) -> Result<Option<Diagnosis>, DatabaseError> {
    let found = conn
        .query_row(
            &format!("SELECT {DIAGNOSIS_COLUMNS} FROM diagnoses WHERE id = ?1"),
            params![id],
            diagnosis_from_row,
        )
        .optional()?;
    Ok(found)
}

pub fn list_diagnoses_for_patient(
    conn: &Connection,
    patient_id: i64,
) -> Result<Vec<Diagnosis>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {DIAGNOSIS_COLUMNS} FROM diagnoses
         WHERE patient_id = ?1 ORDER BY diagnosed_at DESC"
    ))?;
    let rows = stmt
        .query_map(params![patient_id], diagnosis_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn list_diagnoses_for_appointment(
    conn: &Connection,
    appointment_id: i64,
) -> Result<Vec<Diagnosis>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {DIAGNOSIS_COLUMNS} FROM diagnoses
         WHERE appointment_id = ?1 ORDER BY diagnosed_at"
    ))?;
    let rows = stmt
        .query_map(params![appointment_id], diagnosis_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn update_diagnosis(
    conn: &Connection,
    id: i64,
    icd_code: Option<&str>,
    description: &str,
) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        "UPDATE diagnoses SET icd_code = ?1, description = ?2 WHERE id = ?3",
        params![icd_code, description, id],
    )?;
    if updated == 0 {
        return Err(DatabaseError::not_found("Diagnosis", id));
    }
    Ok(())
}

pub fn delete_diagnosis(conn: &Connection, id: i64) -> Result<(), DatabaseError> {
    let deleted = conn.execute("DELETE FROM diagnoses WHERE id = ?1", params![id])?;
    if deleted == 0 {
        return Err(DatabaseError::not_found("Diagnosis", id));
    }
    Ok(())
}
