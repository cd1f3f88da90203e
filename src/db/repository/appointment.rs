use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{datetime_at, enum_at, fmt_date, fmt_datetime};
use crate::db::DatabaseError;
use crate::models::enums::AppointmentStatus;
use crate::models::*;

const APPOINTMENT_COLUMNS: &str = "id, patient_id, employee_id, service_id, room_id, \
     scheduled_at, duration_minutes, status, notes";

/// SQL expression for the end of an appointment, in stored timestamp format.
const ENDS_AT_SQL: &str = "datetime(scheduled_at, '+' || duration_minutes || ' minutes')";

fn appointment_from_row(row: &Row<'_>) -> rusqlite::Result<Appointment> {
    Ok(Appointment {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        employee_id: row.get(2)?,
        service_id: row.get(3)?,
        room_id: row.get(4)?,
        scheduled_at: datetime_at(row, 5)?,
        duration_minutes: row.get(6)?,
        status: enum_at(row, 7)?,
        notes: row.get(8)?,
    })
}

/// Which appointments a listing covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppointmentScope {
    All,
    /// Appointments conducted by this employee.
    Employee(i64),
    /// Appointments of patients actively assigned to this employee.
    AssignedTo(i64),
}

pub fn insert_appointment(
    conn: &Connection,
    a: &NewAppointment,
) -> Result<Appointment, DatabaseError> {
    conn.execute(
        "INSERT INTO appointments
            (patient_id, employee_id, service_id, room_id, scheduled_at, duration_minutes, status, notes)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            a.patient_id,
            a.employee_id,
            a.service_id,
            a.room_id,
            fmt_datetime(&a.scheduled_at),
            a.duration_minutes,
            AppointmentStatus::Scheduled.as_str(),
            a.notes,
        ],
    )?;
    Ok(Appointment {
        id: conn.last_insert_rowid(),
        patient_id: a.patient_id,
        employee_id: a.employee_id,
        service_id: a.service_id,
        room_id: a.room_id,
        scheduled_at: a.scheduled_at,
        duration_minutes: a.duration_minutes,
        status: AppointmentStatus::Scheduled,
        notes: a.notes.clone(),
    })
}

pub fn get_appointment(conn: &Connection, id: i64) -> Result<Option<Appointment>, DatabaseError> {
    let found = conn
        .query_row(
            &format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE id = ?1"),
            params![id],
            appointment_from_row,
        )
        .optional()?;
    Ok(found)
}

pub fn list_appointments(
    conn: &Connection,
    scope: AppointmentScope,
    filter: &AppointmentFilter,
) -> Result<Vec<Appointment>, DatabaseError> {
    let (scope_sql, scope_id) = match scope {
        AppointmentScope::All => ("?1 IS NULL", None),
        AppointmentScope::Employee(id) => ("employee_id = ?1", Some(id)),
        AppointmentScope::AssignedTo(id) => (
            "patient_id IN (SELECT patient_id FROM assigned_patients
                            WHERE employee_id = ?1 AND is_active = 1)",
            Some(id),
        ),
    };
    let from = filter.date_from.map(|d| fmt_date(&d));
    // the last representable day has no successor and needs no upper bound
    let to_exclusive = filter
        .date_to
        .and_then(|d| d.succ_opt())
        .map(|d| fmt_date(&d));
    let status = filter.status.map(|s| s.as_str());

    let mut stmt = conn.prepare(&format!(
        "SELECT {APPOINTMENT_COLUMNS} FROM appointments
         WHERE ({scope_sql})
           AND (?2 IS NULL OR scheduled_at >= ?2)
           AND (?3 IS NULL OR scheduled_at < ?3)
           AND (?4 IS NULL OR status = ?4)
           AND (?5 IS NULL OR patient_id = ?5)
         ORDER BY scheduled_at"
    ))?;
    let rows = stmt
        .query_map(
            params![scope_id, from, to_exclusive, status, filter.patient_id],
            appointment_from_row,
        )?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn update_appointment(
    conn: &Connection,
    id: i64,
    a: &NewAppointment,
) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        "UPDATE appointments
         SET patient_id = ?1, employee_id = ?2, service_id = ?3, room_id = ?4,
             scheduled_at = ?5, duration_minutes = ?6, notes = ?7
         WHERE id = ?8",
        params![
            a.patient_id,
            a.employee_id,
            a.service_id,
            a.room_id,
            fmt_datetime(&a.scheduled_at),
            a.duration_minutes,
            a.notes,
            id,
        ],
    )?;
    if updated == 0 {
        return Err(DatabaseError::not_found("Appointment", id));
    }
    Ok(())
}

pub fn set_appointment_status(
    conn: &Connection,
    id: i64,
    status: AppointmentStatus,
) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        "UPDATE appointments SET status = ?1 WHERE id = ?2",
        params![status.as_str(), id],
    )?;
    if updated == 0 {
        return Err(DatabaseError::not_found("Appointment", id));
    }
    Ok(())
}

pub fn delete_appointment(conn: &Connection, id: i64) -> Result<(), DatabaseError> {
    let deleted = conn.execute("DELETE FROM appointments WHERE id = ?1", params![id])?;
    if deleted == 0 {
        return Err(DatabaseError::not_found("Appointment", id));
    }
    Ok(())
}

/// Column an appointment conflict is checked on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKey {
    Employee(i64),
    Room(i64),
}

/// First slot-holding appointment intersecting `[start, end)` for the given
/// employee or room.
pub fn find_conflicting_appointment(
    conn: &Connection,
    key: ConflictKey,
    start: NaiveDateTime,
    end: NaiveDateTime,
    exclude_id: Option<i64>,
) -> Result<Option<Appointment>, DatabaseError> {
    let (column, id) = match key {
        ConflictKey::Employee(id) => ("employee_id", id),
        ConflictKey::Room(id) => ("room_id", id),
    };
    let found = conn
        .query_row(
            &format!(
                "SELECT {APPOINTMENT_COLUMNS} FROM appointments
                 WHERE {column} = ?1
                   AND status IN ('scheduled', 'completed')
                   AND scheduled_at < ?3 AND {ENDS_AT_SQL} > ?2
                   AND (?4 IS NULL OR id <> ?4)
                 ORDER BY scheduled_at LIMIT 1"
            ),
            params![id, fmt_datetime(&start), fmt_datetime(&end), exclude_id],
            appointment_from_row,
        )
        .optional()?;
    Ok(found)
}
