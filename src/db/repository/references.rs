use rusqlite::{params, Connection, OptionalExtension};

use crate::db::DatabaseError;

/// A foreign-key column that may point at a row about to be deleted.
#[derive(Debug, Clone, Copy)]
pub struct ReferenceCheck {
    pub table: &'static str,
    pub column: &'static str,
    /// Human-readable name used in error messages.
    pub label: &'static str,
}

const fn check(table: &'static str, column: &'static str, label: &'static str) -> ReferenceCheck {
    ReferenceCheck { table, column, label }
}

pub const PATIENT_REFERENCES: &[ReferenceCheck] = &[
    check("assigned_patients", "patient_id", "patient assignments"),
    check("appointments", "patient_id", "appointments"),
    check("diagnoses", "patient_id", "diagnoses"),
    check("prescriptions", "patient_id", "prescriptions"),
];

pub const EMPLOYEE_REFERENCES: &[ReferenceCheck] = &[
    check("users_accounts", "employee_id", "user accounts"),
    check("assigned_patients", "employee_id", "patient assignments"),
    check("employee_services", "employee_id", "offered services"),
    check("employee_specialties", "employee_id", "specialties"),
    check("room_reservations", "employee_id", "room reservations"),
    check("appointments", "employee_id", "appointments"),
    check("diagnoses", "employee_id", "diagnoses"),
    check("prescriptions", "employee_id", "prescriptions"),
    check("internal_meetings", "organizer_id", "organized meetings"),
    check("meeting_participants", "employee_id", "meeting participation"),
];

pub const ROLE_REFERENCES: &[ReferenceCheck] = &[
    check("employees", "role_id", "employees"),
    check("users_accounts", "role_id", "user accounts"),
];

pub const SERVICE_REFERENCES: &[ReferenceCheck] = &[
    check("employee_services", "service_id", "employees offering it"),
    check("appointments", "service_id", "appointments"),
];

pub const SPECIALTY_REFERENCES: &[ReferenceCheck] = &[check(
    "employee_specialties",
    "specialty_id",
    "employees with this specialty",
)];

pub const ROOM_TYPE_REFERENCES: &[ReferenceCheck] = &[check("rooms", "room_type_id", "rooms")];

pub const ROOM_REFERENCES: &[ReferenceCheck] = &[
    check("room_reservations", "room_id", "room reservations"),
    check("appointments", "room_id", "appointments"),
    check("internal_meetings", "room_id", "meetings"),
];

pub const APPOINTMENT_REFERENCES: &[ReferenceCheck] =
    &[check("diagnoses", "appointment_id", "diagnoses")];

pub const DIAGNOSIS_REFERENCES: &[ReferenceCheck] =
    &[check("prescriptions", "diagnosis_id", "prescriptions")];

pub const MEETING_TYPE_REFERENCES: &[ReferenceCheck] =
    &[check("internal_meetings", "meeting_type_id", "meetings")];

/// Return the label of the first dependent table still referencing `id`.
pub fn first_reference(
    conn: &Connection,
    checks: &[ReferenceCheck],
    id: i64,
) -> Result<Option<&'static str>, DatabaseError> {
    for c in checks {
        let sql = format!("SELECT 1 FROM {} WHERE {} = ?1 LIMIT 1", c.table, c.column);
        let found = conn
            .query_row(&sql, params![id], |_| Ok(()))
            .optional()?
            .is_some();
        if found {
            return Ok(Some(c.label));
        }
    }
    Ok(None)
}

/// Whether a row with the given primary key exists in `table`.
pub fn row_exists(conn: &Connection, table: &str, id: i64) -> Result<bool, DatabaseError> {
    let sql = format!("SELECT 1 FROM {table} WHERE id = ?1");
    Ok(conn
        .query_row(&sql, params![id], |_| Ok(()))
        .optional()?
        .is_some())
}
