//! Pre-write checks shared by all services.

use std::sync::LazyLock;

use chrono::NaiveDateTime;
use regex::Regex;
use rusqlite::Connection;

use super::ServiceError;
use crate::db::repository::{first_reference, get_employee, row_exists, ReferenceCheck};
use crate::models::Employee;

static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap());

static PHONE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[0-9][0-9 \-]{5,18}[0-9]$").unwrap());

/// Trimmed value of a required text field.
pub fn required(field: &str, value: &str) -> Result<String, ServiceError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::Validation(format!("{field} is required")));
    }
    if trimmed.len() > 500 {
        return Err(ServiceError::Validation(format!("{field} is too long")));
    }
    Ok(trimmed.to_string())
}

/// Trimmed optional text; blank becomes `None`.
pub fn optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

pub fn email(field: &str, value: &str) -> Result<String, ServiceError> {
    let value = required(field, value)?;
    if !EMAIL_PATTERN.is_match(&value) {
        return Err(ServiceError::Validation(format!("{field} '{value}' is not a valid email address")));
    }
    Ok(value)
}

pub fn optional_email(field: &str, value: Option<&str>) -> Result<Option<String>, ServiceError> {
    optional(value).map(|v| email(field, &v)).transpose()
}

pub fn optional_phone(field: &str, value: Option<&str>) -> Result<Option<String>, ServiceError> {
    let Some(phone) = optional(value) else {
        return Ok(None);
    };
    if !PHONE_PATTERN.is_match(&phone) {
        return Err(ServiceError::Validation(format!("{field} '{phone}' is not a valid phone number")));
    }
    Ok(Some(phone))
}

/// Foreign-key pre-check: the referenced row must exist.
pub fn ensure_exists(
    conn: &Connection,
    table: &str,
    entity: &'static str,
    id: i64,
) -> Result<(), ServiceError> {
    if !row_exists(conn, table, id)? {
        return Err(ServiceError::MissingReference { entity, id });
    }
    Ok(())
}

/// Deletion pre-check: no dependent row may still point at `id`.
pub fn ensure_unreferenced(
    conn: &Connection,
    checks: &[ReferenceCheck],
    entity: &'static str,
    id: i64,
) -> Result<(), ServiceError> {
    if let Some(referenced_by) = first_reference(conn, checks, id)? {
        return Err(ServiceError::InUse {
            entity,
            id,
            referenced_by,
        });
    }
    Ok(())
}

/// The employee must exist and still be employed.
pub fn ensure_active_employee(conn: &Connection, employee_id: i64) -> Result<Employee, ServiceError> {
    let employee = get_employee(conn, employee_id)?.ok_or(ServiceError::MissingReference {
        entity: "employee",
        id: employee_id,
    })?;
    if !employee.is_active {
        return Err(ServiceError::Validation(format!(
            "Employee {} is inactive",
            employee.full_name()
        )));
    }
    Ok(employee)
}

pub fn ensure_interval(start: NaiveDateTime, end: NaiveDateTime) -> Result<(), ServiceError> {
    if end <= start {
        return Err(ServiceError::Validation(
            "End time must be after start time".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::ROLE_REFERENCES;
    use crate::db::sqlite::open_memory_database;

    #[test]
    fn required_trims_and_rejects_blank() {
        assert_eq!(required("Name", "  Ann ").unwrap(), "Ann");
        let err = required("Name", "   ").unwrap_err();
        assert_eq!(err.to_string(), "Name is required");
    }

    #[test]
    fn email_and_phone_formats() {
        assert!(email("Email", "a@b.co").is_ok());
        assert!(email("Email", "not-an-email").is_err());
        assert_eq!(optional_email("Email", Some("  ")).unwrap(), None);
        assert!(optional_phone("Phone", Some("+48 600-100-200")).unwrap().is_some());
        assert!(optional_phone("Phone", Some("call me")).is_err());
    }

    #[test]
    fn missing_reference_reported() {
        let conn = open_memory_database().unwrap();
        assert!(ensure_exists(&conn, "roles", "role", 1).is_ok());
        assert!(matches!(
            ensure_exists(&conn, "roles", "role", 50),
            Err(ServiceError::MissingReference { entity: "role", id: 50 })
        ));
        assert!(ensure_unreferenced(&conn, ROLE_REFERENCES, "role", 1).is_ok());
    }

    #[test]
    fn interval_must_be_positive() {
        let t = chrono::NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        assert!(ensure_interval(t, t).is_err());
        assert!(ensure_interval(t, t + chrono::Duration::minutes(1)).is_ok());
    }
}
