//! Patients and their responsible-employee assignments.

use rusqlite::Connection;

use super::{
    ensure_active_employee, ensure_exists, ensure_unreferenced, optional, optional_email,
    optional_phone, required, ServiceError,
};
use crate::authorization::{require, Action, Entity, Role, Session};
use crate::db::repository::{self as repo, PATIENT_REFERENCES};
use crate::models::filters::PatientFilter;
use crate::models::*;

// ── Visibility ───────────────────────────────────────────

/// Whether `role` acting as `session` may see the patient's data.
///
/// Doctors see patients assigned to them or booked with them; nurses only
/// assigned ones.
pub(crate) fn can_see_patient(
    conn: &Connection,
    session: &Session,
    role: Role,
    patient_id: i64,
) -> Result<bool, ServiceError> {
    if role.sees_all_patients() {
        return Ok(true);
    }
    Ok(repo::patient_linked_to_employee(
        conn,
        patient_id,
        session.employee_id,
        role == Role::Doctor,
    )?)
}

/// Hidden patients are reported as missing.
pub(crate) fn ensure_patient_visible(
    conn: &Connection,
    session: &Session,
    role: Role,
    patient_id: i64,
) -> Result<(), ServiceError> {
    if !can_see_patient(conn, session, role, patient_id)? {
        return Err(ServiceError::not_found("Patient", patient_id));
    }
    Ok(())
}

fn matches_filter(p: &Patient, filter: &PatientFilter) -> bool {
    let name_ok = optional(filter.name.as_deref()).map_or(true, |needle| {
        let needle = needle.to_lowercase();
        p.first_name.to_lowercase().contains(&needle) || p.last_name.to_lowercase().contains(&needle)
    });
    let nid_ok = optional(filter.national_id.as_deref()).map_or(true, |nid| p.national_id == nid);
    name_ok && nid_ok
}

// ── Patients ─────────────────────────────────────────────

fn validated(input: &NewPatient) -> Result<NewPatient, ServiceError> {
    if input.birth_date > repo::now_timestamp().date() {
        return Err(ServiceError::Validation("Birth date cannot be in the future".into()));
    }
    Ok(NewPatient {
        first_name: required("First name", &input.first_name)?,
        last_name: required("Last name", &input.last_name)?,
        birth_date: input.birth_date,
        gender: input.gender,
        national_id: required("National id", &input.national_id)?,
        phone: optional_phone("Phone", input.phone.as_deref())?,
        email: optional_email("Email", input.email.as_deref())?,
        address: optional(input.address.as_deref()),
    })
}

fn ensure_patient_exists(conn: &Connection, id: i64) -> Result<(), ServiceError> {
    if repo::get_patient(conn, id)?.is_none() {
        return Err(ServiceError::not_found("Patient", id));
    }
    Ok(())
}

fn ensure_national_id_free(
    conn: &Connection,
    national_id: &str,
    except: Option<i64>,
) -> Result<(), ServiceError> {
    match repo::find_patient_by_national_id(conn, national_id)? {
        Some(existing) if Some(existing.id) != except => Err(ServiceError::Duplicate {
            entity: "patient",
            field: "national_id",
            value: national_id.to_string(),
        }),
        _ => Ok(()),
    }
}

pub fn create_patient(
    conn: &Connection,
    session: &Session,
    input: &NewPatient,
) -> Result<Patient, ServiceError> {
    require(session, Entity::Patient, Action::Create)?;
    let input = validated(input)?;
    ensure_national_id_free(conn, &input.national_id, None)?;

    let patient = repo::insert_patient(conn, &input, repo::now_timestamp())?;
    tracing::info!(by = %session.username, patient_id = patient.id, "Patient created");
    Ok(patient)
}

pub fn get_patient(conn: &Connection, session: &Session, id: i64) -> Result<Patient, ServiceError> {
    let role = require(session, Entity::Patient, Action::Read)?;
    let patient = repo::get_patient(conn, id)?.ok_or_else(|| ServiceError::not_found("Patient", id))?;
    ensure_patient_visible(conn, session, role, id)?;
    Ok(patient)
}

/// Patients the caller is allowed to see, narrowed by `filter`.
pub fn list_patients(
    conn: &Connection,
    session: &Session,
    filter: &PatientFilter,
) -> Result<Vec<Patient>, ServiceError> {
    let role = require(session, Entity::Patient, Action::Read)?;
    if role.sees_all_patients() {
        return Ok(repo::list_patients(conn, filter)?);
    }
    let mut visible = repo::list_patients_for_employee(conn, session.employee_id, role == Role::Doctor)?;
    visible.retain(|p| matches_filter(p, filter));
    Ok(visible)
}

pub fn patients_visible_to(conn: &Connection, session: &Session) -> Result<Vec<Patient>, ServiceError> {
    list_patients(conn, session, &PatientFilter::default())
}

pub fn update_patient(
    conn: &Connection,
    session: &Session,
    id: i64,
    input: &NewPatient,
) -> Result<(), ServiceError> {
    let role = require(session, Entity::Patient, Action::Update)?;
    ensure_patient_exists(conn, id)?;
    ensure_patient_visible(conn, session, role, id)?;
    let input = validated(input)?;
    ensure_national_id_free(conn, &input.national_id, Some(id))?;

    repo::update_patient(conn, id, &input)?;
    tracing::info!(by = %session.username, patient_id = id, "Patient updated");
    Ok(())
}

pub fn delete_patient(conn: &Connection, session: &Session, id: i64) -> Result<(), ServiceError> {
    require(session, Entity::Patient, Action::Delete)?;
    ensure_patient_exists(conn, id)?;
    ensure_unreferenced(conn, PATIENT_REFERENCES, "patient", id)?;
    repo::delete_patient(conn, id)?;
    tracing::info!(by = %session.username, patient_id = id, "Patient deleted");
    Ok(())
}

// ── Assignments ──────────────────────────────────────────

pub fn assign_patient(
    conn: &Connection,
    session: &Session,
    patient_id: i64,
    employee_id: i64,
) -> Result<PatientAssignment, ServiceError> {
    require(session, Entity::Assignment, Action::Create)?;
    ensure_exists(conn, "patients", "patient", patient_id)?;
    ensure_active_employee(conn, employee_id)?;
    if repo::find_active_assignment(conn, patient_id)?.is_some() {
        return Err(ServiceError::Validation(format!(
            "Patient {patient_id} already has an active assignment; reassign instead"
        )));
    }

    let assignment = repo::insert_assignment(conn, patient_id, employee_id, repo::now_timestamp())?;
    tracing::info!(by = %session.username, patient_id, employee_id, "Patient assigned");
    Ok(assignment)
}

/// End the current assignment (if any) and assign `employee_id`, atomically.
pub fn reassign_patient(
    conn: &Connection,
    session: &Session,
    patient_id: i64,
    employee_id: i64,
) -> Result<PatientAssignment, ServiceError> {
    require(session, Entity::Assignment, Action::Update)?;
    ensure_exists(conn, "patients", "patient", patient_id)?;
    ensure_active_employee(conn, employee_id)?;

    let current = repo::find_active_assignment(conn, patient_id)?;
    if current.as_ref().is_some_and(|a| a.employee_id == employee_id) {
        return Err(ServiceError::Validation(
            "Patient is already assigned to this employee".into(),
        ));
    }

    let tx = conn.unchecked_transaction()?;
    if let Some(current) = &current {
        repo::deactivate_assignment(&tx, current.id)?;
    }
    let assignment = repo::insert_assignment(&tx, patient_id, employee_id, repo::now_timestamp())?;
    tx.commit()?;

    tracing::info!(
        by = %session.username,
        patient_id,
        from = ?current.map(|a| a.employee_id),
        to = employee_id,
        "Patient reassigned"
    );
    Ok(assignment)
}

pub fn end_assignment(conn: &Connection, session: &Session, id: i64) -> Result<(), ServiceError> {
    require(session, Entity::Assignment, Action::Update)?;
    let assignment =
        repo::get_assignment(conn, id)?.ok_or_else(|| ServiceError::not_found("PatientAssignment", id))?;
    if !assignment.is_active {
        return Err(ServiceError::Validation("Assignment has already ended".into()));
    }
    repo::deactivate_assignment(conn, id)?;
    tracing::info!(by = %session.username, assignment_id = id, "Assignment ended");
    Ok(())
}

pub fn list_assignments_for_patient(
    conn: &Connection,
    session: &Session,
    patient_id: i64,
) -> Result<Vec<PatientAssignment>, ServiceError> {
    let role = require(session, Entity::Assignment, Action::Read)?;
    ensure_exists(conn, "patients", "patient", patient_id)?;
    ensure_patient_visible(conn, session, role, patient_id)?;
    Ok(repo::list_assignments_for_patient(conn, patient_id)?)
}

pub fn delete_assignment(conn: &Connection, session: &Session, id: i64) -> Result<(), ServiceError> {
    require(session, Entity::Assignment, Action::Delete)?;
    repo::delete_assignment(conn, id)?;
    tracing::info!(by = %session.username, assignment_id = id, "Assignment deleted");
    Ok(())
}
