//! Patient records and care assignments.

use super::as_user;
use crate::core_state::CoreState;
use crate::models::{NewPatient, Patient, PatientAssignment, PatientFilter};
use crate::services::patients;

pub fn create_patient(input: NewPatient, state: &CoreState) -> Result<Patient, String> {
    as_user(state, "create_patient", |conn, s| patients::create_patient(conn, s, &input))
}

pub fn get_patient(id: i64, state: &CoreState) -> Result<Patient, String> {
    as_user(state, "get_patient", |conn, s| patients::get_patient(conn, s, id))
}

/// Patients visible to the current user, optionally filtered.
pub fn list_patients(filter: Option<PatientFilter>, state: &CoreState) -> Result<Vec<Patient>, String> {
    let filter = filter.unwrap_or_default();
    as_user(state, "list_patients", |conn, s| patients::list_patients(conn, s, &filter))
}

pub fn update_patient(id: i64, input: NewPatient, state: &CoreState) -> Result<(), String> {
    as_user(state, "update_patient", |conn, s| patients::update_patient(conn, s, id, &input))
}

pub fn delete_patient(id: i64, state: &CoreState) -> Result<(), String> {
    as_user(state, "delete_patient", |conn, s| patients::delete_patient(conn, s, id))
}

pub fn assign_patient(
    patient_id: i64,
    employee_id: i64,
    state: &CoreState,
) -> Result<PatientAssignment, String> {
    as_user(state, "assign_patient", |conn, s| {
        patients::assign_patient(conn, s, patient_id, employee_id)
    })
}

pub fn reassign_patient(
    patient_id: i64,
    employee_id: i64,
    state: &CoreState,
) -> Result<PatientAssignment, String> {
    as_user(state, "reassign_patient", |conn, s| {
        patients::reassign_patient(conn, s, patient_id, employee_id)
    })
}

pub fn end_assignment(id: i64, state: &CoreState) -> Result<(), String> {
    as_user(state, "end_assignment", |conn, s| patients::end_assignment(conn, s, id))
}

pub fn list_assignments(patient_id: i64, state: &CoreState) -> Result<Vec<PatientAssignment>, String> {
    as_user(state, "list_assignments", |conn, s| {
        patients::list_assignments_for_patient(conn, s, patient_id)
    })
}

pub fn delete_assignment(id: i64, state: &CoreState) -> Result<(), String> {
    as_user(state, "delete_assignment", |conn, s| patients::delete_assignment(conn, s, id))
}
