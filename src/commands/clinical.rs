//! Appointments, diagnoses, prescriptions and the patient record export.

use chrono::NaiveDateTime;

use super::as_user;
use crate::core_state::CoreState;
use crate::models::enums::AppointmentStatus;
use crate::models::*;
use crate::services::clinical::{self, PatientRecord};

// ── Appointments ────────────────────────────────────────────

pub fn schedule_appointment(input: NewAppointment, state: &CoreState) -> Result<Appointment, String> {
    as_user(state, "schedule_appointment", |conn, s| {
        clinical::schedule_appointment(conn, s, &input)
    })
}

pub fn get_appointment(id: i64, state: &CoreState) -> Result<Appointment, String> {
    as_user(state, "get_appointment", |conn, s| clinical::get_appointment(conn, s, id))
}

pub fn update_appointment(id: i64, input: NewAppointment, state: &CoreState) -> Result<(), String> {
    as_user(state, "update_appointment", |conn, s| {
        clinical::update_appointment(conn, s, id, &input)
    })
}

/// Move a scheduled appointment to completed, cancelled or no-show.
pub fn set_appointment_status(
    id: i64,
    status: AppointmentStatus,
    state: &CoreState,
) -> Result<(), String> {
    as_user(state, "set_appointment_status", |conn, s| {
        clinical::set_appointment_status(conn, s, id, status)
    })
}

pub fn delete_appointment(id: i64, state: &CoreState) -> Result<(), String> {
    as_user(state, "delete_appointment", |conn, s| clinical::delete_appointment(conn, s, id))
}

pub fn list_appointments(
    filter: Option<AppointmentFilter>,
    state: &CoreState,
) -> Result<Vec<Appointment>, String> {
    let filter = filter.unwrap_or_default();
    as_user(state, "list_appointments", |conn, s| {
        clinical::appointments_visible_to(conn, s, &filter)
    })
}

// ── Diagnoses ───────────────────────────────────────────────

pub fn record_diagnosis(input: NewDiagnosis, state: &CoreState) -> Result<Diagnosis, String> {
    as_user(state, "record_diagnosis", |conn, s| clinical::record_diagnosis(conn, s, &input))
}

pub fn update_diagnosis(
    id: i64,
    icd_code: Option<String>,
    description: String,
    state: &CoreState,
) -> Result<(), String> {
    as_user(state, "update_diagnosis", |conn, s| {
        clinical::update_diagnosis(conn, s, id, icd_code.as_deref(), &description)
    })
}

pub fn delete_diagnosis(id: i64, state: &CoreState) -> Result<(), String> {
    as_user(state, "delete_diagnosis", |conn, s| clinical::delete_diagnosis(conn, s, id))
}

pub fn list_diagnoses(patient_id: i64, state: &CoreState) -> Result<Vec<Diagnosis>, String> {
    as_user(state, "list_diagnoses", |conn, s| {
        clinical::diagnoses_for_patient(conn, s, patient_id)
    })
}

// ── Prescriptions ───────────────────────────────────────────

pub fn issue_prescription(input: NewPrescription, state: &CoreState) -> Result<Prescription, String> {
    as_user(state, "issue_prescription", |conn, s| {
        clinical::issue_prescription(conn, s, &input)
    })
}

pub fn update_prescription(id: i64, input: NewPrescription, state: &CoreState) -> Result<(), String> {
    as_user(state, "update_prescription", |conn, s| {
        clinical::update_prescription(conn, s, id, &input)
    })
}

pub fn delete_prescription(id: i64, state: &CoreState) -> Result<(), String> {
    as_user(state, "delete_prescription", |conn, s| clinical::delete_prescription(conn, s, id))
}

pub fn list_prescriptions(patient_id: i64, state: &CoreState) -> Result<Vec<Prescription>, String> {
    as_user(state, "list_prescriptions", |conn, s| {
        clinical::prescriptions_for_patient(conn, s, patient_id)
    })
}

// ── Patient record ──────────────────────────────────────────

pub fn get_patient_record(patient_id: i64, state: &CoreState) -> Result<PatientRecord, String> {
    as_user(state, "get_patient_record", |conn, s| {
        clinical::patient_record(conn, s, patient_id)
    })
}

/// Everything the current user may see about a patient, as pretty JSON.
pub fn export_patient_record(patient_id: i64, state: &CoreState) -> Result<String, String> {
    let record = get_patient_record(patient_id, state)?;
    let json = serde_json::to_string_pretty(&record).map_err(|e| {
        tracing::error!(patient_id, error = %e, "Failed to serialize patient record");
        format!("Export failed: {e}")
    })?;
    tracing::info!(patient_id, bytes = json.len(), "Patient record exported");
    Ok(json)
}

/// Appointments of the current user overlapping `[from, to)`, for a day view.
pub fn my_schedule(
    from: NaiveDateTime,
    to: NaiveDateTime,
    state: &CoreState,
) -> Result<Vec<Appointment>, String> {
    // a visit from the previous day may still run into the window
    let filter = AppointmentFilter {
        date_from: Some(from.date().pred_opt().unwrap_or(from.date())),
        date_to: Some(to.date()),
        ..Default::default()
    };
    as_user(state, "my_schedule", |conn, s| {
        let appointments = clinical::appointments_visible_to(conn, s, &filter)?;
        Ok(appointments
            .into_iter()
            .filter(|a| a.employee_id == s.employee_id && a.scheduled_at < to && a.ends_at() > from)
            .collect())
    })
}
