//! Appointments, diagnoses and prescriptions.
//!
//! Doctors and nurses only reach clinical data of patients visible to them
//! (see [`super::patients`]); doctors only edit records they authored.

use std::sync::LazyLock;

use chrono::NaiveDateTime;
use regex::Regex;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use super::facilities::{ensure_room_free, Booking};
use super::patients::ensure_patient_visible;
use super::{
    ensure_active_employee, ensure_exists, ensure_unreferenced, optional, required, ServiceError,
};
use crate::authorization::{require, Action, AuthorizationError, Entity, Role, Session};
use crate::db::repository::{
    self as repo, AppointmentScope, ConflictKey, APPOINTMENT_REFERENCES, DIAGNOSIS_REFERENCES,
};
use crate::models::enums::AppointmentStatus;
use crate::models::filters::AppointmentFilter;
use crate::models::*;

/// Longest bookable appointment.
pub const MAX_APPOINTMENT_MINUTES: i64 = 8 * 60;

static ICD_CODE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z][0-9]{2}(\.[0-9A-Z]{1,4})?$").unwrap());

/// Doctors may only change clinical records they own.
fn ensure_author(
    session: &Session,
    role: Role,
    entity: Entity,
    action: Action,
    employee_id: i64,
) -> Result<(), ServiceError> {
    if role == Role::Doctor && employee_id != session.employee_id {
        tracing::warn!(user = %session.username, entity = entity.as_str(), "Not the record's author");
        return Err(AuthorizationError::Forbidden {
            role: role.as_str(),
            entity,
            action,
        }
        .into());
    }
    Ok(())
}

// ── Appointments ─────────────────────────────────────────

fn scope_for(session: &Session, role: Role) -> AppointmentScope {
    match role {
        Role::Doctor => AppointmentScope::Employee(session.employee_id),
        Role::Nurse => AppointmentScope::AssignedTo(session.employee_id),
        Role::Administrator | Role::Receptionist => AppointmentScope::All,
    }
}

fn visible_appointment(
    conn: &Connection,
    session: &Session,
    role: Role,
    id: i64,
) -> Result<Appointment, ServiceError> {
    let appointment =
        repo::get_appointment(conn, id)?.ok_or_else(|| ServiceError::not_found("Appointment", id))?;
    let visible = match role {
        Role::Doctor => appointment.employee_id == session.employee_id,
        Role::Nurse => repo::patient_linked_to_employee(conn, appointment.patient_id, session.employee_id, false)?,
        Role::Administrator | Role::Receptionist => true,
    };
    if !visible {
        return Err(ServiceError::not_found("Appointment", id));
    }
    Ok(appointment)
}

fn validated_appointment(
    conn: &Connection,
    input: &NewAppointment,
    exclude_id: Option<i64>,
) -> Result<NewAppointment, ServiceError> {
    ensure_exists(conn, "patients", "patient", input.patient_id)?;
    ensure_active_employee(conn, input.employee_id)?;
    if !(1..=MAX_APPOINTMENT_MINUTES).contains(&input.duration_minutes) {
        return Err(ServiceError::Validation(format!(
            "Duration must be between 1 and {MAX_APPOINTMENT_MINUTES} minutes"
        )));
    }
    if let Some(service_id) = input.service_id {
        ensure_exists(conn, "services", "service", service_id)?;
        if !repo::employee_has_service(conn, input.employee_id, service_id)? {
            return Err(ServiceError::Validation(format!(
                "Employee {} does not offer service {service_id}",
                input.employee_id
            )));
        }
    }

    let start = input.scheduled_at;
    let end = input
        .ends_at()
        .ok_or_else(|| ServiceError::Validation(format!("Appointment start {start} is out of range")))?;
    if let Some(other) =
        repo::find_conflicting_appointment(conn, ConflictKey::Employee(input.employee_id), start, end, exclude_id)?
    {
        return Err(ServiceError::Conflict(format!(
            "employee {} already has appointment {} at {}",
            input.employee_id, other.id, other.scheduled_at
        )));
    }
    if let Some(room_id) = input.room_id {
        ensure_exists(conn, "rooms", "room", room_id)?;
        ensure_room_free(conn, room_id, start, end, exclude_id.map(Booking::Appointment))?;
    }

    Ok(NewAppointment {
        notes: optional(input.notes.as_deref()),
        ..input.clone()
    })
}

pub fn schedule_appointment(
    conn: &Connection,
    session: &Session,
    input: &NewAppointment,
) -> Result<Appointment, ServiceError> {
    require(session, Entity::Appointment, Action::Create)?;
    let input = validated_appointment(conn, input, None)?;
    let appointment = repo::insert_appointment(conn, &input)?;
    tracing::info!(
        by = %session.username,
        appointment_id = appointment.id,
        employee_id = appointment.employee_id,
        at = %appointment.scheduled_at,
        "Appointment scheduled"
    );
    Ok(appointment)
}

pub fn get_appointment(conn: &Connection, session: &Session, id: i64) -> Result<Appointment, ServiceError> {
    let role = require(session, Entity::Appointment, Action::Read)?;
    visible_appointment(conn, session, role, id)
}

/// Reschedule or edit a still-scheduled appointment.
pub fn update_appointment(
    conn: &Connection,
    session: &Session,
    id: i64,
    input: &NewAppointment,
) -> Result<(), ServiceError> {
    let role = require(session, Entity::Appointment, Action::Update)?;
    let current = visible_appointment(conn, session, role, id)?;
    if current.status != AppointmentStatus::Scheduled {
        return Err(ServiceError::Validation(format!(
            "Only scheduled appointments can be changed; this one is {}",
            current.status
        )));
    }
    if role == Role::Doctor && input.employee_id != current.employee_id {
        return Err(ServiceError::Validation(
            "Doctors cannot hand appointments to another employee".into(),
        ));
    }
    if role == Role::Doctor && input.patient_id != current.patient_id {
        return Err(ServiceError::Validation(
            "Doctors cannot move appointments to another patient".into(),
        ));
    }
    let input = validated_appointment(conn, input, Some(id))?;
    repo::update_appointment(conn, id, &input)?;
    tracing::info!(by = %session.username, appointment_id = id, "Appointment updated");
    Ok(())
}

/// Scheduled appointments move to a final status once; final statuses stay.
pub fn set_appointment_status(
    conn: &Connection,
    session: &Session,
    id: i64,
    status: AppointmentStatus,
) -> Result<(), ServiceError> {
    let role = require(session, Entity::Appointment, Action::Update)?;
    let current = visible_appointment(conn, session, role, id)?;
    if current.status == status {
        return Ok(());
    }
    if current.status != AppointmentStatus::Scheduled {
        return Err(ServiceError::Validation(format!(
            "Appointment {id} is already {}",
            current.status
        )));
    }
    if !status.occupies_slot() {
        if let Some(label) = repo::first_reference(conn, APPOINTMENT_REFERENCES, id)? {
            return Err(ServiceError::Validation(format!(
                "Appointment {id} has {label} and cannot become {status}"
            )));
        }
    }
    repo::set_appointment_status(conn, id, status)?;
    tracing::info!(by = %session.username, appointment_id = id, status = %status, "Appointment status changed");
    Ok(())
}

pub fn delete_appointment(conn: &Connection, session: &Session, id: i64) -> Result<(), ServiceError> {
    let role = require(session, Entity::Appointment, Action::Delete)?;
    visible_appointment(conn, session, role, id)?;
    ensure_unreferenced(conn, APPOINTMENT_REFERENCES, "appointment", id)?;
    repo::delete_appointment(conn, id)?;
    tracing::info!(by = %session.username, appointment_id = id, "Appointment deleted");
    Ok(())
}

pub fn appointments_visible_to(
    conn: &Connection,
    session: &Session,
    filter: &AppointmentFilter,
) -> Result<Vec<Appointment>, ServiceError> {
    let role = require(session, Entity::Appointment, Action::Read)?;
    Ok(repo::list_appointments(conn, scope_for(session, role), filter)?)
}

// ── Diagnoses ────────────────────────────────────────────

fn normalized_icd(code: Option<&str>) -> Result<Option<String>, ServiceError> {
    let Some(code) = optional(code).map(|c| c.to_uppercase()) else {
        return Ok(None);
    };
    if !ICD_CODE_PATTERN.is_match(&code) {
        return Err(ServiceError::Validation(format!("'{code}' is not a valid ICD-10 code")));
    }
    Ok(Some(code))
}

fn existing_diagnosis(conn: &Connection, id: i64) -> Result<Diagnosis, ServiceError> {
    repo::get_diagnosis(conn, id)?.ok_or_else(|| ServiceError::not_found("Diagnosis", id))
}

/// Record a diagnosis on an appointment. Patient and employee come from the
/// appointment.
pub fn record_diagnosis(
    conn: &Connection,
    session: &Session,
    input: &NewDiagnosis,
) -> Result<Diagnosis, ServiceError> {
    let role = require(session, Entity::Diagnosis, Action::Create)?;
    let appointment = repo::get_appointment(conn, input.appointment_id)?.ok_or(
        ServiceError::MissingReference {
            entity: "appointment",
            id: input.appointment_id,
        },
    )?;
    ensure_author(session, role, Entity::Diagnosis, Action::Create, appointment.employee_id)?;
    if !appointment.status.occupies_slot() {
        return Err(ServiceError::Validation(format!(
            "Cannot diagnose a {} appointment",
            appointment.status
        )));
    }
    let description = required("Description", &input.description)?;
    let icd_code = normalized_icd(input.icd_code.as_deref())?;
    let diagnosed_at = input.diagnosed_at.unwrap_or_else(repo::now_timestamp);

    let diagnosis = repo::insert_diagnosis(conn, &appointment, icd_code.as_deref(), &description, diagnosed_at)?;
    tracing::info!(
        by = %session.username,
        diagnosis_id = diagnosis.id,
        patient_id = diagnosis.patient_id,
        "Diagnosis recorded"
    );
    Ok(diagnosis)
}

pub fn update_diagnosis(
    conn: &Connection,
    session: &Session,
    id: i64,
    icd_code: Option<&str>,
    description: &str,
) -> Result<(), ServiceError> {
    let role = require(session, Entity::Diagnosis, Action::Update)?;
    let current = existing_diagnosis(conn, id)?;
    ensure_author(session, role, Entity::Diagnosis, Action::Update, current.employee_id)?;
    let description = required("Description", description)?;
    let icd_code = normalized_icd(icd_code)?;
    repo::update_diagnosis(conn, id, icd_code.as_deref(), &description)?;
    Ok(())
}

pub fn delete_diagnosis(conn: &Connection, session: &Session, id: i64) -> Result<(), ServiceError> {
    let role = require(session, Entity::Diagnosis, Action::Delete)?;
    let current = existing_diagnosis(conn, id)?;
    ensure_author(session, role, Entity::Diagnosis, Action::Delete, current.employee_id)?;
    ensure_unreferenced(conn, DIAGNOSIS_REFERENCES, "diagnosis", id)?;
    repo::delete_diagnosis(conn, id)?;
    tracing::info!(by = %session.username, diagnosis_id = id, "Diagnosis deleted");
    Ok(())
}

pub fn diagnoses_for_patient(
    conn: &Connection,
    session: &Session,
    patient_id: i64,
) -> Result<Vec<Diagnosis>, ServiceError> {
    let role = require(session, Entity::Diagnosis, Action::Read)?;
    ensure_exists(conn, "patients", "patient", patient_id)?;
    ensure_patient_visible(conn, session, role, patient_id)?;
    Ok(repo::list_diagnoses_for_patient(conn, patient_id)?)
}

// ── Prescriptions ────────────────────────────────────────

fn validated_prescription(input: &NewPrescription) -> Result<NewPrescription, ServiceError> {
    if input.valid_until.is_some_and(|until| until < input.issued_at) {
        return Err(ServiceError::Validation(
            "Prescription cannot expire before it is issued".into(),
        ));
    }
    Ok(NewPrescription {
        diagnosis_id: input.diagnosis_id,
        medication: required("Medication", &input.medication)?,
        dosage: required("Dosage", &input.dosage)?,
        instructions: optional(input.instructions.as_deref()),
        issued_at: input.issued_at,
        valid_until: input.valid_until,
    })
}

fn existing_prescription(conn: &Connection, id: i64) -> Result<Prescription, ServiceError> {
    repo::get_prescription(conn, id)?.ok_or_else(|| ServiceError::not_found("Prescription", id))
}

/// Issue a prescription for a diagnosis of a patient visible to the doctor.
pub fn issue_prescription(
    conn: &Connection,
    session: &Session,
    input: &NewPrescription,
) -> Result<Prescription, ServiceError> {
    let role = require(session, Entity::Prescription, Action::Create)?;
    let diagnosis = repo::get_diagnosis(conn, input.diagnosis_id)?.ok_or(
        ServiceError::MissingReference {
            entity: "diagnosis",
            id: input.diagnosis_id,
        },
    )?;
    ensure_patient_visible(conn, session, role, diagnosis.patient_id)?;
    let input = validated_prescription(input)?;

    let prescription = repo::insert_prescription(conn, &input, &diagnosis, session.employee_id)?;
    tracing::info!(
        by = %session.username,
        prescription_id = prescription.id,
        patient_id = prescription.patient_id,
        "Prescription issued"
    );
    Ok(prescription)
}

pub fn update_prescription(
    conn: &Connection,
    session: &Session,
    id: i64,
    input: &NewPrescription,
) -> Result<(), ServiceError> {
    let role = require(session, Entity::Prescription, Action::Update)?;
    let current = existing_prescription(conn, id)?;
    ensure_author(session, role, Entity::Prescription, Action::Update, current.employee_id)?;
    if input.diagnosis_id != current.diagnosis_id {
        return Err(ServiceError::Validation(
            "A prescription cannot be moved to another diagnosis".into(),
        ));
    }
    let input = validated_prescription(input)?;
    repo::update_prescription(conn, id, &input)?;
    Ok(())
}

pub fn delete_prescription(conn: &Connection, session: &Session, id: i64) -> Result<(), ServiceError> {
    let role = require(session, Entity::Prescription, Action::Delete)?;
    let current = existing_prescription(conn, id)?;
    ensure_author(session, role, Entity::Prescription, Action::Delete, current.employee_id)?;
    repo::delete_prescription(conn, id)?;
    tracing::info!(by = %session.username, prescription_id = id, "Prescription deleted");
    Ok(())
}

pub fn prescriptions_for_patient(
    conn: &Connection,
    session: &Session,
    patient_id: i64,
) -> Result<Vec<Prescription>, ServiceError> {
    let role = require(session, Entity::Prescription, Action::Read)?;
    ensure_exists(conn, "patients", "patient", patient_id)?;
    ensure_patient_visible(conn, session, role, patient_id)?;
    Ok(repo::list_prescriptions_for_patient(conn, patient_id)?)
}

// ── Patient record ───────────────────────────────────────

/// Everything the caller may see about one patient.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientRecord {
    pub patient: Patient,
    pub assignments: Vec<PatientAssignment>,
    pub appointments: Vec<Appointment>,
    pub diagnoses: Vec<Diagnosis>,
    pub prescriptions: Vec<Prescription>,
    pub generated_at: NaiveDateTime,
}

pub fn patient_record(
    conn: &Connection,
    session: &Session,
    patient_id: i64,
) -> Result<PatientRecord, ServiceError> {
    let patient = super::patients::get_patient(conn, session, patient_id)?;
    let assignments = super::patients::list_assignments_for_patient(conn, session, patient_id)?;
    let appointments = appointments_visible_to(
        conn,
        session,
        &AppointmentFilter {
            patient_id: Some(patient_id),
            ..Default::default()
        },
    )?;
    let diagnoses = diagnoses_for_patient(conn, session, patient_id)?;
    let prescriptions = prescriptions_for_patient(conn, session, patient_id)?;

    Ok(PatientRecord {
        patient,
        assignments,
        appointments,
        diagnoses,
        prescriptions,
        generated_at: repo::now_timestamp(),
    })
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::services::test_support::*;

    struct Clinic {
        conn: Connection,
        desk: Session,
        doctor: Session,
        patient: Patient,
    }

    fn clinic() -> Clinic {
        let conn = db();
        let desk = session_for(&conn, Role::Receptionist);
        let doctor = session_for(&conn, Role::Doctor);
        let patient = patient(&conn, "80010100001");
        Clinic {
            conn,
            desk,
            doctor,
            patient,
        }
    }

    fn visit(patient_id: i64, employee_id: i64, at: NaiveDateTime) -> NewAppointment {
        NewAppointment {
            patient_id,
            employee_id,
            service_id: None,
            room_id: None,
            scheduled_at: at,
            duration_minutes: 30,
            notes: Some("  first visit ".into()),
        }
    }

    fn diagnose(c: &Clinic) -> Diagnosis {
        let appt = schedule_appointment(&c.conn, &c.desk, &visit(c.patient.id, c.doctor.employee_id, at(5, 9, 0))).unwrap();
        record_diagnosis(
            &c.conn,
            &c.doctor,
            &NewDiagnosis {
                appointment_id: appt.id,
                icd_code: Some("j06.9".into()),
                description: "Upper respiratory infection".into(),
                diagnosed_at: Some(at(5, 9, 20)),
            },
        )
        .unwrap()
    }

    fn script(diagnosis_id: i64) -> NewPrescription {
        NewPrescription {
            diagnosis_id,
            medication: "Ibuprofen".into(),
            dosage: "400 mg".into(),
            instructions: Some("After meals".into()),
            issued_at: NaiveDate::from_ymd_opt(2024, 9, 5).unwrap(),
            valid_until: NaiveDate::from_ymd_opt(2024, 10, 5),
        }
    }

    #[test]
    fn double_booking_an_employee_is_a_conflict() {
        let c = clinic();
        let a = schedule_appointment(&c.conn, &c.desk, &visit(c.patient.id, c.doctor.employee_id, at(5, 9, 0))).unwrap();
        assert_eq!(a.status, AppointmentStatus::Scheduled);
        assert_eq!(a.notes.as_deref(), Some("first visit"));

        let other = patient(&c.conn, "2");
        let err = schedule_appointment(&c.conn, &c.desk, &visit(other.id, c.doctor.employee_id, at(5, 9, 15))).unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));

        // back-to-back is fine
        schedule_appointment(&c.conn, &c.desk, &visit(other.id, c.doctor.employee_id, at(5, 9, 30))).unwrap();

        // a cancelled slot frees the employee
        set_appointment_status(&c.conn, &c.desk, a.id, AppointmentStatus::Cancelled).unwrap();
        let third = patient(&c.conn, "3");
        schedule_appointment(&c.conn, &c.desk, &visit(third.id, c.doctor.employee_id, at(5, 9, 0))).unwrap();
    }

    #[test]
    fn appointment_references_are_checked() {
        let c = clinic();
        assert!(matches!(
            schedule_appointment(&c.conn, &c.desk, &visit(999, c.doctor.employee_id, at(5, 9, 0))),
            Err(ServiceError::MissingReference { entity: "patient", .. })
        ));
        let mut input = visit(c.patient.id, c.doctor.employee_id, at(5, 9, 0));
        input.room_id = Some(42);
        assert!(matches!(
            schedule_appointment(&c.conn, &c.desk, &input),
            Err(ServiceError::MissingReference { entity: "room", .. })
        ));
        let mut input = visit(c.patient.id, c.doctor.employee_id, at(5, 9, 0));
        input.duration_minutes = 0;
        assert!(matches!(
            schedule_appointment(&c.conn, &c.desk, &input),
            Err(ServiceError::Validation(_))
        ));
    }

    #[test]
    fn doctor_cannot_book_and_sees_only_own_appointments() {
        let c = clinic();
        assert!(matches!(
            schedule_appointment(&c.conn, &c.doctor, &visit(c.patient.id, c.doctor.employee_id, at(5, 9, 0))),
            Err(ServiceError::Authorization(_))
        ));

        let colleague = session_for(&c.conn, Role::Doctor);
        let mine = schedule_appointment(&c.conn, &c.desk, &visit(c.patient.id, c.doctor.employee_id, at(5, 9, 0))).unwrap();
        let theirs = schedule_appointment(&c.conn, &c.desk, &visit(c.patient.id, colleague.employee_id, at(5, 9, 0))).unwrap();

        let seen = appointments_visible_to(&c.conn, &c.doctor, &AppointmentFilter::default()).unwrap();
        assert_eq!(seen.iter().map(|a| a.id).collect::<Vec<_>>(), vec![mine.id]);
        assert!(matches!(
            get_appointment(&c.conn, &c.doctor, theirs.id),
            Err(ServiceError::NotFound { .. })
        ));
        assert_eq!(appointments_visible_to(&c.conn, &c.desk, &AppointmentFilter::default()).unwrap().len(), 2);
    }

    #[test]
    fn nurse_sees_appointments_of_assigned_patients() {
        let c = clinic();
        let nurse = session_for(&c.conn, Role::Nurse);
        let a = schedule_appointment(&c.conn, &c.desk, &visit(c.patient.id, c.doctor.employee_id, at(5, 9, 0))).unwrap();
        assert!(appointments_visible_to(&c.conn, &nurse, &AppointmentFilter::default()).unwrap().is_empty());

        crate::services::patients::assign_patient(&c.conn, &c.desk, c.patient.id, nurse.employee_id).unwrap();
        let seen = appointments_visible_to(&c.conn, &nurse, &AppointmentFilter::default()).unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(get_appointment(&c.conn, &nurse, a.id).unwrap().id, a.id);
    }

    #[test]
    fn reschedule_only_while_scheduled() {
        let c = clinic();
        let a = schedule_appointment(&c.conn, &c.desk, &visit(c.patient.id, c.doctor.employee_id, at(5, 9, 0))).unwrap();
        update_appointment(&c.conn, &c.desk, a.id, &visit(c.patient.id, c.doctor.employee_id, at(5, 9, 15))).unwrap();
        assert_eq!(get_appointment(&c.conn, &c.desk, a.id).unwrap().scheduled_at, at(5, 9, 15));

        set_appointment_status(&c.conn, &c.doctor, a.id, AppointmentStatus::Completed).unwrap();
        assert!(update_appointment(&c.conn, &c.desk, a.id, &visit(c.patient.id, c.doctor.employee_id, at(6, 9, 0))).is_err());
        assert!(set_appointment_status(&c.conn, &c.desk, a.id, AppointmentStatus::Cancelled).is_err());
    }

    #[test]
    fn room_shared_with_reservations() {
        let c = clinic();
        let admin = session_for(&c.conn, Role::Administrator);
        let kind = crate::services::facilities::create_room_type(&c.conn, &admin, "Exam").unwrap();
        let room = crate::services::facilities::create_room(
            &c.conn,
            &admin,
            &NewRoom {
                room_number: "A1".into(),
                room_type_id: kind.id,
                floor: 0,
                capacity: 3,
            },
        )
        .unwrap();
        crate::services::facilities::reserve_room(
            &c.conn,
            &admin,
            &NewRoomReservation {
                room_id: room.id,
                employee_id: admin.employee_id,
                start_time: at(5, 8, 0),
                end_time: at(5, 10, 0),
                purpose: None,
            },
        )
        .unwrap();

        let mut input = visit(c.patient.id, c.doctor.employee_id, at(5, 9, 0));
        input.room_id = Some(room.id);
        assert!(matches!(
            schedule_appointment(&c.conn, &c.desk, &input),
            Err(ServiceError::Conflict(_))
        ));
        input.scheduled_at = at(5, 10, 0);
        schedule_appointment(&c.conn, &c.desk, &input).unwrap();
    }

    #[test]
    fn diagnosis_takes_patient_from_appointment() {
        let c = clinic();
        let d = diagnose(&c);
        assert_eq!(d.patient_id, c.patient.id);
        assert_eq!(d.employee_id, c.doctor.employee_id);
        assert_eq!(d.icd_code.as_deref(), Some("J06.9"));
        assert_eq!(diagnoses_for_patient(&c.conn, &c.doctor, c.patient.id).unwrap().len(), 1);
    }

    #[test]
    fn only_the_treating_doctor_records_diagnoses() {
        let c = clinic();
        let colleague = session_for(&c.conn, Role::Doctor);
        let appt = schedule_appointment(&c.conn, &c.desk, &visit(c.patient.id, c.doctor.employee_id, at(5, 9, 0))).unwrap();
        let input = NewDiagnosis {
            appointment_id: appt.id,
            icd_code: None,
            description: "Headache".into(),
            diagnosed_at: None,
        };
        assert!(matches!(
            record_diagnosis(&c.conn, &colleague, &input),
            Err(ServiceError::Authorization(_))
        ));
        assert!(matches!(
            record_diagnosis(&c.conn, &c.desk, &input),
            Err(ServiceError::Authorization(_))
        ));
        assert!(record_diagnosis(
            &c.conn,
            &c.doctor,
            &NewDiagnosis {
                icd_code: Some("not a code".into()),
                ..input.clone()
            }
        )
        .is_err());
        assert!(record_diagnosis(&c.conn, &c.doctor, &input).is_ok());
    }

    #[test]
    fn diagnosed_appointment_cannot_be_deleted() {
        let c = clinic();
        let d = diagnose(&c);
        let admin = session_for(&c.conn, Role::Administrator);
        assert!(matches!(
            delete_appointment(&c.conn, &admin, d.appointment_id),
            Err(ServiceError::InUse { referenced_by: "diagnoses", .. })
        ));
    }

    #[test]
    fn prescription_lifecycle() {
        let c = clinic();
        let d = diagnose(&c);
        let p = issue_prescription(&c.conn, &c.doctor, &script(d.id)).unwrap();
        assert_eq!(p.patient_id, c.patient.id);
        assert_eq!(p.employee_id, c.doctor.employee_id);

        let mut bad = script(d.id);
        bad.valid_until = NaiveDate::from_ymd_opt(2024, 9, 1);
        assert!(matches!(
            issue_prescription(&c.conn, &c.doctor, &bad),
            Err(ServiceError::Validation(_))
        ));

        assert!(matches!(
            delete_diagnosis(&c.conn, &c.doctor, d.id),
            Err(ServiceError::InUse { referenced_by: "prescriptions", .. })
        ));

        let mut changed = script(d.id);
        changed.dosage = "200 mg".into();
        update_prescription(&c.conn, &c.doctor, p.id, &changed).unwrap();
        let listed = prescriptions_for_patient(&c.conn, &c.doctor, c.patient.id).unwrap();
        assert_eq!(listed[0].dosage, "200 mg");

        let admin = session_for(&c.conn, Role::Administrator);
        delete_prescription(&c.conn, &admin, p.id).unwrap();
        delete_diagnosis(&c.conn, &c.doctor, d.id).unwrap();
    }

    #[test]
    fn doctor_without_link_cannot_prescribe() {
        let c = clinic();
        let d = diagnose(&c);
        let stranger = session_for(&c.conn, Role::Doctor);
        assert!(matches!(
            issue_prescription(&c.conn, &stranger, &script(d.id)),
            Err(ServiceError::NotFound { .. })
        ));
        assert!(matches!(
            prescriptions_for_patient(&c.conn, &stranger, c.patient.id),
            Err(ServiceError::NotFound { .. })
        ));
    }

    #[test]
    fn patient_record_collects_everything() {
        let c = clinic();
        let d = diagnose(&c);
        issue_prescription(&c.conn, &c.doctor, &script(d.id)).unwrap();

        let record = patient_record(&c.conn, &c.doctor, c.patient.id).unwrap();
        assert_eq!(record.patient.id, c.patient.id);
        assert_eq!(record.appointments.len(), 1);
        assert_eq!(record.diagnoses.len(), 1);
        assert_eq!(record.prescriptions.len(), 1);

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["prescriptions"][0]["medication"], "Ibuprofen");

        // receptionists cannot read clinical data
        assert!(patient_record(&c.conn, &c.desk, c.patient.id).is_err());
    }

    #[test]
    fn doctor_cannot_move_appointment_to_hidden_patient() {
        let c = clinic();
        let stranger = patient(&c.conn, "90020200002");
        let a = schedule_appointment(&c.conn, &c.desk, &visit(c.patient.id, c.doctor.employee_id, at(5, 9, 0))).unwrap();
        assert!(crate::services::patients::get_patient(&c.conn, &c.doctor, stranger.id).is_err());

        let err = update_appointment(&c.conn, &c.doctor, a.id, &visit(stranger.id, c.doctor.employee_id, at(5, 9, 0)))
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        assert_eq!(get_appointment(&c.conn, &c.desk, a.id).unwrap().patient_id, c.patient.id);
        assert!(crate::services::patients::get_patient(&c.conn, &c.doctor, stranger.id).is_err());

        // the doctor may still reschedule their own visit
        update_appointment(&c.conn, &c.doctor, a.id, &visit(c.patient.id, c.doctor.employee_id, at(5, 11, 0))).unwrap();
    }

    #[test]
    fn diagnosed_appointment_keeps_its_slot() {
        let c = clinic();
        let d = diagnose(&c);
        for status in [AppointmentStatus::Cancelled, AppointmentStatus::NoShow] {
            assert!(matches!(
                set_appointment_status(&c.conn, &c.desk, d.appointment_id, status),
                Err(ServiceError::Validation(_))
            ));
        }
        set_appointment_status(&c.conn, &c.doctor, d.appointment_id, AppointmentStatus::Completed).unwrap();
    }

    #[test]
    fn extreme_dates_are_rejected_not_panicking() {
        let c = clinic();
        let filter = AppointmentFilter {
            date_to: Some(NaiveDate::MAX),
            ..Default::default()
        };
        let a = schedule_appointment(&c.conn, &c.desk, &visit(c.patient.id, c.doctor.employee_id, at(5, 9, 0))).unwrap();
        assert_eq!(appointments_visible_to(&c.conn, &c.desk, &filter).unwrap(), vec![a]);

        let late = NaiveDate::MAX.and_hms_opt(23, 50, 0).unwrap();
        assert!(matches!(
            schedule_appointment(&c.conn, &c.desk, &visit(c.patient.id, c.doctor.employee_id, late)),
            Err(ServiceError::Validation(_))
        ));
    }
}
