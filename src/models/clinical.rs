use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::enums::AppointmentStatus;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: i64,
    pub patient_id: i64,
    pub employee_id: i64,
    pub service_id: Option<i64>,
    pub room_id: Option<i64>,
    pub scheduled_at: NaiveDateTime,
    pub duration_minutes: i64,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
}

impl Appointment {
    pub fn ends_at(&self) -> NaiveDateTime {
        self.scheduled_at + Duration::minutes(self.duration_minutes)
    }
}

/// Input for scheduling or rescheduling an appointment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAppointment {
    pub patient_id: i64,
    pub employee_id: i64,
    pub service_id: Option<i64>,
    pub room_id: Option<i64>,
    pub scheduled_at: NaiveDateTime,
    pub duration_minutes: i64,
    pub notes: Option<String>,
}

impl NewAppointment {
    /// `None` when the end falls outside the representable range.
    pub fn ends_at(&self) -> Option<NaiveDateTime> {
        self.scheduled_at
            .checked_add_signed(Duration::minutes(self.duration_minutes))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnosis {
    pub id: i64,
    pub appointment_id: i64,
    pub patient_id: i64,
    pub employee_id: i64,
    pub icd_code: Option<String>,
    pub description: String,
    pub diagnosed_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDiagnosis {
    pub appointment_id: i64,
    pub icd_code: Option<String>,
    pub description: String,
    /// Defaults to the current time when absent.
    pub diagnosed_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prescription {
    pub id: i64,
    pub diagnosis_id: i64,
    pub patient_id: i64,
    pub employee_id: i64,
    pub medication: String,
    pub dosage: String,
    pub instructions: Option<String>,
    pub issued_at: NaiveDate,
    pub valid_until: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPrescription {
    pub diagnosis_id: i64,
    pub medication: String,
    pub dosage: String,
    pub instructions: Option<String>,
    pub issued_at: NaiveDate,
    pub valid_until: Option<NaiveDate>,
}
