use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::enums::AppointmentStatus;

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct PatientFilter {
    /// Case-insensitive substring of first or last name.
    pub name: Option<String>,
    pub national_id: Option<String>,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct AppointmentFilter {
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub status: Option<AppointmentStatus>,
    pub patient_id: Option<i64>,
}
