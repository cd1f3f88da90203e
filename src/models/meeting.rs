use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeetingType {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InternalMeeting {
    pub id: i64,
    pub meeting_type_id: i64,
    pub organizer_id: i64,
    pub room_id: Option<i64>,
    pub topic: String,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewInternalMeeting {
    pub meeting_type_id: i64,
    pub organizer_id: i64,
    pub room_id: Option<i64>,
    pub topic: String,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeetingParticipant {
    pub meeting_id: i64,
    pub employee_id: i64,
}
