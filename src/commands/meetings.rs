//! Internal staff meetings.

use super::as_user;
use crate::core_state::CoreState;
use crate::models::{InternalMeeting, MeetingParticipant, MeetingType, NewInternalMeeting};
use crate::services::meetings;

pub fn create_meeting_type(name: String, state: &CoreState) -> Result<MeetingType, String> {
    as_user(state, "create_meeting_type", |conn, s| meetings::create_meeting_type(conn, s, &name))
}

pub fn list_meeting_types(state: &CoreState) -> Result<Vec<MeetingType>, String> {
    as_user(state, "list_meeting_types", meetings::list_meeting_types)
}

pub fn rename_meeting_type(id: i64, name: String, state: &CoreState) -> Result<(), String> {
    as_user(state, "rename_meeting_type", |conn, s| {
        meetings::rename_meeting_type(conn, s, id, &name)
    })
}

pub fn delete_meeting_type(id: i64, state: &CoreState) -> Result<(), String> {
    as_user(state, "delete_meeting_type", |conn, s| meetings::delete_meeting_type(conn, s, id))
}

pub fn create_meeting(input: NewInternalMeeting, state: &CoreState) -> Result<InternalMeeting, String> {
    as_user(state, "create_meeting", |conn, s| meetings::create_meeting(conn, s, &input))
}

pub fn get_meeting(id: i64, state: &CoreState) -> Result<InternalMeeting, String> {
    as_user(state, "get_meeting", |conn, s| meetings::get_meeting(conn, s, id))
}

pub fn list_meetings(state: &CoreState) -> Result<Vec<InternalMeeting>, String> {
    as_user(state, "list_meetings", meetings::list_meetings)
}

pub fn update_meeting(id: i64, input: NewInternalMeeting, state: &CoreState) -> Result<(), String> {
    as_user(state, "update_meeting", |conn, s| meetings::update_meeting(conn, s, id, &input))
}

pub fn delete_meeting(id: i64, state: &CoreState) -> Result<(), String> {
    as_user(state, "delete_meeting", |conn, s| meetings::delete_meeting(conn, s, id))
}

pub fn add_participant(
    meeting_id: i64,
    employee_id: i64,
    state: &CoreState,
) -> Result<MeetingParticipant, String> {
    as_user(state, "add_participant", |conn, s| {
        meetings::add_participant(conn, s, meeting_id, employee_id)
    })
}

pub fn remove_participant(meeting_id: i64, employee_id: i64, state: &CoreState) -> Result<(), String> {
    as_user(state, "remove_participant", |conn, s| {
        meetings::remove_participant(conn, s, meeting_id, employee_id)
    })
}

pub fn list_participants(meeting_id: i64, state: &CoreState) -> Result<Vec<MeetingParticipant>, String> {
    as_user(state, "list_participants", |conn, s| {
        meetings::list_participants(conn, s, meeting_id)
    })
}

/// Meetings the employee organizes or attends.
pub fn meetings_for_employee(employee_id: i64, state: &CoreState) -> Result<Vec<InternalMeeting>, String> {
    as_user(state, "meetings_for_employee", |conn, s| {
        meetings::meetings_for_employee(conn, s, employee_id)
    })
}
