//! Internal staff meetings and their participants.

use rusqlite::Connection;

use super::facilities::{ensure_room_free, Booking};
use super::{
    ensure_active_employee, ensure_exists, ensure_interval, lookup, optional, required,
    ServiceError,
};
use crate::authorization::{require, Action, AuthorizationError, Entity, Role, Session};
use crate::db::repository::{self as repo, MEETING_TYPE_REFERENCES};
use crate::models::*;

// ── Meeting types ────────────────────────────────────────

pub fn create_meeting_type(conn: &Connection, session: &Session, name: &str) -> Result<MeetingType, ServiceError> {
    require(session, Entity::MeetingType, Action::Create)?;
    lookup::create(conn, "meeting type", name)
}

pub fn list_meeting_types(conn: &Connection, session: &Session) -> Result<Vec<MeetingType>, ServiceError> {
    require(session, Entity::MeetingType, Action::Read)?;
    Ok(repo::list_named(conn)?)
}

pub fn rename_meeting_type(
    conn: &Connection,
    session: &Session,
    id: i64,
    name: &str,
) -> Result<(), ServiceError> {
    require(session, Entity::MeetingType, Action::Update)?;
    lookup::rename::<MeetingType>(conn, "meeting type", id, name)
}

pub fn delete_meeting_type(conn: &Connection, session: &Session, id: i64) -> Result<(), ServiceError> {
    require(session, Entity::MeetingType, Action::Delete)?;
    lookup::delete::<MeetingType>(conn, "meeting type", MEETING_TYPE_REFERENCES, id)
}

// ── Meetings ─────────────────────────────────────────────

fn existing_meeting(conn: &Connection, id: i64) -> Result<InternalMeeting, ServiceError> {
    repo::get_meeting(conn, id)?.ok_or_else(|| ServiceError::not_found("InternalMeeting", id))
}

/// Doctors manage only meetings they organize.
fn ensure_organizer(
    session: &Session,
    role: Role,
    action: Action,
    organizer_id: i64,
) -> Result<(), ServiceError> {
    if role == Role::Doctor && organizer_id != session.employee_id {
        return Err(AuthorizationError::Forbidden {
            role: role.as_str(),
            entity: Entity::InternalMeeting,
            action,
        }
        .into());
    }
    Ok(())
}

fn validated_meeting(
    conn: &Connection,
    input: &NewInternalMeeting,
    exclude_id: Option<i64>,
) -> Result<NewInternalMeeting, ServiceError> {
    ensure_exists(conn, "meeting_types", "meeting type", input.meeting_type_id)?;
    ensure_active_employee(conn, input.organizer_id)?;
    let topic = required("Topic", &input.topic)?;
    ensure_interval(input.start_time, input.end_time)?;
    if let Some(room_id) = input.room_id {
        ensure_exists(conn, "rooms", "room", room_id)?;
        ensure_room_free(
            conn,
            room_id,
            input.start_time,
            input.end_time,
            exclude_id.map(Booking::Meeting),
        )?;
    }
    Ok(NewInternalMeeting {
        topic,
        notes: optional(input.notes.as_deref()),
        ..input.clone()
    })
}

pub fn create_meeting(
    conn: &Connection,
    session: &Session,
    input: &NewInternalMeeting,
) -> Result<InternalMeeting, ServiceError> {
    let role = require(session, Entity::InternalMeeting, Action::Create)?;
    ensure_organizer(session, role, Action::Create, input.organizer_id)?;
    let input = validated_meeting(conn, input, None)?;
    let meeting = repo::insert_meeting(conn, &input)?;
    tracing::info!(by = %session.username, meeting_id = meeting.id, topic = %meeting.topic, "Meeting created");
    Ok(meeting)
}

pub fn get_meeting(conn: &Connection, session: &Session, id: i64) -> Result<InternalMeeting, ServiceError> {
    require(session, Entity::InternalMeeting, Action::Read)?;
    existing_meeting(conn, id)
}

pub fn list_meetings(conn: &Connection, session: &Session) -> Result<Vec<InternalMeeting>, ServiceError> {
    require(session, Entity::InternalMeeting, Action::Read)?;
    Ok(repo::list_meetings(conn)?)
}

pub fn update_meeting(
    conn: &Connection,
    session: &Session,
    id: i64,
    input: &NewInternalMeeting,
) -> Result<(), ServiceError> {
    let role = require(session, Entity::InternalMeeting, Action::Update)?;
    let current = existing_meeting(conn, id)?;
    ensure_organizer(session, role, Action::Update, current.organizer_id)?;
    ensure_organizer(session, role, Action::Update, input.organizer_id)?;
    let input = validated_meeting(conn, input, Some(id))?;
    repo::update_meeting(conn, id, &input)?;
    tracing::info!(by = %session.username, meeting_id = id, "Meeting updated");
    Ok(())
}

/// Participants go with the meeting.
pub fn delete_meeting(conn: &Connection, session: &Session, id: i64) -> Result<(), ServiceError> {
    require(session, Entity::InternalMeeting, Action::Delete)?;
    repo::delete_meeting(conn, id)?;
    tracing::info!(by = %session.username, meeting_id = id, "Meeting deleted");
    Ok(())
}

// ── Participants ─────────────────────────────────────────

pub fn add_participant(
    conn: &Connection,
    session: &Session,
    meeting_id: i64,
    employee_id: i64,
) -> Result<MeetingParticipant, ServiceError> {
    let role = require(session, Entity::InternalMeeting, Action::Update)?;
    let meeting = existing_meeting(conn, meeting_id)?;
    ensure_organizer(session, role, Action::Update, meeting.organizer_id)?;
    ensure_active_employee(conn, employee_id)?;
    if employee_id == meeting.organizer_id {
        return Err(ServiceError::Validation(
            "The organizer already attends the meeting".into(),
        ));
    }
    if repo::is_participant(conn, meeting_id, employee_id)? {
        return Err(ServiceError::Duplicate {
            entity: "meeting participant",
            field: "employee_id",
            value: employee_id.to_string(),
        });
    }
    let participant = repo::add_participant(conn, meeting_id, employee_id)?;
    tracing::info!(by = %session.username, meeting_id, employee_id, "Participant added");
    Ok(participant)
}

pub fn remove_participant(
    conn: &Connection,
    session: &Session,
    meeting_id: i64,
    employee_id: i64,
) -> Result<(), ServiceError> {
    let role = require(session, Entity::InternalMeeting, Action::Update)?;
    let meeting = existing_meeting(conn, meeting_id)?;
    ensure_organizer(session, role, Action::Update, meeting.organizer_id)?;
    if !repo::remove_participant(conn, meeting_id, employee_id)? {
        return Err(ServiceError::NotFound {
            entity: "MeetingParticipant".into(),
            id: format!("{meeting_id}/{employee_id}"),
        });
    }
    Ok(())
}

pub fn list_participants(
    conn: &Connection,
    session: &Session,
    meeting_id: i64,
) -> Result<Vec<MeetingParticipant>, ServiceError> {
    require(session, Entity::InternalMeeting, Action::Read)?;
    existing_meeting(conn, meeting_id)?;
    Ok(repo::list_participants(conn, meeting_id)?)
}

/// Meetings an employee organizes or attends.
pub fn meetings_for_employee(
    conn: &Connection,
    session: &Session,
    employee_id: i64,
) -> Result<Vec<InternalMeeting>, ServiceError> {
    require(session, Entity::InternalMeeting, Action::Read)?;
    ensure_exists(conn, "employees", "employee", employee_id)?;
    Ok(repo::list_meetings_for_employee(conn, employee_id)?)
}
