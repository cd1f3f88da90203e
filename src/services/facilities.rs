//! Rooms, room types and room reservations.

use chrono::NaiveDateTime;
use rusqlite::Connection;

use super::{
    ensure_active_employee, ensure_exists, ensure_interval, ensure_unreferenced, lookup, optional,
    required, ServiceError,
};
use crate::authorization::{require, Action, Entity, Role, Session};
use crate::db::repository::{self as repo, ConflictKey, ROOM_REFERENCES, ROOM_TYPE_REFERENCES};
use crate::models::*;

/// The booking being edited, excluded from its own overlap check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Booking {
    Reservation(i64),
    Appointment(i64),
    Meeting(i64),
}

/// A room is taken when any reservation, slot-holding appointment or meeting
/// intersects `[start, end)`.
pub(crate) fn ensure_room_free(
    conn: &Connection,
    room_id: i64,
    start: NaiveDateTime,
    end: NaiveDateTime,
    ignore: Option<Booking>,
) -> Result<(), ServiceError> {
    let (skip_reservation, skip_appointment, skip_meeting) = match ignore {
        Some(Booking::Reservation(id)) => (Some(id), None, None),
        Some(Booking::Appointment(id)) => (None, Some(id), None),
        Some(Booking::Meeting(id)) => (None, None, Some(id)),
        None => (None, None, None),
    };

    if let Some(r) = repo::find_overlapping_reservation(conn, room_id, start, end, skip_reservation)? {
        return Err(ServiceError::Conflict(format!(
            "room {room_id} is reserved from {} to {}",
            r.start_time, r.end_time
        )));
    }
    if let Some(a) = repo::find_conflicting_appointment(
        conn,
        ConflictKey::Room(room_id),
        start,
        end,
        skip_appointment,
    )? {
        return Err(ServiceError::Conflict(format!(
            "room {room_id} is used by appointment {} at {}",
            a.id, a.scheduled_at
        )));
    }
    if let Some(m) = repo::find_overlapping_meeting_in_room(conn, room_id, start, end, skip_meeting)? {
        return Err(ServiceError::Conflict(format!(
            "room {room_id} hosts meeting '{}' from {} to {}",
            m.topic, m.start_time, m.end_time
        )));
    }
    Ok(())
}

// ── Room types ───────────────────────────────────────────

pub fn create_room_type(conn: &Connection, session: &Session, name: &str) -> Result<RoomType, ServiceError> {
    require(session, Entity::RoomType, Action::Create)?;
    lookup::create(conn, "room type", name)
}

pub fn list_room_types(conn: &Connection, session: &Session) -> Result<Vec<RoomType>, ServiceError> {
    require(session, Entity::RoomType, Action::Read)?;
    Ok(repo::list_named(conn)?)
}

pub fn rename_room_type(
    conn: &Connection,
    session: &Session,
    id: i64,
    name: &str,
) -> Result<(), ServiceError> {
    require(session, Entity::RoomType, Action::Update)?;
    lookup::rename::<RoomType>(conn, "room type", id, name)
}

pub fn delete_room_type(conn: &Connection, session: &Session, id: i64) -> Result<(), ServiceError> {
    require(session, Entity::RoomType, Action::Delete)?;
    lookup::delete::<RoomType>(conn, "room type", ROOM_TYPE_REFERENCES, id)
}

// ── Rooms ────────────────────────────────────────────────

fn validated_room(conn: &Connection, input: &NewRoom, except: Option<i64>) -> Result<NewRoom, ServiceError> {
    let room_number = required("Room number", &input.room_number)?;
    ensure_exists(conn, "room_types", "room type", input.room_type_id)?;
    if input.capacity < 1 {
        return Err(ServiceError::Validation("Capacity must be at least 1".into()));
    }
    if let Some(existing) = repo::find_room_by_number(conn, &room_number)? {
        if Some(existing.id) != except {
            return Err(ServiceError::Duplicate {
                entity: "room",
                field: "room_number",
                value: room_number,
            });
        }
    }
    Ok(NewRoom {
        room_number,
        ..input.clone()
    })
}

fn existing_room(conn: &Connection, id: i64) -> Result<Room, ServiceError> {
    repo::get_room(conn, id)?.ok_or_else(|| ServiceError::not_found("Room", id))
}

pub fn create_room(conn: &Connection, session: &Session, input: &NewRoom) -> Result<Room, ServiceError> {
    require(session, Entity::Room, Action::Create)?;
    let input = validated_room(conn, input, None)?;
    let room = repo::insert_room(conn, &input)?;
    tracing::info!(by = %session.username, room = %room.room_number, "Room created");
    Ok(room)
}

pub fn get_room(conn: &Connection, session: &Session, id: i64) -> Result<Room, ServiceError> {
    require(session, Entity::Room, Action::Read)?;
    existing_room(conn, id)
}

pub fn list_rooms(
    conn: &Connection,
    session: &Session,
    room_type_id: Option<i64>,
) -> Result<Vec<Room>, ServiceError> {
    require(session, Entity::Room, Action::Read)?;
    Ok(repo::list_rooms(conn, room_type_id)?)
}

pub fn update_room(
    conn: &Connection,
    session: &Session,
    id: i64,
    input: &NewRoom,
) -> Result<(), ServiceError> {
    require(session, Entity::Room, Action::Update)?;
    existing_room(conn, id)?;
    let input = validated_room(conn, input, Some(id))?;
    repo::update_room(conn, id, &input)?;
    Ok(())
}

pub fn delete_room(conn: &Connection, session: &Session, id: i64) -> Result<(), ServiceError> {
    require(session, Entity::Room, Action::Delete)?;
    existing_room(conn, id)?;
    ensure_unreferenced(conn, ROOM_REFERENCES, "room", id)?;
    repo::delete_room(conn, id)?;
    tracing::info!(by = %session.username, room_id = id, "Room deleted");
    Ok(())
}

// ── Reservations ─────────────────────────────────────────

fn validated_reservation(
    conn: &Connection,
    session: &Session,
    role: Role,
    input: &NewRoomReservation,
    ignore: Option<Booking>,
) -> Result<NewRoomReservation, ServiceError> {
    if role == Role::Doctor && input.employee_id != session.employee_id {
        return Err(ServiceError::Validation(
            "Doctors can only reserve rooms for themselves".into(),
        ));
    }
    ensure_exists(conn, "rooms", "room", input.room_id)?;
    ensure_active_employee(conn, input.employee_id)?;
    ensure_interval(input.start_time, input.end_time)?;
    ensure_room_free(conn, input.room_id, input.start_time, input.end_time, ignore)?;
    Ok(NewRoomReservation {
        purpose: optional(input.purpose.as_deref()),
        ..input.clone()
    })
}

pub fn reserve_room(
    conn: &Connection,
    session: &Session,
    input: &NewRoomReservation,
) -> Result<RoomReservation, ServiceError> {
    let role = require(session, Entity::RoomReservation, Action::Create)?;
    let input = validated_reservation(conn, session, role, input, None)?;
    let reservation = repo::insert_reservation(conn, &input)?;
    tracing::info!(
        by = %session.username,
        room_id = reservation.room_id,
        start = %reservation.start_time,
        end = %reservation.end_time,
        "Room reserved"
    );
    Ok(reservation)
}

pub fn update_reservation(
    conn: &Connection,
    session: &Session,
    id: i64,
    input: &NewRoomReservation,
) -> Result<(), ServiceError> {
    let role = require(session, Entity::RoomReservation, Action::Update)?;
    if repo::get_reservation(conn, id)?.is_none() {
        return Err(ServiceError::not_found("RoomReservation", id));
    }
    let input = validated_reservation(conn, session, role, input, Some(Booking::Reservation(id)))?;
    repo::update_reservation(conn, id, &input)?;
    Ok(())
}

pub fn cancel_reservation(conn: &Connection, session: &Session, id: i64) -> Result<(), ServiceError> {
    require(session, Entity::RoomReservation, Action::Delete)?;
    repo::delete_reservation(conn, id)?;
    tracing::info!(by = %session.username, reservation_id = id, "Reservation cancelled");
    Ok(())
}

/// Reservations of a room, optionally only those ending after `from`.
pub fn list_reservations_for_room(
    conn: &Connection,
    session: &Session,
    room_id: i64,
    from: Option<NaiveDateTime>,
) -> Result<Vec<RoomReservation>, ServiceError> {
    require(session, Entity::RoomReservation, Action::Read)?;
    existing_room(conn, room_id)?;
    Ok(repo::list_reservations_for_room(conn, room_id, from)?)
}

pub fn room_is_free(
    conn: &Connection,
    session: &Session,
    room_id: i64,
    start: NaiveDateTime,
    end: NaiveDateTime,
) -> Result<bool, ServiceError> {
    require(session, Entity::Room, Action::Read)?;
    existing_room(conn, room_id)?;
    ensure_interval(start, end)?;
    match ensure_room_free(conn, room_id, start, end, None) {
        Ok(()) => Ok(true),
        Err(ServiceError::Conflict(_)) => Ok(false),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::*;

    fn setup(conn: &Connection) -> (Session, Room) {
        let admin = session_for(conn, Role::Administrator);
        let kind = create_room_type(conn, &admin, "Consulting room").unwrap();
        let room = create_room(
            conn,
            &admin,
            &NewRoom {
                room_number: "101".into(),
                room_type_id: kind.id,
                floor: 1,
                capacity: 2,
            },
        )
        .unwrap();
        (admin, room)
    }

    fn booking(room_id: i64, employee_id: i64, from: NaiveDateTime, to: NaiveDateTime) -> NewRoomReservation {
        NewRoomReservation {
            room_id,
            employee_id,
            start_time: from,
            end_time: to,
            purpose: Some("Ultrasound".into()),
        }
    }

    #[test]
    fn room_number_unique_and_type_required() {
        let conn = db();
        let (admin, room) = setup(&conn);
        let dup = NewRoom {
            room_number: " 101 ".into(),
            room_type_id: room.room_type_id,
            floor: 2,
            capacity: 1,
        };
        assert!(matches!(create_room(&conn, &admin, &dup), Err(ServiceError::Duplicate { .. })));
        assert!(matches!(
            create_room(&conn, &admin, &NewRoom { room_number: "102".into(), room_type_id: 99, ..dup.clone() }),
            Err(ServiceError::MissingReference { entity: "room type", .. })
        ));
        assert!(create_room(&conn, &admin, &NewRoom { room_number: "102".into(), capacity: 0, ..dup }).is_err());

        assert!(matches!(
            delete_room_type(&conn, &admin, room.room_type_id),
            Err(ServiceError::InUse { .. })
        ));
        assert_eq!(list_rooms(&conn, &admin, Some(room.room_type_id)).unwrap().len(), 1);
    }

    #[test]
    fn overlapping_reservations_rejected_adjacent_allowed() {
        let conn = db();
        let (admin, room) = setup(&conn);
        reserve_room(&conn, &admin, &booking(room.id, admin.employee_id, at(3, 9, 0), at(3, 10, 0))).unwrap();

        let err = reserve_room(&conn, &admin, &booking(room.id, admin.employee_id, at(3, 9, 30), at(3, 11, 0)))
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));

        reserve_room(&conn, &admin, &booking(room.id, admin.employee_id, at(3, 10, 0), at(3, 11, 0))).unwrap();
        assert!(!room_is_free(&conn, &admin, room.id, at(3, 8, 0), at(3, 12, 0)).unwrap());
        assert!(room_is_free(&conn, &admin, room.id, at(3, 11, 0), at(3, 12, 0)).unwrap());
    }

    #[test]
    fn reservation_needs_positive_interval() {
        let conn = db();
        let (admin, room) = setup(&conn);
        assert!(matches!(
            reserve_room(&conn, &admin, &booking(room.id, admin.employee_id, at(3, 10, 0), at(3, 10, 0))),
            Err(ServiceError::Validation(_))
        ));
    }

    #[test]
    fn moving_a_reservation_ignores_itself() {
        let conn = db();
        let (admin, room) = setup(&conn);
        let r = reserve_room(&conn, &admin, &booking(room.id, admin.employee_id, at(3, 9, 0), at(3, 10, 0))).unwrap();
        update_reservation(&conn, &admin, r.id, &booking(room.id, admin.employee_id, at(3, 9, 30), at(3, 10, 30)))
            .unwrap();
        let listed = list_reservations_for_room(&conn, &admin, room.id, None).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].start_time, at(3, 9, 30));

        cancel_reservation(&conn, &admin, r.id).unwrap();
        assert!(list_reservations_for_room(&conn, &admin, room.id, None).unwrap().is_empty());
    }

    #[test]
    fn doctors_reserve_only_for_themselves() {
        let conn = db();
        let (admin, room) = setup(&conn);
        let doctor = session_for(&conn, Role::Doctor);
        assert!(reserve_room(&conn, &doctor, &booking(room.id, admin.employee_id, at(4, 9, 0), at(4, 10, 0))).is_err());
        let r = reserve_room(&conn, &doctor, &booking(room.id, doctor.employee_id, at(4, 9, 0), at(4, 10, 0))).unwrap();
        assert!(matches!(
            cancel_reservation(&conn, &doctor, r.id),
            Err(ServiceError::Authorization(_))
        ));
    }

    #[test]
    fn booked_room_cannot_be_deleted() {
        let conn = db();
        let (admin, room) = setup(&conn);
        reserve_room(&conn, &admin, &booking(room.id, admin.employee_id, at(3, 9, 0), at(3, 10, 0))).unwrap();
        assert!(matches!(
            delete_room(&conn, &admin, room.id),
            Err(ServiceError::InUse { referenced_by: "room reservations", .. })
        ));
    }
}
