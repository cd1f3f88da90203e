//! Rooms, room types and reservations.

use chrono::NaiveDateTime;

use super::as_user;
use crate::core_state::CoreState;
use crate::models::{NewRoom, NewRoomReservation, Room, RoomReservation, RoomType};
use crate::services::facilities;

pub fn create_room_type(name: String, state: &CoreState) -> Result<RoomType, String> {
    as_user(state, "create_room_type", |conn, s| facilities::create_room_type(conn, s, &name))
}

pub fn list_room_types(state: &CoreState) -> Result<Vec<RoomType>, String> {
    as_user(state, "list_room_types", facilities::list_room_types)
}

pub fn rename_room_type(id: i64, name: String, state: &CoreState) -> Result<(), String> {
    as_user(state, "rename_room_type", |conn, s| {
        facilities::rename_room_type(conn, s, id, &name)
    })
}

pub fn delete_room_type(id: i64, state: &CoreState) -> Result<(), String> {
    as_user(state, "delete_room_type", |conn, s| facilities::delete_room_type(conn, s, id))
}

pub fn create_room(input: NewRoom, state: &CoreState) -> Result<Room, String> {
    as_user(state, "create_room", |conn, s| facilities::create_room(conn, s, &input))
}

pub fn get_room(id: i64, state: &CoreState) -> Result<Room, String> {
    as_user(state, "get_room", |conn, s| facilities::get_room(conn, s, id))
}

pub fn list_rooms(room_type_id: Option<i64>, state: &CoreState) -> Result<Vec<Room>, String> {
    as_user(state, "list_rooms", |conn, s| facilities::list_rooms(conn, s, room_type_id))
}

pub fn update_room(id: i64, input: NewRoom, state: &CoreState) -> Result<(), String> {
    as_user(state, "update_room", |conn, s| facilities::update_room(conn, s, id, &input))
}

pub fn delete_room(id: i64, state: &CoreState) -> Result<(), String> {
    as_user(state, "delete_room", |conn, s| facilities::delete_room(conn, s, id))
}

pub fn reserve_room(input: NewRoomReservation, state: &CoreState) -> Result<RoomReservation, String> {
    as_user(state, "reserve_room", |conn, s| facilities::reserve_room(conn, s, &input))
}

pub fn update_reservation(id: i64, input: NewRoomReservation, state: &CoreState) -> Result<(), String> {
    as_user(state, "update_reservation", |conn, s| {
        facilities::update_reservation(conn, s, id, &input)
    })
}

pub fn cancel_reservation(id: i64, state: &CoreState) -> Result<(), String> {
    as_user(state, "cancel_reservation", |conn, s| facilities::cancel_reservation(conn, s, id))
}

/// Reservations of a room, optionally only those ending after `from`.
pub fn list_reservations(
    room_id: i64,
    from: Option<NaiveDateTime>,
    state: &CoreState,
) -> Result<Vec<RoomReservation>, String> {
    as_user(state, "list_reservations", |conn, s| {
        facilities::list_reservations_for_room(conn, s, room_id, from)
    })
}

pub fn room_is_free(
    room_id: i64,
    start: NaiveDateTime,
    end: NaiveDateTime,
    state: &CoreState,
) -> Result<bool, String> {
    as_user(state, "room_is_free", |conn, s| {
        facilities::room_is_free(conn, s, room_id, start, end)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::admin_state;
    use crate::services::test_support::at;

    #[test]
    fn reservation_blocks_room() {
        let state = admin_state();
        let me = state.current_session().unwrap().employee_id;
        let kind = create_room_type("Exam".into(), &state).unwrap();
        let room = create_room(
            NewRoom {
                room_number: "101".into(),
                room_type_id: kind.id,
                floor: 1,
                capacity: 2,
            },
            &state,
        )
        .unwrap();

        let booking = NewRoomReservation {
            room_id: room.id,
            employee_id: me,
            start_time: at(2, 9, 0),
            end_time: at(2, 10, 0),
            purpose: None,
        };
        let res = reserve_room(booking.clone(), &state).unwrap();
        assert!(!room_is_free(room.id, at(2, 9, 30), at(2, 9, 45), &state).unwrap());

        let err = reserve_room(booking, &state).unwrap_err();
        assert!(err.starts_with("Scheduling conflict"), "{err}");

        cancel_reservation(res.id, &state).unwrap();
        assert!(room_is_free(room.id, at(2, 9, 30), at(2, 9, 45), &state).unwrap());
        assert!(delete_room_type(kind.id, &state).is_err());
    }
}
