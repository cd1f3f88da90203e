use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{datetime_at, fmt_datetime};
use crate::db::DatabaseError;
use crate::models::*;

const ROOM_COLUMNS: &str = "id, room_number, room_type_id, floor, capacity";

fn room_from_row(row: &Row<'_>) -> rusqlite::Result<Room> {
    Ok(Room {
        id: row.get(0)?,
        room_number: row.get(1)?,
        room_type_id: row.get(2)?,
        floor: row.get(3)?,
        capacity: row.get(4)?,
    })
}

pub fn insert_room(conn: &Connection, room: &NewRoom) -> Result<Room, DatabaseError> {
    conn.execute(
        "INSERT INTO rooms (room_number, room_type_id, floor, capacity) VALUES (?1, ?2, ?3, ?4)",
        params![room.room_number, room.room_type_id, room.floor, room.capacity],
    )?;
    Ok(Room {
        id: conn.last_insert_rowid(),
        room_number: room.room_number.clone(),
        room_type_id: room.room_type_id,
        floor: room.floor,
        capacity: room.capacity,
    })
}

pub fn get_room(conn: &Connection, id: i64) -> Result<Option<Room>, DatabaseError> {
    let found = conn
        .query_row(
            &format!("SELECT {ROOM_COLUMNS} FROM rooms WHERE id = ?1"),
            params![id],
            room_from_row,
        )
        .optional()?;
    Ok(found)
}

pub fn find_room_by_number(conn: &Connection, number: &str) -> Result<Option<Room>, DatabaseError> {
    let found = conn
        .query_row(
            &format!("SELECT {ROOM_COLUMNS} FROM rooms WHERE room_number = ?1 COLLATE NOCASE"),
            params![number],
            room_from_row,
        )
        .optional()?;
    Ok(found)
}

pub fn list_rooms(conn: &Connection, room_type_id: Option<i64>) -> Result<Vec<Room>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ROOM_COLUMNS} FROM rooms
         WHERE ?1 IS NULL OR room_type_id = ?1
         ORDER BY floor, room_number"
    ))?;
    let rows = stmt
        .query_map(params![room_type_id], room_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn update_room(conn: &Connection, id: i64, room: &NewRoom) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        "UPDATE rooms SET room_number = ?1, room_type_id = ?2, floor = ?3, capacity = ?4
         WHERE id = ?5",
        params![room.room_number, room.room_type_id, room.floor, room.capacity, id],
    )?;
    if updated == 0 {
        return Err(DatabaseError::not_found("Room", id));
    }
    Ok(())
}

pub fn delete_room(conn: &Connection, id: i64) -> Result<(), DatabaseError> {
    let deleted = conn.execute("DELETE FROM rooms WHERE id = ?1", params![id])?;
    if deleted == 0 {
        return Err(DatabaseError::not_found("Room", id));
    }
    Ok(())
}

// ── Reservations ─────────────────────────────────────────

const RESERVATION_COLUMNS: &str = "id, room_id, employee_id, start_time, end_time, purpose";

fn reservation_from_row(row: &Row<'_>) -> rusqlite::Result<RoomReservation> {
    Ok(RoomReservation {
        id: row.get(0)?,
        room_id: row.get(1)?,
        employee_id: row.get(2)?,
        start_time: datetime_at(row, 3)?,
        end_time: datetime_at(row, 4)?,
        purpose: row.get(5)?,
    })
}

pub fn insert_reservation(
    conn: &Connection,
    r: &NewRoomReservation,
) -> Result<RoomReservation, DatabaseError> {
    conn.execute(
        "INSERT INTO room_reservations (room_id, employee_id, start_time, end_time, purpose)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            r.room_id,
            r.employee_id,
            fmt_datetime(&r.start_time),
            fmt_datetime(&r.end_time),
            r.purpose,
        ],
    )?;
    Ok(RoomReservation {
        id: conn.last_insert_rowid(),
        room_id: r.room_id,
        employee_id: r.employee_id,
        start_time: r.start_time,
        end_time: r.end_time,
        purpose: r.purpose.clone(),
    })
}

pub fn get_reservation(conn: &Connection, id: i64) -> Result<Option<RoomReservation>, DatabaseError> {
    let found = conn
        .query_row(
            &format!("SELECT {RESERVATION_COLUMNS} FROM room_reservations WHERE id = ?1"),
            params![id],
            reservation_from_row,
        )
        .optional()?;
    Ok(found)
}

pub fn update_reservation(
    conn: &Connection,
    id: i64,
    r: &NewRoomReservation,
) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        "UPDATE room_reservations
         SET room_id = ?1, employee_id = ?2, start_time = ?3, end_time = ?4, purpose = ?5
         WHERE id = ?6",
        params![
            r.room_id,
            r.employee_id,
            fmt_datetime(&r.start_time),
            fmt_datetime(&r.end_time),
            r.purpose,
            id,
        ],
    )?;
    if updated == 0 {
        return Err(DatabaseError::not_found("RoomReservation", id));
    }
    Ok(())
}

pub fn delete_reservation(conn: &Connection, id: i64) -> Result<(), DatabaseError> {
    let deleted = conn.execute("DELETE FROM room_reservations WHERE id = ?1", params![id])?;
    if deleted == 0 {
        return Err(DatabaseError::not_found("RoomReservation", id));
    }
    Ok(())
}

/// Reservations of a room, optionally only those ending after `from`.
pub fn list_reservations_for_room(
    conn: &Connection,
    room_id: i64,
    from: Option<NaiveDateTime>,
) -> Result<Vec<RoomReservation>, DatabaseError> {
    let from = from.map(|t| fmt_datetime(&t));
    let mut stmt = conn.prepare(&format!(
        "SELECT {RESERVATION_COLUMNS} FROM room_reservations
         WHERE room_id = ?1 AND (?2 IS NULL OR end_time > ?2)
         ORDER BY start_time"
    ))?;
    let rows = stmt
        .query_map(params![room_id, from], reservation_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn list_reservations_for_employee(
    conn: &Connection,
    employee_id: i64,
) -> Result<Vec<RoomReservation>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {RESERVATION_COLUMNS} FROM room_reservations
         WHERE employee_id = ?1 ORDER BY start_time"
    ))?;
    let rows = stmt
        .query_map(params![employee_id], reservation_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// First reservation of `room_id` intersecting the half-open interval `[start, end)`.
pub fn find_overlapping_reservation(
    conn: &Connection,
    room_id: i64,
    start: NaiveDateTime,
    end: NaiveDateTime,
    exclude_id: Option<i64>,
) -> Result<Option<RoomReservation>, DatabaseError> {
    let found = conn
        .query_row(
            &format!(
                "SELECT {RESERVATION_COLUMNS} FROM room_reservations
                 WHERE room_id = ?1 AND start_time < ?3 AND end_time > ?2
                   AND (?4 IS NULL OR id <> ?4)
                 ORDER BY start_time LIMIT 1"
            ),
            params![room_id, fmt_datetime(&start), fmt_datetime(&end), exclude_id],
            reservation_from_row,
        )
        .optional()?;
    Ok(found)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::db::repository::{insert_employee, insert_named};
    use crate::db::sqlite::open_memory_database;

    fn at(hour: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 3)
            .unwrap()
            .and_hms_opt(hour, min, 0)
            .unwrap()
    }

    fn setup(conn: &Connection) -> (Room, i64) {
        let rt: RoomType = insert_named(conn, "Consulting").unwrap();
        let room = insert_room(
            conn,
            &NewRoom {
                room_number: "1.04".into(),
                room_type_id: rt.id,
                floor: 1,
                capacity: 2,
            },
        )
        .unwrap();
        let emp = insert_employee(
            conn,
            &NewEmployee {
                first_name: "A".into(),
                last_name: "B".into(),
                email: "ab@clinic.test".into(),
                phone: None,
                hire_date: NaiveDate::from_ymd_opt(2021, 1, 1).unwrap(),
                role_id: 2,
            },
        )
        .unwrap();
        (room, emp.id)
    }

    fn reservation(room_id: i64, employee_id: i64, start: NaiveDateTime, end: NaiveDateTime) -> NewRoomReservation {
        NewRoomReservation {
            room_id,
            employee_id,
            start_time: start,
            end_time: end,
            purpose: Some("Ultrasound".into()),
        }
    }

    #[test]
    fn room_lookup_by_number_and_type() {
        let conn = open_memory_database().unwrap();
        let (room, _) = setup(&conn);
        assert_eq!(find_room_by_number(&conn, "1.04").unwrap().unwrap(), room);
        assert_eq!(list_rooms(&conn, Some(room.room_type_id)).unwrap().len(), 1);
        assert_eq!(list_rooms(&conn, Some(room.room_type_id + 1)).unwrap().len(), 0);
        assert_eq!(list_rooms(&conn, None).unwrap().len(), 1);
    }

    #[test]
    fn overlap_uses_half_open_intervals() {
        let conn = open_memory_database().unwrap();
        let (room, emp) = setup(&conn);
        let r = insert_reservation(&conn, &reservation(room.id, emp, at(9, 0), at(10, 0))).unwrap();

        // touching intervals do not overlap
        assert!(find_overlapping_reservation(&conn, room.id, at(10, 0), at(11, 0), None)
            .unwrap()
            .is_none());
        assert!(find_overlapping_reservation(&conn, room.id, at(8, 0), at(9, 0), None)
            .unwrap()
            .is_none());
        let hit = find_overlapping_reservation(&conn, room.id, at(9, 30), at(9, 45), None)
            .unwrap()
            .unwrap();
        assert_eq!(hit.id, r.id);
        // excluding itself when rescheduling
        assert!(find_overlapping_reservation(&conn, room.id, at(9, 30), at(10, 30), Some(r.id))
            .unwrap()
            .is_none());
    }

    #[test]
    fn reservation_update_and_listing() {
        let conn = open_memory_database().unwrap();
        let (room, emp) = setup(&conn);
        let r = insert_reservation(&conn, &reservation(room.id, emp, at(9, 0), at(10, 0))).unwrap();
        insert_reservation(&conn, &reservation(room.id, emp, at(12, 0), at(13, 0))).unwrap();

        update_reservation(&conn, r.id, &reservation(room.id, emp, at(7, 0), at(8, 0))).unwrap();
        assert_eq!(get_reservation(&conn, r.id).unwrap().unwrap().start_time, at(7, 0));

        assert_eq!(list_reservations_for_room(&conn, room.id, None).unwrap().len(), 2);
        assert_eq!(
            list_reservations_for_room(&conn, room.id, Some(at(11, 0))).unwrap().len(),
            1
        );
        assert_eq!(list_reservations_for_employee(&conn, emp).unwrap().len(), 2);

        delete_reservation(&conn, r.id).unwrap();
        assert!(get_reservation(&conn, r.id).unwrap().is_none());
    }
}
