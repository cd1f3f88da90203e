use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{datetime_at, fmt_datetime};
use crate::db::DatabaseError;
use crate::models::*;

const MEETING_COLUMNS: &str =
    "id, meeting_type_id, organizer_id, room_id, topic, start_time, end_time, notes";

fn meeting_from_row(row: &Row<'_>) -> rusqlite::Result<InternalMeeting> {
    Ok(InternalMeeting {
        id: row.get(0)?,
        meeting_type_id: row.get(1)?,
        organizer_id: row.get(2)?,
        room_id: row.get(3)?,
        topic: row.get(4)?,
        start_time: datetime_at(row, 5)?,
        end_time: datetime_at(row, 6)?,
        notes: row.get(7)?,
    })
}

pub fn insert_meeting(
    conn: &Connection,
    m: &NewInternalMeeting,
) -> Result<InternalMeeting, DatabaseError> {
    conn.execute(
        "INSERT INTO internal_meetings
            (meeting_type_id, organizer_id, room_id, topic, start_time, end_time, notes)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            m.meeting_type_id,
            m.organizer_id,
            m.room_id,
            m.topic,
            fmt_datetime(&m.start_time),
            fmt_datetime(&m.end_time),
            m.notes,
        ],
    )?;
    Ok(InternalMeeting {
        id: conn.last_insert_rowid(),
        meeting_type_id: m.meeting_type_id,
        organizer_id: m.organizer_id,
        room_id: m.room_id,
        topic: m.topic.clone(),
        start_time: m.start_time,
        end_time: m.end_time,
        notes: m.notes.clone(),
    })
}

pub fn get_meeting(conn: &Connection, id: i64) -> Result<Option<InternalMeeting>, DatabaseError> {
    let found = conn
        .query_row(
            &format!("SELECT {MEETING_COLUMNS} FROM internal_meetings WHERE id = ?1"),
            params![id],
            meeting_from_row,
        )
        .optional()?;
    Ok(found)
}

pub fn list_meetings(conn: &Connection) -> Result<Vec<InternalMeeting>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {MEETING_COLUMNS} FROM internal_meetings ORDER BY start_time"
    ))?;
    let rows = stmt
        .query_map([], meeting_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Meetings an employee organizes or participates in.
pub fn list_meetings_for_employee(
    conn: &Connection,
    employee_id: i64,
) -> Result<Vec<InternalMeeting>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {MEETING_COLUMNS} FROM internal_meetings
         WHERE organizer_id = ?1
            OR id IN (SELECT meeting_id FROM meeting_participants WHERE employee_id = ?1)
         ORDER BY start_time"
    ))?;
    let rows = stmt
        .query_map(params![employee_id], meeting_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn update_meeting(
    conn: &Connection,
    id: i64,
    m: &NewInternalMeeting,
) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        "UPDATE internal_meetings
         SET meeting_type_id = ?1, organizer_id = ?2, room_id = ?3, topic = ?4,
             start_time = ?5, end_time = ?6, notes = ?7
         WHERE id = ?8",
        params![
            m.meeting_type_id,
            m.organizer_id,
            m.room_id,
            m.topic,
            fmt_datetime(&m.start_time),
            fmt_datetime(&m.end_time),
            m.notes,
            id,
        ],
    )?;
    if updated == 0 {
        return Err(DatabaseError::not_found("InternalMeeting", id));
    }
    Ok(())
}

/// Delete a meeting; participants go with it (ON DELETE CASCADE).
pub fn delete_meeting(conn: &Connection, id: i64) -> Result<(), DatabaseError> {
    let deleted = conn.execute("DELETE FROM internal_meetings WHERE id = ?1", params![id])?;
    if deleted == 0 {
        return Err(DatabaseError::not_found("InternalMeeting", id));
    }
    Ok(())
}

/// First meeting held in `room_id` that intersects `[start, end)`.
pub fn find_overlapping_meeting_in_room(
    conn: &Connection,
    room_id: i64,
    start: NaiveDateTime,
    end: NaiveDateTime,
    exclude_id: Option<i64>,
) -> Result<Option<InternalMeeting>, DatabaseError> {
    let found = conn
        .query_row(
            &format!(
                "SELECT {MEETING_COLUMNS} FROM internal_meetings
                 WHERE room_id = ?1 AND start_time < ?3 AND end_time > ?2
                   AND (?4 IS NULL OR id <> ?4)
                 ORDER BY start_time LIMIT 1"
            ),
            params![room_id, fmt_datetime(&start), fmt_datetime(&end), exclude_id],
            meeting_from_row,
        )
        .optional()?;
    Ok(found)
}

// ── Participants ─────────────────────────────────────────

pub fn is_participant(
    conn: &Connection,
    meeting_id: i64,
    employee_id: i64,
) -> Result<bool, DatabaseError> {
    Ok(conn
        .query_row(
            "SELECT 1 FROM meeting_participants WHERE meeting_id = ?1 AND employee_id = ?2",
            params![meeting_id, employee_id],
            |_| Ok(()),
        )
        .optional()?
        .is_some())
}

pub fn add_participant(
    conn: &Connection,
    meeting_id: i64,
    employee_id: i64,
) -> Result<MeetingParticipant, DatabaseError> {
    conn.execute(
        "INSERT INTO meeting_participants (meeting_id, employee_id) VALUES (?1, ?2)",
        params![meeting_id, employee_id],
    )?;
    Ok(MeetingParticipant {
        meeting_id,
        employee_id,
    })
}

/// Returns false when the employee was not a participant.
pub fn remove_participant(
    conn: &Connection,
    meeting_id: i64,
    employee_id: i64,
) -> Result<bool, DatabaseError> {
    let deleted = conn.execute(
        "DELETE FROM meeting_participants WHERE meeting_id = ?1 AND employee_id = ?2",
        params![meeting_id, employee_id],
    )?;
    Ok(deleted > 0)
}

pub fn list_participants(
    conn: &Connection,
    meeting_id: i64,
) -> Result<Vec<MeetingParticipant>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT meeting_id, employee_id FROM meeting_participants
         WHERE meeting_id = ?1 ORDER BY employee_id",
    )?;
    let rows = stmt
        .query_map(params![meeting_id], |row| {
            Ok(MeetingParticipant {
                meeting_id: row.get(0)?,
                employee_id: row.get(1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::db::repository::{insert_employee, insert_named};
    use crate::db::sqlite::open_memory_database;

    fn at(hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 7, 1)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn employee(conn: &Connection, email: &str) -> i64 {
        insert_employee(
            conn,
            &NewEmployee {
                first_name: "Staff".into(),
                last_name: email.into(),
                email: email.into(),
                phone: None,
                hire_date: NaiveDate::from_ymd_opt(2022, 1, 1).unwrap(),
                role_id: 2,
            },
        )
        .unwrap()
        .id
    }

    fn meeting(conn: &Connection, organizer: i64) -> InternalMeeting {
        let mt: MeetingType = insert_named(conn, "Case review").unwrap();
        insert_meeting(
            conn,
            &NewInternalMeeting {
                meeting_type_id: mt.id,
                organizer_id: organizer,
                room_id: None,
                topic: "Weekly review".into(),
                start_time: at(14),
                end_time: at(15),
                notes: None,
            },
        )
        .unwrap()
    }

    #[test]
    fn participants_are_removed_with_meeting() {
        let conn = open_memory_database().unwrap();
        let organizer = employee(&conn, "org@clinic.test");
        let guest = employee(&conn, "guest@clinic.test");
        let m = meeting(&conn, organizer);

        add_participant(&conn, m.id, guest).unwrap();
        assert!(is_participant(&conn, m.id, guest).unwrap());
        assert!(add_participant(&conn, m.id, guest).is_err());

        delete_meeting(&conn, m.id).unwrap();
        let left: i64 = conn
            .query_row("SELECT COUNT(*) FROM meeting_participants", [], |row| row.get(0))
            .unwrap();
        assert_eq!(left, 0);
    }

    #[test]
    fn meetings_for_employee_cover_organizer_and_participant() {
        let conn = open_memory_database().unwrap();
        let organizer = employee(&conn, "org@clinic.test");
        let guest = employee(&conn, "guest@clinic.test");
        let outsider = employee(&conn, "out@clinic.test");
        let m = meeting(&conn, organizer);
        add_participant(&conn, m.id, guest).unwrap();

        assert_eq!(list_meetings_for_employee(&conn, organizer).unwrap().len(), 1);
        assert_eq!(list_meetings_for_employee(&conn, guest).unwrap().len(), 1);
        assert!(list_meetings_for_employee(&conn, outsider).unwrap().is_empty());
        assert_eq!(list_participants(&conn, m.id).unwrap().len(), 1);

        assert!(remove_participant(&conn, m.id, guest).unwrap());
        assert!(!remove_participant(&conn, m.id, guest).unwrap());
    }

    #[test]
    fn meeting_update_round_trip() {
        let conn = open_memory_database().unwrap();
        let organizer = employee(&conn, "org@clinic.test");
        let m = meeting(&conn, organizer);
        let changed = NewInternalMeeting {
            meeting_type_id: m.meeting_type_id,
            organizer_id: organizer,
            room_id: None,
            topic: "Moved review".into(),
            start_time: at(16),
            end_time: at(17),
            notes: Some("bring charts".into()),
        };
        update_meeting(&conn, m.id, &changed).unwrap();
        let loaded = get_meeting(&conn, m.id).unwrap().unwrap();
        assert_eq!(loaded.topic, "Moved review");
        assert_eq!(loaded.start_time, at(16));
        assert_eq!(list_meetings(&conn).unwrap().len(), 1);
    }
}
