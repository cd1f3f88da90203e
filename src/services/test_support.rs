//! Fixtures shared by service tests.

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::Connection;
use uuid::Uuid;

use crate::authorization::{Role, Session};
use crate::db::repository::{insert_account, insert_employee, insert_patient, now_timestamp};
use crate::db::sqlite::open_memory_database;
use crate::models::enums::Gender;
use crate::models::*;

pub fn db() -> Connection {
    open_memory_database().unwrap()
}

pub fn at(day: u32, hour: u32, min: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 9, day)
        .unwrap()
        .and_hms_opt(hour, min, 0)
        .unwrap()
}

pub fn new_employee(email: &str, role: Role) -> NewEmployee {
    NewEmployee {
        first_name: "Test".into(),
        last_name: role.as_str().into(),
        email: email.into(),
        phone: None,
        hire_date: NaiveDate::from_ymd_opt(2020, 2, 1).unwrap(),
        role_id: role.id(),
    }
}

/// Create an employee with an account in `role` and return a session for them.
pub fn session_for(conn: &Connection, role: Role) -> Session {
    let n: i64 = conn
        .query_row("SELECT COUNT(*) FROM employees", [], |row| row.get(0))
        .unwrap();
    let username = format!("{}{}", role.as_str(), n + 1);
    let emp = insert_employee(conn, &new_employee(&format!("{username}@clinic.test"), role)).unwrap();
    let acc = insert_account(conn, emp.id, &username, "unused", "unused", role.id(), now_timestamp())
        .unwrap();
    Session {
        session_id: Uuid::new_v4(),
        account_id: acc.id,
        employee_id: emp.id,
        username,
        role_id: role.id(),
        started_at: now_timestamp(),
    }
}

pub fn new_patient(national_id: &str) -> NewPatient {
    NewPatient {
        first_name: "Anna".into(),
        last_name: format!("Patient{national_id}"),
        birth_date: NaiveDate::from_ymd_opt(1988, 8, 8).unwrap(),
        gender: Gender::Female,
        national_id: national_id.into(),
        phone: None,
        email: None,
        address: None,
    }
}

pub fn patient(conn: &Connection, national_id: &str) -> Patient {
    insert_patient(conn, &new_patient(national_id), now_timestamp()).unwrap()
}
