//! Employees, billable services and specialties.

use super::as_user;
use crate::core_state::CoreState;
use crate::models::{Employee, NewEmployee, NewService, Service, Specialty};
use crate::services::staff;

// ── Employees ───────────────────────────────────────────────

pub fn create_employee(input: NewEmployee, state: &CoreState) -> Result<Employee, String> {
    as_user(state, "create_employee", |conn, s| staff::create_employee(conn, s, &input))
}

pub fn get_employee(id: i64, state: &CoreState) -> Result<Employee, String> {
    as_user(state, "get_employee", |conn, s| staff::get_employee(conn, s, id))
}

pub fn list_employees(active_only: bool, state: &CoreState) -> Result<Vec<Employee>, String> {
    as_user(state, "list_employees", |conn, s| staff::list_employees(conn, s, active_only))
}

pub fn update_employee(id: i64, input: NewEmployee, state: &CoreState) -> Result<(), String> {
    as_user(state, "update_employee", |conn, s| staff::update_employee(conn, s, id, &input))
}

pub fn set_employee_active(id: i64, active: bool, state: &CoreState) -> Result<(), String> {
    as_user(state, "set_employee_active", |conn, s| {
        staff::set_employee_active(conn, s, id, active)
    })
}

pub fn delete_employee(id: i64, state: &CoreState) -> Result<(), String> {
    as_user(state, "delete_employee", |conn, s| staff::delete_employee(conn, s, id))
}

// ── Services ────────────────────────────────────────────────

pub fn create_service(input: NewService, state: &CoreState) -> Result<Service, String> {
    as_user(state, "create_service", |conn, s| staff::create_service(conn, s, &input))
}

pub fn get_service(id: i64, state: &CoreState) -> Result<Service, String> {
    as_user(state, "get_service", |conn, s| staff::get_service(conn, s, id))
}

pub fn list_services(state: &CoreState) -> Result<Vec<Service>, String> {
    as_user(state, "list_services", staff::list_services)
}

pub fn update_service(id: i64, input: NewService, state: &CoreState) -> Result<(), String> {
    as_user(state, "update_service", |conn, s| staff::update_service(conn, s, id, &input))
}

pub fn delete_service(id: i64, state: &CoreState) -> Result<(), String> {
    as_user(state, "delete_service", |conn, s| staff::delete_service(conn, s, id))
}

pub fn link_service(employee_id: i64, service_id: i64, state: &CoreState) -> Result<(), String> {
    as_user(state, "link_service", |conn, s| {
        staff::link_service(conn, s, employee_id, service_id)
    })
}

pub fn unlink_service(employee_id: i64, service_id: i64, state: &CoreState) -> Result<(), String> {
    as_user(state, "unlink_service", |conn, s| {
        staff::unlink_service(conn, s, employee_id, service_id)
    })
}

pub fn services_of_employee(employee_id: i64, state: &CoreState) -> Result<Vec<Service>, String> {
    as_user(state, "services_of_employee", |conn, s| {
        staff::services_of_employee(conn, s, employee_id)
    })
}

// ── Specialties ─────────────────────────────────────────────

pub fn create_specialty(name: String, state: &CoreState) -> Result<Specialty, String> {
    as_user(state, "create_specialty", |conn, s| staff::create_specialty(conn, s, &name))
}

pub fn list_specialties(state: &CoreState) -> Result<Vec<Specialty>, String> {
    as_user(state, "list_specialties", staff::list_specialties)
}

pub fn rename_specialty(id: i64, name: String, state: &CoreState) -> Result<(), String> {
    as_user(state, "rename_specialty", |conn, s| staff::rename_specialty(conn, s, id, &name))
}

pub fn delete_specialty(id: i64, state: &CoreState) -> Result<(), String> {
    as_user(state, "delete_specialty", |conn, s| staff::delete_specialty(conn, s, id))
}

pub fn link_specialty(employee_id: i64, specialty_id: i64, state: &CoreState) -> Result<(), String> {
    as_user(state, "link_specialty", |conn, s| {
        staff::link_specialty(conn, s, employee_id, specialty_id)
    })
}

pub fn unlink_specialty(employee_id: i64, specialty_id: i64, state: &CoreState) -> Result<(), String> {
    as_user(state, "unlink_specialty", |conn, s| {
        staff::unlink_specialty(conn, s, employee_id, specialty_id)
    })
}

pub fn specialties_of_employee(employee_id: i64, state: &CoreState) -> Result<Vec<Specialty>, String> {
    as_user(state, "specialties_of_employee", |conn, s| {
        staff::specialties_of_employee(conn, s, employee_id)
    })
}
