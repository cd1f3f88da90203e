//! Employees, the services they offer and their specialties.

use rusqlite::Connection;

use super::{
    email, ensure_exists, ensure_unreferenced, lookup, optional, optional_phone, required,
    ServiceError,
};
use crate::authorization::{require, Action, Entity, Session};
use crate::db::repository::{
    self as repo, EMPLOYEE_REFERENCES, SERVICE_REFERENCES, SPECIALTY_REFERENCES,
};
use crate::models::*;

// ── Employees ────────────────────────────────────────────

fn validated_employee(conn: &Connection, input: &NewEmployee) -> Result<NewEmployee, ServiceError> {
    ensure_exists(conn, "roles", "role", input.role_id)?;
    Ok(NewEmployee {
        first_name: required("First name", &input.first_name)?,
        last_name: required("Last name", &input.last_name)?,
        email: email("Email", &input.email)?,
        phone: optional_phone("Phone", input.phone.as_deref())?,
        hire_date: input.hire_date,
        role_id: input.role_id,
    })
}

fn ensure_email_free(conn: &Connection, email: &str, except: Option<i64>) -> Result<(), ServiceError> {
    match repo::find_employee_by_email(conn, email)? {
        Some(existing) if Some(existing.id) != except => Err(ServiceError::Duplicate {
            entity: "employee",
            field: "email",
            value: email.to_string(),
        }),
        _ => Ok(()),
    }
}

fn existing_employee(conn: &Connection, id: i64) -> Result<Employee, ServiceError> {
    repo::get_employee(conn, id)?.ok_or_else(|| ServiceError::not_found("Employee", id))
}

pub fn create_employee(
    conn: &Connection,
    session: &Session,
    input: &NewEmployee,
) -> Result<Employee, ServiceError> {
    require(session, Entity::Employee, Action::Create)?;
    let input = validated_employee(conn, input)?;
    ensure_email_free(conn, &input.email, None)?;

    let employee = repo::insert_employee(conn, &input)?;
    tracing::info!(by = %session.username, employee_id = employee.id, "Employee created");
    Ok(employee)
}

pub fn get_employee(conn: &Connection, session: &Session, id: i64) -> Result<Employee, ServiceError> {
    require(session, Entity::Employee, Action::Read)?;
    existing_employee(conn, id)
}

pub fn list_employees(
    conn: &Connection,
    session: &Session,
    active_only: bool,
) -> Result<Vec<Employee>, ServiceError> {
    require(session, Entity::Employee, Action::Read)?;
    Ok(repo::list_employees(conn, active_only)?)
}

pub fn update_employee(
    conn: &Connection,
    session: &Session,
    id: i64,
    input: &NewEmployee,
) -> Result<(), ServiceError> {
    require(session, Entity::Employee, Action::Update)?;
    existing_employee(conn, id)?;
    let input = validated_employee(conn, input)?;
    ensure_email_free(conn, &input.email, Some(id))?;

    repo::update_employee(conn, id, &input)?;
    tracing::info!(by = %session.username, employee_id = id, "Employee updated");
    Ok(())
}

/// Deactivated employees keep their history but cannot log in or take new
/// assignments and bookings.
pub fn set_employee_active(
    conn: &Connection,
    session: &Session,
    id: i64,
    active: bool,
) -> Result<(), ServiceError> {
    require(session, Entity::Employee, Action::Update)?;
    if id == session.employee_id && !active {
        return Err(ServiceError::Validation("You cannot deactivate yourself".into()));
    }
    repo::set_employee_active(conn, id, active)?;
    tracing::info!(by = %session.username, employee_id = id, active, "Employee active flag changed");
    Ok(())
}

pub fn delete_employee(conn: &Connection, session: &Session, id: i64) -> Result<(), ServiceError> {
    require(session, Entity::Employee, Action::Delete)?;
    existing_employee(conn, id)?;
    ensure_unreferenced(conn, EMPLOYEE_REFERENCES, "employee", id)?;
    repo::delete_employee(conn, id)?;
    tracing::info!(by = %session.username, employee_id = id, "Employee deleted");
    Ok(())
}

// ── Services ─────────────────────────────────────────────

fn validated_service(conn: &Connection, input: &NewService, except: Option<i64>) -> Result<NewService, ServiceError> {
    let name = required("Service name", &input.name)?;
    if input.price_cents < 0 {
        return Err(ServiceError::Validation("Price cannot be negative".into()));
    }
    if let Some(existing) = repo::find_service_by_name(conn, &name)? {
        if Some(existing.id) != except {
            return Err(ServiceError::Duplicate {
                entity: "service",
                field: "name",
                value: name,
            });
        }
    }
    Ok(NewService {
        name,
        description: optional(input.description.as_deref()),
        price_cents: input.price_cents,
    })
}

pub fn create_service(
    conn: &Connection,
    session: &Session,
    input: &NewService,
) -> Result<Service, ServiceError> {
    require(session, Entity::Service, Action::Create)?;
    let input = validated_service(conn, input, None)?;
    let service = repo::insert_service(conn, &input)?;
    tracing::info!(by = %session.username, service = %service.name, "Service created");
    Ok(service)
}

pub fn get_service(conn: &Connection, session: &Session, id: i64) -> Result<Service, ServiceError> {
    require(session, Entity::Service, Action::Read)?;
    repo::get_service(conn, id)?.ok_or_else(|| ServiceError::not_found("Service", id))
}

pub fn list_services(conn: &Connection, session: &Session) -> Result<Vec<Service>, ServiceError> {
    require(session, Entity::Service, Action::Read)?;
    Ok(repo::list_services(conn)?)
}

pub fn update_service(
    conn: &Connection,
    session: &Session,
    id: i64,
    input: &NewService,
) -> Result<(), ServiceError> {
    require(session, Entity::Service, Action::Update)?;
    let input = validated_service(conn, input, Some(id))?;
    repo::update_service(conn, id, &input)?;
    Ok(())
}

pub fn delete_service(conn: &Connection, session: &Session, id: i64) -> Result<(), ServiceError> {
    require(session, Entity::Service, Action::Delete)?;
    if repo::get_service(conn, id)?.is_none() {
        return Err(ServiceError::not_found("Service", id));
    }
    ensure_unreferenced(conn, SERVICE_REFERENCES, "service", id)?;
    repo::delete_service(conn, id)?;
    tracing::info!(by = %session.username, service_id = id, "Service deleted");
    Ok(())
}

// ── Specialties ──────────────────────────────────────────

pub fn create_specialty(conn: &Connection, session: &Session, name: &str) -> Result<Specialty, ServiceError> {
    require(session, Entity::Specialty, Action::Create)?;
    lookup::create(conn, "specialty", name)
}

pub fn list_specialties(conn: &Connection, session: &Session) -> Result<Vec<Specialty>, ServiceError> {
    require(session, Entity::Specialty, Action::Read)?;
    Ok(repo::list_named(conn)?)
}

pub fn rename_specialty(
    conn: &Connection,
    session: &Session,
    id: i64,
    name: &str,
) -> Result<(), ServiceError> {
    require(session, Entity::Specialty, Action::Update)?;
    lookup::rename::<Specialty>(conn, "specialty", id, name)
}

pub fn delete_specialty(conn: &Connection, session: &Session, id: i64) -> Result<(), ServiceError> {
    require(session, Entity::Specialty, Action::Delete)?;
    lookup::delete::<Specialty>(conn, "specialty", SPECIALTY_REFERENCES, id)
}

// ── Links ────────────────────────────────────────────────

pub fn link_service(
    conn: &Connection,
    session: &Session,
    employee_id: i64,
    service_id: i64,
) -> Result<(), ServiceError> {
    require(session, Entity::Employee, Action::Update)?;
    ensure_exists(conn, "employees", "employee", employee_id)?;
    ensure_exists(conn, "services", "service", service_id)?;
    if repo::employee_has_service(conn, employee_id, service_id)? {
        return Err(ServiceError::Duplicate {
            entity: "employee service",
            field: "service_id",
            value: service_id.to_string(),
        });
    }
    repo::link_employee_service(conn, employee_id, service_id)?;
    tracing::info!(by = %session.username, employee_id, service_id, "Service linked");
    Ok(())
}

pub fn unlink_service(
    conn: &Connection,
    session: &Session,
    employee_id: i64,
    service_id: i64,
) -> Result<(), ServiceError> {
    require(session, Entity::Employee, Action::Update)?;
    if !repo::unlink_employee_service(conn, employee_id, service_id)? {
        return Err(ServiceError::NotFound {
            entity: "EmployeeService".into(),
            id: format!("{employee_id}/{service_id}"),
        });
    }
    Ok(())
}

pub fn services_of_employee(
    conn: &Connection,
    session: &Session,
    employee_id: i64,
) -> Result<Vec<Service>, ServiceError> {
    require(session, Entity::Service, Action::Read)?;
    existing_employee(conn, employee_id)?;
    Ok(repo::list_services_of_employee(conn, employee_id)?)
}

pub fn link_specialty(
    conn: &Connection,
    session: &Session,
    employee_id: i64,
    specialty_id: i64,
) -> Result<(), ServiceError> {
    require(session, Entity::Employee, Action::Update)?;
    ensure_exists(conn, "employees", "employee", employee_id)?;
    ensure_exists(conn, "specialties", "specialty", specialty_id)?;
    if repo::employee_has_specialty(conn, employee_id, specialty_id)? {
        return Err(ServiceError::Duplicate {
            entity: "employee specialty",
            field: "specialty_id",
            value: specialty_id.to_string(),
        });
    }
    repo::link_employee_specialty(conn, employee_id, specialty_id)?;
    tracing::info!(by = %session.username, employee_id, specialty_id, "Specialty linked");
    Ok(())
}

pub fn unlink_specialty(
    conn: &Connection,
    session: &Session,
    employee_id: i64,
    specialty_id: i64,
) -> Result<(), ServiceError> {
    require(session, Entity::Employee, Action::Update)?;
    if !repo::unlink_employee_specialty(conn, employee_id, specialty_id)? {
        return Err(ServiceError::NotFound {
            entity: "EmployeeSpecialty".into(),
            id: format!("{employee_id}/{specialty_id}"),
        });
    }
    Ok(())
}

pub fn specialties_of_employee(
    conn: &Connection,
    session: &Session,
    employee_id: i64,
) -> Result<Vec<Specialty>, ServiceError> {
    require(session, Entity::Specialty, Action::Read)?;
    existing_employee(conn, employee_id)?;
    Ok(repo::list_specialties_of_employee(conn, employee_id)?)
}
