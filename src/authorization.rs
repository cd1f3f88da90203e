//! Role-based permission table.
//!
//! Each built-in `role_id` maps to a fixed set of CRUD actions per entity.
//! Lookups are default-deny: roles created at runtime, or ids that do not
//! match a built-in role, are granted nothing.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ═══════════════════════════════════════════════════════════
// Types
// ═══════════════════════════════════════════════════════════

/// Built-in roles. Discriminants are the seeded `roles.id` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Administrator = 1,
    Doctor = 2,
    Nurse = 3,
    Receptionist = 4,
}

impl Role {
    pub const ALL: [Role; 4] = [
        Role::Administrator,
        Role::Doctor,
        Role::Nurse,
        Role::Receptionist,
    ];

    pub fn from_id(id: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.id() == id)
    }

    pub fn id(self) -> i64 {
        self as i64
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Administrator => "administrator",
            Self::Doctor => "doctor",
            Self::Nurse => "nurse",
            Self::Receptionist => "receptionist",
        }
    }

    /// Whether this role sees every patient rather than only linked ones.
    pub fn sees_all_patients(self) -> bool {
        matches!(self, Self::Administrator | Self::Receptionist)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Entity {
    Patient,
    Assignment,
    Employee,
    UserAccount,
    Role,
    Service,
    Specialty,
    RoomType,
    Room,
    RoomReservation,
    Appointment,
    Diagnosis,
    Prescription,
    MeetingType,
    InternalMeeting,
}

impl Entity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Patient => "patient",
            Self::Assignment => "patient assignment",
            Self::Employee => "employee",
            Self::UserAccount => "user account",
            Self::Role => "role",
            Self::Service => "service",
            Self::Specialty => "specialty",
            Self::RoomType => "room type",
            Self::Room => "room",
            Self::RoomReservation => "room reservation",
            Self::Appointment => "appointment",
            Self::Diagnosis => "diagnosis",
            Self::Prescription => "prescription",
            Self::MeetingType => "meeting type",
            Self::InternalMeeting => "internal meeting",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    Create,
    Read,
    Update,
    Delete,
}

impl Action {
    fn letter(self) -> char {
        match self {
            Self::Create => 'C',
            Self::Read => 'R',
            Self::Update => 'U',
            Self::Delete => 'D',
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

/// The logged-in user on whose behalf an operation runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub session_id: Uuid,
    pub account_id: i64,
    pub employee_id: i64,
    pub username: String,
    pub role_id: i64,
    pub started_at: NaiveDateTime,
}

impl Session {
    pub fn role(&self) -> Option<Role> {
        Role::from_id(self.role_id)
    }

    pub fn is_administrator(&self) -> bool {
        self.role() == Some(Role::Administrator)
    }
}

// ═══════════════════════════════════════════════════════════
// Error type
// ═══════════════════════════════════════════════════════════

#[derive(Debug, thiserror::Error)]
pub enum AuthorizationError {
    #[error("Role {role} is not permitted to {} {} records", .action.as_str(), .entity.as_str())]
    Forbidden {
        role: &'static str,
        entity: Entity,
        action: Action,
    },
    #[error("Role id {0} has no permissions")]
    UnknownRole(i64),
}

// ═══════════════════════════════════════════════════════════
// Permission table
// ═══════════════════════════════════════════════════════════

/// Actions granted to `role` on `entity`, as a subset of "CRUD".
fn grants(role: Role, entity: Entity) -> &'static str {
    use Entity as E;
    use Role::*;

    match (entity, role) {
        (E::Patient, Administrator) => "CRUD",
        (E::Patient, Doctor) => "RU",
        (E::Patient, Nurse) => "R",
        (E::Patient, Receptionist) => "CRU",

        (E::Assignment, Administrator | Receptionist) => "CRUD",
        (E::Assignment, Doctor | Nurse) => "R",

        (
            E::Employee
            | E::Service
            | E::Specialty
            | E::RoomType
            | E::Room
            | E::MeetingType
            | E::Role,
            Administrator,
        ) => "CRUD",
        (
            E::Employee
            | E::Service
            | E::Specialty
            | E::RoomType
            | E::Room
            | E::MeetingType
            | E::Role,
            _,
        ) => "R",

        (E::UserAccount, Administrator) => "CRUD",
        (E::UserAccount, _) => "",

        (E::RoomReservation, Administrator | Receptionist) => "CRUD",
        (E::RoomReservation, Doctor) => "CR",
        (E::RoomReservation, Nurse) => "R",

        (E::Appointment, Administrator | Receptionist) => "CRUD",
        (E::Appointment, Doctor) => "RU",
        (E::Appointment, Nurse) => "R",

        (E::Diagnosis | E::Prescription, Administrator) => "RD",
        (E::Diagnosis | E::Prescription, Doctor) => "CRUD",
        (E::Diagnosis | E::Prescription, Nurse) => "R",
        (E::Diagnosis | E::Prescription, Receptionist) => "",

        (E::InternalMeeting, Administrator) => "CRUD",
        (E::InternalMeeting, Doctor) => "CRU",
        (E::InternalMeeting, Nurse | Receptionist) => "R",
    }
}

pub fn is_allowed(role: Role, entity: Entity, action: Action) -> bool {
    grants(role, entity).contains(action.letter())
}

/// Fail unless the session's role may perform `action` on `entity`.
pub fn require(session: &Session, entity: Entity, action: Action) -> Result<Role, AuthorizationError> {
    let role = session
        .role()
        .ok_or(AuthorizationError::UnknownRole(session.role_id))?;
    if !is_allowed(role, entity, action) {
        tracing::warn!(
            user = %session.username,
            role = role.as_str(),
            entity = entity.as_str(),
            action = action.as_str(),
            "Permission denied"
        );
        return Err(AuthorizationError::Forbidden {
            role: role.as_str(),
            entity,
            action,
        });
    }
    Ok(role)
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════
