//! Login, user accounts and roles.

use std::sync::LazyLock;

use regex::Regex;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ensure_active_employee, ensure_exists, lookup, required, ServiceError};
use crate::authorization::{self, require, Action, Entity, Session};
use crate::crypto::{hash_password, verify_password, PasswordHash};
use crate::db::repository::{self as repo, ROLE_REFERENCES};
use crate::models::*;

pub const MIN_PASSWORD_LENGTH: usize = 8;

static USERNAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9._-]{3,64}$").unwrap());

/// Verified against when the username does not exist.
static UNKNOWN_USER_HASH: LazyLock<PasswordHash> =
    LazyLock::new(|| hash_password("unknown-user-placeholder"));

/// First administrator, created on an empty database.
#[derive(Clone, Serialize, Deserialize)]
pub struct BootstrapAdmin {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub username: String,
    pub password: String,
}

fn check_password_policy(password: &str) -> Result<(), ServiceError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ServiceError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    let has_letter = password.chars().any(char::is_alphabetic);
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    if !has_letter || !has_digit {
        return Err(ServiceError::Validation(
            "Password must contain letters and digits".into(),
        ));
    }
    Ok(())
}

fn check_username(conn: &Connection, username: &str) -> Result<String, ServiceError> {
    let username = required("Username", username)?;
    if !USERNAME_PATTERN.is_match(&username) {
        return Err(ServiceError::Validation(
            "Username must be 3-64 characters of letters, digits, '.', '_' or '-'".into(),
        ));
    }
    if repo::find_account_by_username(conn, &username)?.is_some() {
        return Err(ServiceError::Duplicate {
            entity: "user account",
            field: "username",
            value: username,
        });
    }
    Ok(username)
}

// ── Login ────────────────────────────────────────────────

/// Verify credentials and open a session.
///
/// Unknown usernames and wrong passwords produce the same error.
pub fn login(conn: &Connection, username: &str, password: &str) -> Result<Session, ServiceError> {
    let Some(creds) = repo::get_credentials(conn, username.trim())? else {
        // same key-derivation cost as a known user
        let _ = verify_password(password, &UNKNOWN_USER_HASH.hash, &UNKNOWN_USER_HASH.salt);
        tracing::warn!(username = %username.trim(), "Login failed: unknown user");
        return Err(ServiceError::InvalidCredentials);
    };
    if !verify_password(password, &creds.password_hash, &creds.password_salt)? {
        tracing::warn!(username = %creds.account.username, "Login failed: wrong password");
        return Err(ServiceError::InvalidCredentials);
    }
    let employee_active = repo::get_employee(conn, creds.account.employee_id)?
        .map(|e| e.is_active)
        .unwrap_or(false);
    if !creds.account.is_active || !employee_active {
        tracing::warn!(username = %creds.account.username, "Login refused: account disabled");
        return Err(ServiceError::AccountDisabled);
    }

    let now = repo::now_timestamp();
    repo::record_login(conn, creds.account.id, now)?;
    tracing::info!(username = %creds.account.username, role_id = creds.account.role_id, "User logged in");

    Ok(Session {
        session_id: Uuid::new_v4(),
        account_id: creds.account.id,
        employee_id: creds.account.employee_id,
        username: creds.account.username,
        role_id: creds.account.role_id,
        started_at: now,
    })
}

/// Create the first administrator (employee + account). Refused once any
/// account exists.
pub fn bootstrap_administrator(
    conn: &Connection,
    input: &BootstrapAdmin,
) -> Result<UserAccount, ServiceError> {
    if repo::count_accounts(conn)? > 0 {
        return Err(ServiceError::Validation(
            "Bootstrap is only possible on an empty account table".into(),
        ));
    }
    check_password_policy(&input.password)?;
    let username = check_username(conn, &input.username)?;
    let employee = NewEmployee {
        first_name: required("First name", &input.first_name)?,
        last_name: required("Last name", &input.last_name)?,
        email: super::email("Email", &input.email)?,
        phone: None,
        hire_date: repo::now_timestamp().date(),
        role_id: authorization::Role::Administrator.id(),
    };
    if repo::find_employee_by_email(conn, &employee.email)?.is_some() {
        return Err(ServiceError::Duplicate {
            entity: "employee",
            field: "email",
            value: employee.email,
        });
    }

    let stored = hash_password(&input.password);
    let tx = conn.unchecked_transaction()?;
    let emp = repo::insert_employee(&tx, &employee)?;
    let account = repo::insert_account(
        &tx,
        emp.id,
        &username,
        &stored.hash,
        &stored.salt,
        authorization::Role::Administrator.id(),
        repo::now_timestamp(),
    )?;
    tx.commit()?;

    tracing::info!(username = %account.username, "Administrator account bootstrapped");
    Ok(account)
}

// ── Accounts ─────────────────────────────────────────────

pub fn create_account(
    conn: &Connection,
    session: &Session,
    input: &NewUserAccount,
) -> Result<UserAccount, ServiceError> {
    require(session, Entity::UserAccount, Action::Create)?;
    check_password_policy(&input.password)?;

    let employee = ensure_active_employee(conn, input.employee_id)?;
    if repo::find_account_by_employee(conn, employee.id)?.is_some() {
        return Err(ServiceError::Duplicate {
            entity: "user account",
            field: "employee_id",
            value: employee.id.to_string(),
        });
    }
    ensure_exists(conn, "roles", "role", input.role_id)?;
    let username = check_username(conn, &input.username)?;

    let stored = hash_password(&input.password);
    let account = repo::insert_account(
        conn,
        employee.id,
        &username,
        &stored.hash,
        &stored.salt,
        input.role_id,
        repo::now_timestamp(),
    )?;
    tracing::info!(by = %session.username, username = %account.username, "Account created");
    Ok(account)
}

pub fn get_account(conn: &Connection, session: &Session, id: i64) -> Result<UserAccount, ServiceError> {
    if id != session.account_id {
        require(session, Entity::UserAccount, Action::Read)?;
    }
    repo::get_account(conn, id)?.ok_or_else(|| ServiceError::not_found("UserAccount", id))
}

pub fn list_accounts(conn: &Connection, session: &Session) -> Result<Vec<UserAccount>, ServiceError> {
    require(session, Entity::UserAccount, Action::Read)?;
    Ok(repo::list_accounts(conn)?)
}

pub fn update_account_role(
    conn: &Connection,
    session: &Session,
    id: i64,
    role_id: i64,
) -> Result<(), ServiceError> {
    require(session, Entity::UserAccount, Action::Update)?;
    if id == session.account_id {
        return Err(ServiceError::Validation("You cannot change your own role".into()));
    }
    ensure_exists(conn, "roles", "role", role_id)?;
    repo::update_account_role(conn, id, role_id)?;
    tracing::info!(by = %session.username, account_id = id, role_id, "Account role changed");
    Ok(())
}

pub fn set_account_active(
    conn: &Connection,
    session: &Session,
    id: i64,
    active: bool,
) -> Result<(), ServiceError> {
    require(session, Entity::UserAccount, Action::Update)?;
    if id == session.account_id && !active {
        return Err(ServiceError::Validation("You cannot disable your own account".into()));
    }
    repo::set_account_active(conn, id, active)?;
    tracing::info!(by = %session.username, account_id = id, active, "Account active flag changed");
    Ok(())
}

/// Change a password. Users changing their own password must supply the
/// current one; administrators may reset any other account.
pub fn change_password(
    conn: &Connection,
    session: &Session,
    account_id: i64,
    current_password: Option<&str>,
    new_password: &str,
) -> Result<(), ServiceError> {
    let creds = repo::get_credentials_by_id(conn, account_id)?
        .ok_or_else(|| ServiceError::not_found("UserAccount", account_id))?;

    if account_id == session.account_id {
        let current = current_password.ok_or_else(|| {
            ServiceError::Validation("Current password is required".into())
        })?;
        if !verify_password(current, &creds.password_hash, &creds.password_salt)? {
            return Err(ServiceError::InvalidCredentials);
        }
    } else {
        require(session, Entity::UserAccount, Action::Update)?;
    }
    check_password_policy(new_password)?;

    let stored = hash_password(new_password);
    repo::update_password(conn, account_id, &stored.hash, &stored.salt)?;
    tracing::info!(by = %session.username, account_id, "Password changed");
    Ok(())
}

pub fn delete_account(conn: &Connection, session: &Session, id: i64) -> Result<(), ServiceError> {
    require(session, Entity::UserAccount, Action::Delete)?;
    if id == session.account_id {
        return Err(ServiceError::Validation("You cannot delete your own account".into()));
    }
    repo::delete_account(conn, id)?;
    tracing::info!(by = %session.username, account_id = id, "Account deleted");
    Ok(())
}

// ── Roles ────────────────────────────────────────────────

pub fn list_roles(conn: &Connection, session: &Session) -> Result<Vec<Role>, ServiceError> {
    require(session, Entity::Role, Action::Read)?;
    Ok(repo::list_named(conn)?)
}

pub fn create_role(conn: &Connection, session: &Session, name: &str) -> Result<Role, ServiceError> {
    require(session, Entity::Role, Action::Create)?;
    let role: Role = lookup::create(conn, "role", name)?;
    tracing::info!(by = %session.username, role = %role.name, "Role created");
    Ok(role)
}

pub fn rename_role(
    conn: &Connection,
    session: &Session,
    id: i64,
    name: &str,
) -> Result<(), ServiceError> {
    require(session, Entity::Role, Action::Update)?;
    lookup::rename::<Role>(conn, "role", id, name)
}

/// Seeded roles back the permission table and are never deleted.
pub fn delete_role(conn: &Connection, session: &Session, id: i64) -> Result<(), ServiceError> {
    require(session, Entity::Role, Action::Delete)?;
    if authorization::Role::from_id(id).is_some() {
        return Err(ServiceError::Validation("Built-in roles cannot be deleted".into()));
    }
    lookup::delete::<Role>(conn, "role", ROLE_REFERENCES, id)?;
    tracing::info!(by = %session.username, role_id = id, "Role deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authorization::Role as BuiltinRole;
    use crate::services::test_support::*;

    fn admin_input() -> BootstrapAdmin {
        BootstrapAdmin {
            first_name: "Ada".into(),
            last_name: "Admin".into(),
            email: "ada@clinic.test".into(),
            username: "ada".into(),
            password: "s3cure-pass".into(),
        }
    }

    #[test]
    fn bootstrap_then_login() {
        let conn = db();
        let account = bootstrap_administrator(&conn, &admin_input()).unwrap();
        assert_eq!(account.role_id, 1);

        let session = login(&conn, "ADA", "s3cure-pass").unwrap();
        assert_eq!(session.account_id, account.id);
        assert!(session.is_administrator());
        assert!(repo::get_account(&conn, account.id).unwrap().unwrap().last_login_at.is_some());

        // second bootstrap refused
        assert!(matches!(
            bootstrap_administrator(&conn, &admin_input()),
            Err(ServiceError::Validation(_))
        ));
    }

    #[test]
    fn wrong_password_and_unknown_user_look_the_same() {
        let conn = db();
        bootstrap_administrator(&conn, &admin_input()).unwrap();
        let a = login(&conn, "ada", "nope-1234").unwrap_err();
        let b = login(&conn, "ghost", "s3cure-pass").unwrap_err();
        assert_eq!(a.to_string(), b.to_string());
    }

    #[test]
    fn unknown_user_pays_full_derivation() {
        // a malformed placeholder would short-circuit before PBKDF2
        let h = &*UNKNOWN_USER_HASH;
        assert!(!verify_password("s3cure-pass", &h.hash, &h.salt).unwrap());
        assert!(verify_password("unknown-user-placeholder", &h.hash, &h.salt).unwrap());

        let conn = db();
        assert!(matches!(
            login(&conn, "ghost", "s3cure-pass"),
            Err(ServiceError::InvalidCredentials)
        ));
    }

    #[test]
    fn disabled_account_cannot_log_in() {
        let conn = db();
        let admin = session_for(&conn, BuiltinRole::Administrator);
        let emp = repo::insert_employee(&conn, &new_employee("doc@clinic.test", BuiltinRole::Doctor)).unwrap();
        let acc = create_account(
            &conn,
            &admin,
            &NewUserAccount {
                employee_id: emp.id,
                username: "doc".into(),
                password: "doctor123".into(),
                role_id: 2,
            },
        )
        .unwrap();
        assert!(login(&conn, "doc", "doctor123").is_ok());

        set_account_active(&conn, &admin, acc.id, false).unwrap();
        assert!(matches!(login(&conn, "doc", "doctor123"), Err(ServiceError::AccountDisabled)));
    }

    #[test]
    fn create_account_validations() {
        let conn = db();
        let admin = session_for(&conn, BuiltinRole::Administrator);
        let emp = repo::insert_employee(&conn, &new_employee("n@clinic.test", BuiltinRole::Nurse)).unwrap();
        let input = |username: &str, password: &str, employee_id| NewUserAccount {
            employee_id,
            username: username.into(),
            password: password.into(),
            role_id: 3,
        };

        assert!(matches!(
            create_account(&conn, &admin, &input("nurse", "short1", emp.id)),
            Err(ServiceError::Validation(_))
        ));
        assert!(matches!(
            create_account(&conn, &admin, &input("nurse", "longenough1", 999)),
            Err(ServiceError::MissingReference { .. })
        ));
        assert!(matches!(
            create_account(&conn, &admin, &input(&admin.username.to_uppercase(), "longenough1", emp.id)),
            Err(ServiceError::Duplicate { field: "username", .. })
        ));
        create_account(&conn, &admin, &input("nurse", "longenough1", emp.id)).unwrap();
        assert!(matches!(
            create_account(&conn, &admin, &input("nurse2", "longenough1", emp.id)),
            Err(ServiceError::Duplicate { field: "employee_id", .. })
        ));
    }

    #[test]
    fn non_admin_cannot_manage_accounts() {
        let conn = db();
        let doctor = session_for(&conn, BuiltinRole::Doctor);
        assert!(matches!(list_accounts(&conn, &doctor), Err(ServiceError::Authorization(_))));
        // but can read their own account
        assert_eq!(get_account(&conn, &doctor, doctor.account_id).unwrap().id, doctor.account_id);
    }

    #[test]
    fn own_password_change_needs_current_password() {
        let conn = db();
        bootstrap_administrator(&conn, &admin_input()).unwrap();
        let session = login(&conn, "ada", "s3cure-pass").unwrap();

        assert!(matches!(
            change_password(&conn, &session, session.account_id, None, "n3w-password"),
            Err(ServiceError::Validation(_))
        ));
        assert!(matches!(
            change_password(&conn, &session, session.account_id, Some("wrong"), "n3w-password"),
            Err(ServiceError::InvalidCredentials)
        ));
        change_password(&conn, &session, session.account_id, Some("s3cure-pass"), "n3w-password")
            .unwrap();
        assert!(login(&conn, "ada", "n3w-password").is_ok());
    }

    #[test]
    fn admin_cannot_lock_themselves_out() {
        let conn = db();
        let admin = session_for(&conn, BuiltinRole::Administrator);
        assert!(set_account_active(&conn, &admin, admin.account_id, false).is_err());
        assert!(delete_account(&conn, &admin, admin.account_id).is_err());
        assert!(update_account_role(&conn, &admin, admin.account_id, 2).is_err());
    }

    #[test]
    fn role_lifecycle() {
        let conn = db();
        let admin = session_for(&conn, BuiltinRole::Administrator);
        let intern = create_role(&conn, &admin, "Intern").unwrap();
        assert!(matches!(
            create_role(&conn, &admin, "intern"),
            Err(ServiceError::Duplicate { .. })
        ));
        rename_role(&conn, &admin, intern.id, "Resident").unwrap();
        assert!(rename_role(&conn, &admin, intern.id, "Doctor").is_err());
        assert!(delete_role(&conn, &admin, 2).is_err());

        let emp = repo::insert_employee(
            &conn,
            &NewEmployee {
                role_id: intern.id,
                ..new_employee("res@clinic.test", BuiltinRole::Doctor)
            },
        )
        .unwrap();
        assert!(matches!(
            delete_role(&conn, &admin, intern.id),
            Err(ServiceError::InUse { .. })
        ));
        repo::delete_employee(&conn, emp.id).unwrap();
        delete_role(&conn, &admin, intern.id).unwrap();
        assert_eq!(list_roles(&conn, &admin).unwrap().len(), 4);
    }
}
