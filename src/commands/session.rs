//! Login, logout and the current user.

use serde::{Deserialize, Serialize};

use super::report;
use crate::authorization::Session;
use crate::core_state::CoreState;
use crate::models::UserAccount;
use crate::services::accounts::{self, BootstrapAdmin};

/// What the UI needs to know about the logged-in user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionInfo {
    pub username: String,
    pub employee_id: i64,
    pub role_id: i64,
    pub role: Option<String>,
}

impl From<&Session> for SessionInfo {
    fn from(s: &Session) -> Self {
        Self {
            username: s.username.clone(),
            employee_id: s.employee_id,
            role_id: s.role_id,
            role: s.role().map(|r| r.as_str().to_string()),
        }
    }
}

pub fn login(username: String, password: String, state: &CoreState) -> Result<SessionInfo, String> {
    let session = state
        .login(&username, &password)
        .map_err(|e| report("login", e))?;
    Ok(SessionInfo::from(&session))
}

pub fn logout(state: &CoreState) {
    state.logout();
}

/// The logged-in user, or `None` when logged out or expired.
pub fn current_user(state: &CoreState) -> Option<SessionInfo> {
    state.current_session().ok().map(|s| SessionInfo::from(&s))
}

/// Whether the inactivity timeout has passed (for UI polling).
pub fn check_inactivity(state: &CoreState) -> bool {
    state.check_timeout()
}

pub fn update_activity(state: &CoreState) {
    state.update_activity();
}

/// Create the first administrator on an empty database.
pub fn bootstrap_administrator(input: BootstrapAdmin, state: &CoreState) -> Result<UserAccount, String> {
    state
        .with_db(|conn| accounts::bootstrap_administrator(conn, &input))
        .map_err(|e| report("bootstrap_administrator", e))
}

/// Change the logged-in user's own password.
pub fn change_own_password(
    current_password: String,
    new_password: String,
    state: &CoreState,
) -> Result<(), String> {
    super::as_user(state, "change_own_password", |conn, s| {
        accounts::change_password(conn, s, s.account_id, Some(&current_password), &new_password)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::admin_state;

    #[test]
    fn login_reports_role() {
        let state = admin_state();
        logout(&state);
        assert!(current_user(&state).is_none());

        let info = login("admin".into(), "admin-pass1".into(), &state).unwrap();
        assert_eq!(info.role.as_deref(), Some("administrator"));
        assert_eq!(current_user(&state).unwrap().username, "admin");
    }

    #[test]
    fn bad_login_message() {
        let state = admin_state();
        let err = login("admin".into(), "nope".into(), &state).unwrap_err();
        assert_eq!(err, "Invalid username or password");
    }

    #[test]
    fn own_password_change() {
        let state = admin_state();
        change_own_password("admin-pass1".into(), "fresh-pass2".into(), &state).unwrap();
        logout(&state);
        assert!(login("admin".into(), "fresh-pass2".into(), &state).is_ok());
    }

    #[test]
    fn bootstrap_twice_fails() {
        let state = admin_state();
        let again = BootstrapAdmin {
            first_name: "B".into(),
            last_name: "B".into(),
            email: "b@clinic.test".into(),
            username: "bob".into(),
            password: "bob-pass12".into(),
        };
        assert!(bootstrap_administrator(again, &state).is_err());
    }
}
