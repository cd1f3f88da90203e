//! UI-facing command layer.
//!
//! Each command takes plain arguments plus the shared `CoreState` and
//! returns `Result<T, String>`, so a front end can bind them without knowing
//! the error types. Failures are logged here and surfaced as messages.

pub mod accounts;
pub mod clinical;
pub mod facilities;
pub mod meetings;
pub mod patients;
pub mod session;
pub mod staff;

use rusqlite::Connection;

use crate::authorization::Session;
use crate::core_state::{CoreError, CoreState};
use crate::services::ServiceError;

/// Health check command, verifies the backend is running.
pub fn health_check() -> String {
    tracing::debug!("Health check called");
    "ok".to_string()
}

fn report(command: &'static str, err: CoreError) -> String {
    match &err {
        CoreError::Service(ServiceError::Database(_))
        | CoreError::Database(_)
        | CoreError::LockPoisoned => {
            tracing::error!(command, error = %err, "Command failed");
        }
        _ => tracing::warn!(command, error = %err, "Command rejected"),
    }
    err.to_string()
}

/// Run a service call for the logged-in user.
pub(crate) fn as_user<T>(
    state: &CoreState,
    command: &'static str,
    f: impl FnOnce(&Connection, &Session) -> Result<T, ServiceError>,
) -> Result<T, String> {
    state.with_session(f).map_err(|e| report(command, e))
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::core_state::CoreState;
    use crate::services::accounts::{self, BootstrapAdmin};

    /// State with an administrator `admin` / `admin-pass1`, logged in.
    pub fn admin_state() -> CoreState {
        let state = CoreState::in_memory().unwrap();
        state
            .with_db(|conn| {
                accounts::bootstrap_administrator(
                    conn,
                    &BootstrapAdmin {
                        first_name: "Ada".into(),
                        last_name: "Admin".into(),
                        email: "admin@clinic.test".into(),
                        username: "admin".into(),
                        password: "admin-pass1".into(),
                    },
                )
            })
            .unwrap();
        state.login("admin", "admin-pass1").unwrap();
        state
    }
}
