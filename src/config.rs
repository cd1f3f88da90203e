use std::path::PathBuf;

use crate::services::accounts::BootstrapAdmin;

/// Application-level constants
pub const APP_NAME: &str = "ClinicManager";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default inactivity timeout: 15 minutes.
pub const DEFAULT_SESSION_TIMEOUT_SECS: u64 = 900;

/// Log filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "info,clinic_lib=debug"
}

/// Application data directory, `<data dir>/ClinicManager`.
/// Falls back to the working directory when the platform has no data dir.
pub fn app_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

pub fn default_db_path() -> PathBuf {
    app_data_dir().join("clinic.db")
}

/// Runtime settings read from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub session_timeout_secs: u64,
    /// Username/password for the first administrator, used only while the
    /// account table is empty.
    pub bootstrap_admin: Option<(String, String)>,
}

impl Config {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let db_path = get("CLINIC_DB_PATH")
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(default_db_path);
        let session_timeout_secs = get("CLINIC_SESSION_TIMEOUT_SECS")
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(DEFAULT_SESSION_TIMEOUT_SECS);
        let bootstrap_admin = match (get("CLINIC_ADMIN_USERNAME"), get("CLINIC_ADMIN_PASSWORD")) {
            (Some(user), Some(password)) if !user.trim().is_empty() => Some((user, password)),
            _ => None,
        };

        Self {
            db_path,
            session_timeout_secs,
            bootstrap_admin,
        }
    }

    /// Bootstrap input for the configured administrator, if any.
    pub fn bootstrap_input(&self) -> Option<BootstrapAdmin> {
        self.bootstrap_admin.as_ref().map(|(username, password)| BootstrapAdmin {
            first_name: "System".into(),
            last_name: "Administrator".into(),
            email: format!("{}@clinic.local", username.trim()),
            username: username.clone(),
            password: password.clone(),
        })
    }
}
