pub mod authorization;
pub mod commands;
pub mod config;
pub mod core_state;
pub mod crypto;
pub mod db;
pub mod models;
pub mod services;

use tracing_subscriber::EnvFilter;

use config::Config;
use core_state::{CoreError, CoreState};
use services::ServiceError;

/// Open the configured database and create the first administrator when the
/// account table is still empty and credentials are configured.
pub fn init(config: &Config) -> Result<CoreState, CoreError> {
    let state = CoreState::open(config)?;

    state.with_db(|conn| {
        let tables = db::count_tables(conn)?;
        let accounts = db::count_accounts(conn)?;
        tracing::info!(path = %config.db_path.display(), tables, accounts, "Database ready");

        match (accounts, config.bootstrap_input()) {
            (0, Some(admin)) => {
                services::accounts::bootstrap_administrator(conn, &admin)?;
            }
            (0, None) => tracing::warn!(
                "No accounts exist; set CLINIC_ADMIN_USERNAME and CLINIC_ADMIN_PASSWORD to create one"
            ),
            _ => {}
        }
        Ok::<_, ServiceError>(())
    })?;

    Ok(state)
}

pub fn run() -> Result<(), CoreError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let config = Config::from_env();
    let state = init(&config)?;
    tracing::info!(
        timeout_secs = state.inactivity_timeout_secs,
        health = %commands::health_check(),
        "Backend ready"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_in(dir: &tempfile::TempDir, admin: Option<(&str, &str)>) -> Config {
        Config {
            db_path: dir.path().join("data").join("clinic.db"),
            session_timeout_secs: 60,
            bootstrap_admin: admin.map(|(u, p)| (u.to_string(), p.to_string())),
        }
    }

    #[test]
    fn init_bootstraps_admin_once() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir, Some(("root", "root-pass1")));

        let state = init(&config).unwrap();
        assert!(state.login("root", "root-pass1").is_ok());
        drop(state);

        // Reopening with the same settings keeps the single account
        let state = init(&config).unwrap();
        let count = state.with_db(|conn| Ok(db::count_accounts(conn)?)).unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn init_without_admin_leaves_accounts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let state = init(&config_in(&dir, None)).unwrap();
        let count = state.with_db(|conn| Ok(db::count_accounts(conn)?)).unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn weak_bootstrap_password_fails_init() {
        let dir = tempfile::tempdir().unwrap();
        let err = init(&config_in(&dir, Some(("root", "short")))).err().unwrap();
        assert!(matches!(err, CoreError::Service(ServiceError::Validation(_))));
    }
}
