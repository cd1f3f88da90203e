//! Account and role administration commands.

use super::as_user;
use crate::core_state::CoreState;
use crate::models::{NewUserAccount, Role, UserAccount};
use crate::services::accounts;

pub fn create_account(input: NewUserAccount, state: &CoreState) -> Result<UserAccount, String> {
    as_user(state, "create_account", |conn, s| accounts::create_account(conn, s, &input))
}

pub fn get_account(id: i64, state: &CoreState) -> Result<UserAccount, String> {
    as_user(state, "get_account", |conn, s| accounts::get_account(conn, s, id))
}

pub fn list_accounts(state: &CoreState) -> Result<Vec<UserAccount>, String> {
    as_user(state, "list_accounts", accounts::list_accounts)
}

pub fn update_account_role(id: i64, role_id: i64, state: &CoreState) -> Result<(), String> {
    as_user(state, "update_account_role", |conn, s| {
        accounts::update_account_role(conn, s, id, role_id)
    })
}

pub fn set_account_active(id: i64, active: bool, state: &CoreState) -> Result<(), String> {
    as_user(state, "set_account_active", |conn, s| {
        accounts::set_account_active(conn, s, id, active)
    })
}

/// Administrative password reset for another account.
pub fn reset_password(id: i64, new_password: String, state: &CoreState) -> Result<(), String> {
    as_user(state, "reset_password", |conn, s| {
        accounts::change_password(conn, s, id, None, &new_password)
    })
}

pub fn delete_account(id: i64, state: &CoreState) -> Result<(), String> {
    as_user(state, "delete_account", |conn, s| accounts::delete_account(conn, s, id))
}

pub fn list_roles(state: &CoreState) -> Result<Vec<Role>, String> {
    as_user(state, "list_roles", accounts::list_roles)
}

pub fn create_role(name: String, state: &CoreState) -> Result<Role, String> {
    as_user(state, "create_role", |conn, s| accounts::create_role(conn, s, &name))
}

pub fn rename_role(id: i64, name: String, state: &CoreState) -> Result<(), String> {
    as_user(state, "rename_role", |conn, s| accounts::rename_role(conn, s, id, &name))
}

pub fn delete_role(id: i64, state: &CoreState) -> Result<(), String> {
    as_user(state, "delete_role", |conn, s| accounts::delete_role(conn, s, id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::admin_state;

    #[test]
    fn admin_cannot_delete_self() {
        let state = admin_state();
        let me = state.current_session().unwrap().account_id;
        assert!(delete_account(me, &state).is_err());
        assert_eq!(list_accounts(&state).unwrap().len(), 1);
    }

    #[test]
    fn builtin_roles_listed_and_protected() {
        let state = admin_state();
        assert!(list_roles(&state).unwrap().len() >= 4);
        assert!(delete_role(1, &state).is_err());

        let role = create_role("Pharmacist".into(), &state).unwrap();
        rename_role(role.id, "Chief Pharmacist".into(), &state).unwrap();
        delete_role(role.id, &state).unwrap();
    }
}
