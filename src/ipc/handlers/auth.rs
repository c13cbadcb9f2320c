use crate::accounts::{self, SignUp};
use crate::error::PortalResult;
use crate::ipc::error::respond;
use crate::ipc::params::get_required_str;
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_sign_up(state: &mut AppState, req: &Request) -> PortalResult<serde_json::Value> {
    let form = SignUp {
        email: get_required_str(&req.params, "email")?,
        first_name: get_required_str(&req.params, "firstName")?,
        password1: get_required_str(&req.params, "password1")?,
        password2: get_required_str(&req.params, "password2")?,
    };
    let account = accounts::sign_up(&state.workspace()?.conn, &form)?;
    state.session.log_in(account.clone());
    Ok(json!({ "success": true, "account": account }))
}

fn handle_login(state: &mut AppState, req: &Request) -> PortalResult<serde_json::Value> {
    let email = get_required_str(&req.params, "email")?;
    let password = get_required_str(&req.params, "password")?;
    let account = accounts::log_in(&state.workspace()?.conn, email, password)?;
    state.session.log_in(account.clone());
    Ok(json!({ "success": true, "account": account }))
}

fn handle_logout(state: &mut AppState, _req: &Request) -> PortalResult<serde_json::Value> {
    state.session.log_out()?;
    Ok(json!({ "success": true }))
}

fn handle_me(state: &mut AppState, _req: &Request) -> PortalResult<serde_json::Value> {
    let account = state.session.current()?;
    Ok(json!({ "account": account }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let outcome = match req.method.as_str() {
        "auth.signUp" => handle_sign_up(state, req),
        "auth.login" => handle_login(state, req),
        "auth.logout" => handle_logout(state, req),
        "auth.me" => handle_me(state, req),
        _ => return None,
    };
    Some(respond(&req.id, &req.method, outcome))
}
