use crate::error::{PortalError, PortalResult};
use crate::ipc::error::respond;
use crate::ipc::params::get_required_str;
use crate::ipc::types::{AppState, Request, Workspace};
use serde_json::json;
use std::path::PathBuf;

fn handle_health(state: &mut AppState, _req: &Request) -> PortalResult<serde_json::Value> {
    Ok(json!({
        "version": env!("CARGO_PKG_VERSION"),
        "workspacePath": state.workspace.as_ref().map(|w| w.path.to_string_lossy().to_string()),
        "authenticated": state.session.is_authenticated(),
    }))
}

fn handle_workspace_select(state: &mut AppState, req: &Request) -> PortalResult<serde_json::Value> {
    let path = PathBuf::from(get_required_str(&req.params, "path")?);
    let workspace = Workspace::open(&path).map_err(PortalError::Storage)?;

    // Accounts live in the workspace database; a session cannot carry over.
    state.session.clear();
    state.workspace = Some(workspace);
    tracing::info!(workspace = %path.to_string_lossy(), "workspace opened");
    Ok(json!({ "workspacePath": path.to_string_lossy() }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let outcome = match req.method.as_str() {
        "health" => handle_health(state, req),
        "workspace.select" => handle_workspace_select(state, req),
        _ => return None,
    };
    Some(respond(&req.id, &req.method, outcome))
}
