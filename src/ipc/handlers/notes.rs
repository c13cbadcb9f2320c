use crate::error::PortalResult;
use crate::ipc::error::respond;
use crate::ipc::params::{get_optional_str, get_required_bool, get_required_id, read_upload};
use crate::ipc::types::{AppState, Request};
use crate::notes::{self, Attachment};
use serde_json::json;

fn handle_list(state: &mut AppState, _req: &Request) -> PortalResult<serde_json::Value> {
    let owner = state.session.current_account_id()?;
    let notes = notes::list_own(&state.workspace()?.conn, owner)?;
    Ok(json!({ "notes": notes }))
}

fn handle_shared(state: &mut AppState, _req: &Request) -> PortalResult<serde_json::Value> {
    state.session.current_account_id()?;
    let notes = notes::list_shared(&state.workspace()?.conn)?;
    Ok(json!({ "notes": notes }))
}

fn handle_create(state: &mut AppState, req: &Request) -> PortalResult<serde_json::Value> {
    let owner = state.session.current_account_id()?;
    let ws = state.workspace()?;
    let data = get_optional_str(&req.params, "data");
    let subject = get_optional_str(&req.params, "subject");

    let source = read_upload(&req.params, "attachmentPath")?;
    let attachment = source.as_ref().map(|(bytes, name)| Attachment {
        bytes,
        name: name.as_str(),
    });

    let note_id = notes::create(&ws.conn, &ws.uploads, owner, data, subject, attachment)?;
    Ok(json!({ "success": true, "noteId": note_id }))
}

fn handle_toggle_share(state: &mut AppState, req: &Request) -> PortalResult<serde_json::Value> {
    let owner = state.session.current_account_id()?;
    let note_id = get_required_id(&req.params, "noteId")?;
    let public = get_required_bool(&req.params, "public")?;
    notes::set_public(&state.workspace()?.conn, note_id, public, owner)?;
    Ok(json!({ "success": true }))
}

fn handle_delete(state: &mut AppState, req: &Request) -> PortalResult<serde_json::Value> {
    let owner = state.session.current_account_id()?;
    let note_id = get_required_id(&req.params, "noteId")?;
    let ws = state.workspace()?;
    notes::delete(&ws.conn, &ws.uploads, note_id, owner)?;
    Ok(json!({ "success": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let outcome = match req.method.as_str() {
        "notes.list" => handle_list(state, req),
        "notes.shared" => handle_shared(state, req),
        "notes.create" => handle_create(state, req),
        "notes.toggleShare" => handle_toggle_share(state, req),
        "notes.delete" => handle_delete(state, req),
        _ => return None,
    };
    Some(respond(&req.id, &req.method, outcome))
}
