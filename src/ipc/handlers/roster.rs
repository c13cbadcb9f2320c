use crate::error::{PortalError, PortalResult};
use crate::ipc::error::respond;
use crate::ipc::params::{get_optional_str, get_required_id, read_upload};
use crate::ipc::types::{AppState, Request};
use crate::roster::{self, NewMember, Roster};
use crate::storage::{allowed_extension, remove_best_effort, FileStore};
use serde_json::json;

const PICTURE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp"];

fn required_field(params: &serde_json::Value, key: &str) -> PortalResult<String> {
    get_optional_str(params, key)
        .map(str::to_string)
        .ok_or_else(|| PortalError::validation(format!("Please fill all required fields ({key})")))
}

fn parse_age(params: &serde_json::Value) -> PortalResult<i64> {
    let Some(v) = params.get("age") else {
        return Err(PortalError::validation("Please fill all required fields (age)"));
    };
    let age = v
        .as_i64()
        .or_else(|| v.as_str().and_then(|s| s.trim().parse::<i64>().ok()))
        .ok_or_else(|| PortalError::validation("age must be a whole number"))?;
    if age < 0 {
        return Err(PortalError::validation("age must not be negative"));
    }
    Ok(age)
}

fn handle_list(kind: Roster, state: &mut AppState, _req: &Request) -> PortalResult<serde_json::Value> {
    let owner = state.session.current_account_id()?;
    let members = roster::list(&state.workspace()?.conn, kind, owner)?;
    let rows: Vec<_> = members.iter().map(|m| m.to_json(kind)).collect();
    let mut result = json!({});
    result[kind.table()] = json!(rows);
    Ok(result)
}

fn handle_create(kind: Roster, state: &mut AppState, req: &Request) -> PortalResult<serde_json::Value> {
    let owner = state.session.current_account_id()?;
    let ws = state.workspace()?;
    let p = &req.params;

    let mut member = NewMember {
        name: required_field(p, "name")?,
        age: parse_age(p)?,
        contact: required_field(p, "contact")?,
        detail: required_field(p, kind.detail_key())?,
        email: get_optional_str(p, "email").map(str::to_string),
        profile_pic: None,
    };

    if let Some((bytes, name)) = read_upload(p, "profilePicPath")? {
        if allowed_extension(&name, PICTURE_EXTENSIONS).is_none() {
            return Err(PortalError::validation("profile picture must be an image"));
        }
        member.profile_pic = Some(ws.uploads.store(&bytes, &name)?);
    }

    match roster::append(&ws.conn, kind, &member, owner) {
        Ok((id, position)) => Ok(json!({ "success": true, "id": id, "position": position })),
        Err(e) => {
            if let Some(pic) = member.profile_pic.as_deref() {
                remove_best_effort(&ws.uploads, pic);
            }
            Err(e)
        }
    }
}

fn handle_reorder(kind: Roster, state: &mut AppState, req: &Request) -> PortalResult<serde_json::Value> {
    let owner = state.session.current_account_id()?;
    let ids = roster::parse_ordered_ids(req.params.get("orderedIdList"))?;
    roster::reorder(&state.workspace()?.conn, kind, &ids, owner)?;
    Ok(json!({ "success": true }))
}

fn handle_delete(kind: Roster, state: &mut AppState, req: &Request) -> PortalResult<serde_json::Value> {
    let owner = state.session.current_account_id()?;
    let id = get_required_id(&req.params, "id")?;
    let ws = state.workspace()?;
    roster::delete(&ws.conn, &ws.uploads, kind, id, owner)?;
    Ok(json!({ "success": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let (kind, action) = match req.method.split_once('.') {
        Some(("students", action)) => (Roster::Student, action),
        Some(("teachers", action)) => (Roster::Teacher, action),
        _ => return None,
    };
    let outcome = match action {
        "list" => handle_list(kind, state, req),
        "create" => handle_create(kind, state, req),
        "reorder" => handle_reorder(kind, state, req),
        "delete" => handle_delete(kind, state, req),
        _ => return None,
    };
    Some(respond(&req.id, &req.method, outcome))
}
