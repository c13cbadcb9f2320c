use crate::error::{PortalError, PortalResult};
use crate::games::{self, GameUpload};
use crate::ipc::error::respond;
use crate::ipc::params::{get_optional_str, get_required_id, get_required_str, read_upload};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_list(state: &mut AppState, _req: &Request) -> PortalResult<serde_json::Value> {
    state.session.current_account_id()?;
    let games = games::list(&state.workspace()?.conn)?;
    Ok(json!({ "games": games }))
}

fn handle_upload(state: &mut AppState, req: &Request) -> PortalResult<serde_json::Value> {
    let owner = state.session.current_account_id()?;
    let ws = state.workspace()?;
    let p = &req.params;

    let Some((bytes, file_name)) = read_upload(p, "sourcePath")? else {
        return Err(PortalError::validation("missing sourcePath"));
    };
    let upload = GameUpload {
        title: get_required_str(p, "title")?,
        description: get_required_str(p, "description")?,
        game_type: get_optional_str(p, "gameType"),
        requirements: get_optional_str(p, "requirements"),
        instructions: get_required_str(p, "instructions")?,
        file_name: &file_name,
        bytes: &bytes,
    };
    let game_id = games::upload(&ws.conn, &ws.games, owner, &upload)?;
    Ok(json!({ "success": true, "gameId": game_id }))
}

fn handle_download(state: &mut AppState, req: &Request) -> PortalResult<serde_json::Value> {
    state.session.current_account_id()?;
    let game_id = get_required_id(&req.params, "gameId")?;
    let ws = state.workspace()?;
    let dl = games::download(&ws.conn, &ws.games, game_id)?;
    Ok(json!({
        "path": dl.path.to_string_lossy(),
        "filename": dl.filename,
        "downloads": dl.downloads,
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let outcome = match req.method.as_str() {
        "games.list" => handle_list(state, req),
        "games.upload" => handle_upload(state, req),
        "games.download" => handle_download(state, req),
        _ => return None,
    };
    Some(respond(&req.id, &req.method, outcome))
}
