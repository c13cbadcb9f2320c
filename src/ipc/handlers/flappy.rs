use crate::error::{PortalError, PortalResult};
use crate::ipc::error::respond;
use crate::ipc::params::{get_optional_str, get_optional_usize};
use crate::ipc::types::{AppState, Request};
use crate::ranking;
use chrono::Utc;
use serde_json::json;

fn handle_submit_score(state: &mut AppState, req: &Request) -> PortalResult<serde_json::Value> {
    let account = state.session.current()?;
    let score = ranking::parse_score(req.params.get("score"))?;
    let player_name = get_optional_str(&req.params, "playerName").unwrap_or(account.first_name.as_str());
    ranking::record_score(&state.workspace()?.conn, player_name, score, account.id)?;
    Ok(json!({ "success": true }))
}

fn handle_leaderboard(state: &mut AppState, req: &Request) -> PortalResult<serde_json::Value> {
    let max = state.config.max_leaderboard_limit;
    let limit = get_optional_usize(&req.params, "limit")?.unwrap_or(state.config.leaderboard_limit);
    if limit == 0 || limit > max {
        return Err(PortalError::validation(format!(
            "limit must be between 1 and {max}"
        )));
    }

    let conn = &state.workspace()?.conn;
    let board = ranking::compute_leaderboard(conn, limit)?;
    let stats = ranking::compute_daily_stats(conn, Utc::now())?;
    tracing::debug!(entries = board.len(), total_players = stats.total_players, "leaderboard loaded");

    let leaderboard: Vec<_> = board
        .iter()
        .map(|e| {
            json!({
                "playerName": e.player_name,
                "score": e.score,
                "achievedDate": e.achieved_at,
            })
        })
        .collect();
    Ok(json!({
        "leaderboard": leaderboard,
        "stats": stats,
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let outcome = match req.method.as_str() {
        "flappy.submitScore" => handle_submit_score(state, req),
        "flappy.leaderboard" => handle_leaderboard(state, req),
        _ => return None,
    };
    Some(respond(&req.id, &req.method, outcome))
}
