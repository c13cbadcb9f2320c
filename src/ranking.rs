//! Flappy Bird score keeping.
//!
//! Every submitted round is kept as an immutable event; the leaderboard and
//! the daily figures are aggregated at read time.

use crate::db::{format_ts, start_of_day};
use crate::error::{PortalError, PortalResult};
use crate::ownership::AccountId;
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::Serialize;

pub const MAX_PLAYER_NAME_LEN: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreEvent {
    pub id: i64,
    pub player_name: String,
    pub score: i64,
    pub owner_id: AccountId,
    pub achieved_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyStats {
    pub players_today: i64,
    pub games_played: i64,
    pub total_players: i64,
    pub total_games: i64,
}

/// Checks a raw `score` value from the wire.
pub fn parse_score(raw: Option<&serde_json::Value>) -> PortalResult<i64> {
    let Some(v) = raw else {
        return Err(PortalError::validation("missing score"));
    };
    match v.as_i64() {
        Some(n) if n >= 0 => Ok(n),
        Some(_) => Err(PortalError::validation("score must not be negative")),
        None => Err(PortalError::validation("score must be a whole number")),
    }
}

/// Trims a player name and checks its length.
pub fn normalize_player_name(raw: &str) -> PortalResult<String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(PortalError::validation("player name must not be empty"));
    }
    if name.chars().count() > MAX_PLAYER_NAME_LEN {
        return Err(PortalError::validation(format!(
            "player name must be at most {MAX_PLAYER_NAME_LEN} characters"
        )));
    }
    Ok(name.to_string())
}

pub fn record_score(
    conn: &Connection,
    player_name: &str,
    score: i64,
    owner: AccountId,
) -> PortalResult<i64> {
    record_score_at(conn, player_name, score, owner, Utc::now())
}

/// Appends one score event. Low and zero scores are kept for the statistics.
pub fn record_score_at(
    conn: &Connection,
    player_name: &str,
    score: i64,
    owner: AccountId,
    achieved_at: DateTime<Utc>,
) -> PortalResult<i64> {
    if score < 0 {
        return Err(PortalError::validation("score must not be negative"));
    }
    let player_name = normalize_player_name(player_name)?;
    conn.execute(
        "INSERT INTO flappy_scores(player_name, score, user_id, achieved_at) VALUES(?, ?, ?, ?)",
        (&player_name, score, owner, format_ts(achieved_at)),
    )?;
    let id = conn.last_insert_rowid();
    tracing::info!(score_id = id, player = %player_name, score, owner, "score recorded");
    Ok(id)
}

/// Best score per player, highest first.
///
/// A player's representative event is the earliest one reaching their best
/// score; players with equal bests are ranked by who got there first.
pub fn compute_leaderboard(conn: &Connection, limit: usize) -> PortalResult<Vec<ScoreEvent>> {
    let mut stmt = conn.prepare(
        "SELECT id, player_name, score, user_id, achieved_at
         FROM (
           SELECT id, player_name, score, user_id, achieved_at,
                  ROW_NUMBER() OVER (
                    PARTITION BY player_name
                    ORDER BY score DESC, achieved_at ASC, id ASC
                  ) AS rn
           FROM flappy_scores
         )
         WHERE rn = 1
         ORDER BY score DESC, achieved_at ASC, id ASC
         LIMIT ?",
    )?;
    let rows = stmt
        .query_map([i64::try_from(limit).unwrap_or(i64::MAX)], |r| {
            Ok(ScoreEvent {
                id: r.get(0)?,
                player_name: r.get(1)?,
                score: r.get(2)?,
                owner_id: r.get(3)?,
                achieved_at: r.get(4)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn compute_daily_stats(
    conn: &Connection,
    reference: DateTime<Utc>,
) -> PortalResult<DailyStats> {
    let since = format_ts(start_of_day(reference));
    let (players_today, games_played): (i64, i64) = conn.query_row(
        "SELECT COUNT(DISTINCT player_name), COUNT(*)
         FROM flappy_scores
         WHERE achieved_at >= ?",
        [&since],
        |r| Ok((r.get(0)?, r.get(1)?)),
    )?;
    let (total_players, total_games): (i64, i64) = conn.query_row(
        "SELECT COUNT(DISTINCT player_name), COUNT(*) FROM flappy_scores",
        [],
        |r| Ok((r.get(0)?, r.get(1)?)),
    )?;
    Ok(DailyStats {
        players_today,
        games_played,
        total_players,
        total_games,
    })
}
