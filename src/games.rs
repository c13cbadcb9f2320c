use crate::db::now_ts;
use crate::error::{PortalError, PortalResult};
use crate::ownership::AccountId;
use crate::storage::{allowed_extension, remove_best_effort, FileStore};
use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::io::Cursor;
use std::path::PathBuf;

pub const GAME_EXTENSIONS: &[&str] = &["py", "html", "js", "zip"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Game {
    pub id: i64,
    pub owner_id: AccountId,
    pub uploader: String,
    pub title: String,
    pub description: String,
    pub filename: String,
    pub original_name: String,
    pub file_type: String,
    pub requirements: Option<String>,
    pub instructions: String,
    pub sha256: String,
    pub downloads: i64,
    pub date_uploaded: String,
}

#[derive(Debug, Clone)]
pub struct GameUpload<'a> {
    pub title: &'a str,
    pub description: &'a str,
    pub game_type: Option<&'a str>,
    pub requirements: Option<&'a str>,
    pub instructions: &'a str,
    pub file_name: &'a str,
    pub bytes: &'a [u8],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub path: PathBuf,
    pub filename: String,
    pub downloads: i64,
}

const GAME_SELECT: &str = "SELECT g.id, g.user_id, u.first_name, g.title, g.description, g.filename,
            g.original_name, g.file_type, g.requirements, g.instructions, g.sha256,
            g.downloads, g.date_uploaded
     FROM games g
     JOIN users u ON u.id = g.user_id";

fn game_from_row(r: &rusqlite::Row<'_>) -> rusqlite::Result<Game> {
    Ok(Game {
        id: r.get(0)?,
        owner_id: r.get(1)?,
        uploader: r.get(2)?,
        title: r.get(3)?,
        description: r.get(4)?,
        filename: r.get(5)?,
        original_name: r.get(6)?,
        file_type: r.get(7)?,
        requirements: r.get(8)?,
        instructions: r.get(9)?,
        sha256: r.get(10)?,
        downloads: r.get(11)?,
        date_uploaded: r.get(12)?,
    })
}

fn required<'a>(value: &'a str, field: &str) -> PortalResult<&'a str> {
    let v = value.trim();
    if v.is_empty() {
        return Err(PortalError::validation(format!(
            "Please fill all required fields ({field})"
        )));
    }
    Ok(v)
}

/// `web` games run in the browser; everything else is downloaded and run locally.
fn resolve_game_type(requested: Option<&str>, ext: &str) -> PortalResult<&'static str> {
    match requested.map(str::trim).filter(|s| !s.is_empty()) {
        Some("web") => Ok("web"),
        Some("desktop") => Ok("desktop"),
        Some(other) => Err(PortalError::validation(format!(
            "unknown game type: {other}"
        ))),
        None if matches!(ext, "html" | "js") => Ok("web"),
        None => Ok("desktop"),
    }
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

pub fn upload(
    conn: &Connection,
    files: &dyn FileStore,
    owner: AccountId,
    game: &GameUpload<'_>,
) -> PortalResult<i64> {
    let title = required(game.title, "title")?;
    let description = required(game.description, "description")?;
    let instructions = required(game.instructions, "instructions")?;
    let Some(ext) = allowed_extension(game.file_name, GAME_EXTENSIONS) else {
        return Err(PortalError::validation(
            "Invalid file type. Please upload .py, .html, .js, or .zip files.",
        ));
    };
    if ext == "zip" {
        zip::ZipArchive::new(Cursor::new(game.bytes))
            .map_err(|e| PortalError::validation(format!("zip upload is not a readable archive: {e}")))?;
    }
    let file_type = resolve_game_type(game.game_type, &ext)?;
    let requirements = game
        .requirements
        .map(str::trim)
        .filter(|s| !s.is_empty());
    let checksum = sha256_hex(game.bytes);

    let stored = files.store(game.bytes, game.file_name)?;
    let inserted = conn.execute(
        "INSERT INTO games(user_id, title, description, filename, original_name, file_type,
                           requirements, instructions, sha256, downloads, date_uploaded)
         VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?, 0, ?)",
        rusqlite::params![
            owner,
            title,
            description,
            stored,
            game.file_name,
            file_type,
            requirements,
            instructions,
            checksum,
            now_ts()
        ],
    );
    if let Err(e) = inserted {
        remove_best_effort(files, &stored);
        return Err(e.into());
    }
    let id = conn.last_insert_rowid();
    tracing::info!(game = id, owner, file_type, "game uploaded");
    Ok(id)
}

pub fn find(conn: &Connection, id: i64) -> PortalResult<Option<Game>> {
    let game = conn
        .query_row(&format!("{GAME_SELECT} WHERE g.id = ?"), [id], game_from_row)
        .optional()?;
    Ok(game)
}

pub fn list(conn: &Connection) -> PortalResult<Vec<Game>> {
    let mut stmt = conn.prepare(&format!(
        "{GAME_SELECT} ORDER BY g.date_uploaded DESC, g.id DESC"
    ))?;
    let rows = stmt
        .query_map([], game_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Bumps the download counter and hands back where the file lives.
pub fn download(conn: &Connection, files: &dyn FileStore, id: i64) -> PortalResult<Download> {
    let Some(game) = find(conn, id)? else {
        return Err(PortalError::not_found("game not found"));
    };
    let path = files.path(&game.filename);
    if !path.is_file() {
        return Err(PortalError::not_found("game file missing"));
    }
    conn.execute(
        "UPDATE games SET downloads = downloads + 1 WHERE id = ?",
        [id],
    )?;
    let downloads: i64 =
        conn.query_row("SELECT downloads FROM games WHERE id = ?", [id], |r| r.get(0))?;
    tracing::info!(game = id, downloads, "game downloaded");
    Ok(Download {
        path,
        filename: game.original_name,
        downloads,
    })
}
