use chrono::{DateTime, NaiveTime, SecondsFormat, Utc};
use rusqlite::Connection;
use std::path::Path;

pub const DB_FILE_NAME: &str = "classroom.sqlite3";

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join(DB_FILE_NAME);
    let conn = Connection::open(db_path)?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> anyhow::Result<()> {
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS users(
            id INTEGER PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            first_name TEXT NOT NULL,
            created_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS notes(
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            data TEXT NOT NULL,
            file_name TEXT,
            subject TEXT NOT NULL DEFAULT 'General',
            public INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            FOREIGN KEY(user_id) REFERENCES users(id) ON DELETE CASCADE
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_notes_user ON notes(user_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_notes_public ON notes(public)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS students(
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            age INTEGER NOT NULL,
            contact TEXT NOT NULL,
            class_section TEXT NOT NULL,
            email TEXT,
            profile_pic TEXT,
            date_added TEXT NOT NULL,
            position INTEGER NOT NULL DEFAULT 0,
            FOREIGN KEY(user_id) REFERENCES users(id) ON DELETE CASCADE
        )",
        [],
    )?;
    conn.execute(
        "CREATE TABLE IF NOT EXISTS teachers(
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            age INTEGER NOT NULL,
            contact TEXT NOT NULL,
            subject TEXT NOT NULL,
            email TEXT,
            profile_pic TEXT,
            date_added TEXT NOT NULL,
            position INTEGER NOT NULL DEFAULT 0,
            FOREIGN KEY(user_id) REFERENCES users(id) ON DELETE CASCADE
        )",
        [],
    )?;

    // Rosters created before drag-reorder existed have no position column.
    for table in ["students", "teachers"] {
        ensure_position_column(conn, table)?;
        conn.execute(
            &format!(
                "CREATE INDEX IF NOT EXISTS idx_{table}_user_position ON {table}(user_id, position)"
            ),
            [],
        )?;
    }

    conn.execute(
        "CREATE TABLE IF NOT EXISTS games(
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            title TEXT NOT NULL,
            description TEXT NOT NULL,
            filename TEXT NOT NULL,
            original_name TEXT NOT NULL,
            file_type TEXT NOT NULL,
            requirements TEXT,
            instructions TEXT NOT NULL,
            sha256 TEXT NOT NULL,
            downloads INTEGER NOT NULL DEFAULT 0,
            date_uploaded TEXT NOT NULL,
            FOREIGN KEY(user_id) REFERENCES users(id) ON DELETE CASCADE
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS flappy_scores(
            id INTEGER PRIMARY KEY,
            player_name TEXT NOT NULL,
            score INTEGER NOT NULL CHECK(score >= 0),
            user_id INTEGER NOT NULL,
            achieved_at TEXT NOT NULL,
            FOREIGN KEY(user_id) REFERENCES users(id) ON DELETE CASCADE
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_flappy_scores_player ON flappy_scores(player_name, score)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_flappy_scores_achieved ON flappy_scores(achieved_at)",
        [],
    )?;

    Ok(())
}

/// Fixed-width UTC text form; lexical order matches chronological order.
pub fn format_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn now_ts() -> String {
    format_ts(Utc::now())
}

/// Midnight (UTC) of the calendar day containing `ts`.
pub fn start_of_day(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.date_naive().and_time(NaiveTime::default()).and_utc()
}

fn ensure_position_column(conn: &Connection, table: &str) -> anyhow::Result<()> {
    if table_has_column(conn, table, "position")? {
        return Ok(());
    }

    conn.execute(
        &format!("ALTER TABLE {table} ADD COLUMN position INTEGER NOT NULL DEFAULT 0"),
        [],
    )?;

    // Backfill per owner using insert order.
    let mut owner_stmt = conn.prepare(&format!("SELECT DISTINCT user_id FROM {table}"))?;
    let owners = owner_stmt
        .query_map([], |row| row.get::<_, i64>(0))?
        .collect::<Result<Vec<_>, _>>()?;

    let mut member_stmt =
        conn.prepare(&format!("SELECT id FROM {table} WHERE user_id = ? ORDER BY id"))?;
    for owner in owners {
        let ids = member_stmt
            .query_map([owner], |row| row.get::<_, i64>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        for (i, id) in ids.iter().enumerate() {
            conn.execute(
                &format!("UPDATE {table} SET position = ? WHERE id = ?"),
                (i as i64, id),
            )?;
        }
    }

    Ok(())
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> anyhow::Result<bool> {
    let sql = format!("PRAGMA table_info({})", table);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}

#[cfg(test)]
pub(crate) fn test_conn() -> Connection {
    let conn = Connection::open_in_memory().expect("open in-memory db");
    init_schema(&conn).expect("init schema");
    conn
}

#[cfg(test)]
pub(crate) fn insert_test_user(conn: &Connection, email: &str, first_name: &str) -> i64 {
    conn.execute(
        "INSERT INTO users(email, password_hash, first_name, created_at) VALUES(?, 'x', ?, ?)",
        (email, first_name, now_ts()),
    )
    .expect("insert user");
    conn.last_insert_rowid()
}
