use crate::db::now_ts;
use crate::error::{PortalError, PortalResult};
use crate::ownership::{resolve_owned, AccountId, Owned};
use crate::storage::{allowed_extension, remove_best_effort, sanitize_filename, FileStore};
use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;

pub const ATTACHMENT_EXTENSIONS: &[&str] = &["txt", "pdf", "png", "jpg", "jpeg", "docx"];
pub const DEFAULT_SUBJECT: &str = "General";
pub const MAX_NOTE_LEN: usize = 1000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: i64,
    pub owner_id: AccountId,
    pub author: String,
    pub data: String,
    pub file_name: Option<String>,
    pub subject: String,
    pub public: bool,
    pub created_at: String,
}

impl Owned for Note {
    fn owner_id(&self) -> AccountId {
        self.owner_id
    }
}

pub struct Attachment<'a> {
    pub bytes: &'a [u8],
    pub name: &'a str,
}

const NOTE_SELECT: &str = "SELECT n.id, n.user_id, u.first_name, n.data, n.file_name, n.subject, n.public, n.created_at
     FROM notes n
     JOIN users u ON u.id = n.user_id";

fn note_from_row(r: &rusqlite::Row<'_>) -> rusqlite::Result<Note> {
    Ok(Note {
        id: r.get(0)?,
        owner_id: r.get(1)?,
        author: r.get(2)?,
        data: r.get(3)?,
        file_name: r.get(4)?,
        subject: r.get(5)?,
        public: r.get::<_, i64>(6)? != 0,
        created_at: r.get(7)?,
    })
}

pub fn find(conn: &Connection, id: i64) -> PortalResult<Option<Note>> {
    let note = conn
        .query_row(&format!("{NOTE_SELECT} WHERE n.id = ?"), [id], note_from_row)
        .optional()?;
    Ok(note)
}

pub fn create(
    conn: &Connection,
    files: &dyn FileStore,
    owner: AccountId,
    data: Option<&str>,
    subject: Option<&str>,
    attachment: Option<Attachment<'_>>,
) -> PortalResult<i64> {
    // An attachment on its own still makes a note.
    let data = match (data.map(str::trim).filter(|d| !d.is_empty()), &attachment) {
        (Some(d), _) => d.to_string(),
        (None, Some(a)) => format!("Uploaded file: {}", sanitize_filename(a.name)),
        (None, None) => return Err(PortalError::validation("note must not be empty")),
    };
    if data.chars().count() > MAX_NOTE_LEN {
        return Err(PortalError::validation(format!(
            "note must be at most {MAX_NOTE_LEN} characters"
        )));
    }
    let subject = subject
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_SUBJECT);

    let file_name = match attachment {
        Some(a) => {
            if allowed_extension(a.name, ATTACHMENT_EXTENSIONS).is_none() {
                return Err(PortalError::validation("Invalid file type!"));
            }
            Some(files.store(a.bytes, a.name)?)
        }
        None => None,
    };

    let inserted = conn.execute(
        "INSERT INTO notes(user_id, data, file_name, subject, public, created_at)
         VALUES(?, ?, ?, ?, 0, ?)",
        (owner, &data, &file_name, subject, now_ts()),
    );
    if let Err(e) = inserted {
        if let Some(f) = file_name.as_deref() {
            remove_best_effort(files, f);
        }
        return Err(e.into());
    }
    let id = conn.last_insert_rowid();
    tracing::info!(note = id, owner, attachment = file_name.is_some(), "note created");
    Ok(id)
}

pub fn list_own(conn: &Connection, owner: AccountId) -> PortalResult<Vec<Note>> {
    let mut stmt = conn.prepare(&format!(
        "{NOTE_SELECT} WHERE n.user_id = ? ORDER BY n.created_at DESC, n.id DESC"
    ))?;
    let rows = stmt
        .query_map([owner], note_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn list_shared(conn: &Connection) -> PortalResult<Vec<Note>> {
    let mut stmt = conn.prepare(&format!(
        "{NOTE_SELECT} WHERE n.public = 1 ORDER BY n.created_at DESC, n.id DESC"
    ))?;
    let rows = stmt
        .query_map([], note_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn set_public(conn: &Connection, id: i64, public: bool, owner: AccountId) -> PortalResult<()> {
    let note = resolve_owned(find(conn, id)?, owner, "note")?;
    conn.execute(
        "UPDATE notes SET public = ? WHERE id = ?",
        (public as i64, note.id),
    )?;
    tracing::info!(note = id, public, "note share toggled");
    Ok(())
}

pub fn delete(conn: &Connection, files: &dyn FileStore, id: i64, owner: AccountId) -> PortalResult<()> {
    let note = resolve_owned(find(conn, id)?, owner, "note")?;
    conn.execute("DELETE FROM notes WHERE id = ?", [note.id])?;
    if let Some(f) = note.file_name.as_deref() {
        remove_best_effort(files, f);
    }
    tracing::info!(note = id, owner, "note deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{insert_test_user, test_conn};
    use crate::storage::{temp_dir, DiskFileStore};

    #[test]
    fn create_and_share() {
        let conn = test_conn();
        let files = DiskFileStore::open(temp_dir("classroomd-notes")).expect("files");
        let a = insert_test_user(&conn, "a@example.com", "Ann");
        let b = insert_test_user(&conn, "b@example.com", "Bob");

        let id = create(&conn, &files, a, Some(" fractions recap "), None, None).expect("create");
        let note = find(&conn, id).expect("find").expect("exists");
        assert_eq!(note.data, "fractions recap");
        assert_eq!(note.subject, DEFAULT_SUBJECT);
        assert!(!note.public);
        assert!(list_shared(&conn).expect("shared").is_empty());

        let denied = set_public(&conn, id, true, b).err().expect("denied");
        assert_eq!(denied.code(), "unauthorized");

        set_public(&conn, id, true, a).expect("share");
        let shared = list_shared(&conn).expect("shared");
        assert_eq!(shared.len(), 1);
        assert_eq!(shared[0].author, "Ann");
        assert_eq!(list_own(&conn, b).expect("own").len(), 0);
    }

    #[test]
    fn attachments_are_checked_and_cleaned_up() {
        let conn = test_conn();
        let files = DiskFileStore::open(temp_dir("classroomd-notes-files")).expect("files");
        let a = insert_test_user(&conn, "a@example.com", "Ann");

        let bad = create(
            &conn,
            &files,
            a,
            Some("script"),
            Some("CS"),
            Some(Attachment { bytes: b"rm -rf", name: "run.sh" }),
        )
        .err()
        .expect("rejected");
        assert_eq!(bad.code(), "bad_params");

        let id = create(
            &conn,
            &files,
            a,
            Some("worksheet"),
            Some("Math"),
            Some(Attachment { bytes: b"pdf", name: "sheet.PDF" }),
        )
        .expect("create");
        let stored = find(&conn, id)
            .expect("find")
            .and_then(|n| n.file_name)
            .expect("file name");
        assert!(files.path(&stored).exists());

        delete(&conn, &files, id, a).expect("delete");
        assert!(!files.path(&stored).exists());
        assert_eq!(delete(&conn, &files, id, a).err().map(|e| e.code()), Some("not_found"));
    }

    #[test]
    fn empty_note_is_rejected() {
        let conn = test_conn();
        let files = DiskFileStore::open(temp_dir("classroomd-notes-empty")).expect("files");
        let a = insert_test_user(&conn, "a@example.com", "Ann");
        assert!(create(&conn, &files, a, Some("   "), None, None).is_err());
        assert!(create(&conn, &files, a, None, None, None).is_err());
    }

    #[test]
    fn attachment_alone_gets_placeholder_text() {
        let conn = test_conn();
        let files = DiskFileStore::open(temp_dir("classroomd-notes-upload")).expect("files");
        let a = insert_test_user(&conn, "a@example.com", "Ann");

        let id = create(
            &conn,
            &files,
            a,
            None,
            None,
            Some(Attachment { bytes: b"notes", name: "week 3.txt" }),
        )
        .expect("create");
        let note = find(&conn, id).expect("find").expect("exists");
        assert_eq!(note.data, "Uploaded file: week_3.txt");
        assert_eq!(note.subject, DEFAULT_SUBJECT);
        assert!(note.file_name.is_some());
    }
}
