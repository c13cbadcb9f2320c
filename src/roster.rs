//! Per-account ordered rosters of students and teachers.
//!
//! `position` only means something inside one owner's roster. New members go
//! to the end; drag-reorder rewrites the positions of the ids it is given and
//! leaves every other row alone. Nothing ever renumbers after a delete.

use crate::db::now_ts;
use crate::error::{PortalError, PortalResult};
use crate::ownership::{is_owned_by, resolve_owned, AccountId, Owned};
use crate::storage::{remove_best_effort, FileStore};
use rusqlite::{Connection, OptionalExtension};
use serde_json::json;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Roster {
    Student,
    Teacher,
}

impl Roster {
    pub fn table(self) -> &'static str {
        match self {
            Roster::Student => "students",
            Roster::Teacher => "teachers",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Roster::Student => "student",
            Roster::Teacher => "teacher",
        }
    }

    /// Column holding the roster-specific required field.
    pub fn detail_column(self) -> &'static str {
        match self {
            Roster::Student => "class_section",
            Roster::Teacher => "subject",
        }
    }

    /// Wire name of `detail_column`.
    pub fn detail_key(self) -> &'static str {
        match self {
            Roster::Student => "classSection",
            Roster::Teacher => "subject",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMember {
    pub name: String,
    pub age: i64,
    pub contact: String,
    pub detail: String,
    pub email: Option<String>,
    pub profile_pic: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterMember {
    pub id: i64,
    pub owner_id: AccountId,
    pub name: String,
    pub age: i64,
    pub contact: String,
    pub detail: String,
    pub email: Option<String>,
    pub profile_pic: Option<String>,
    pub date_added: String,
    pub position: i64,
}

impl Owned for RosterMember {
    fn owner_id(&self) -> AccountId {
        self.owner_id
    }
}

impl RosterMember {
    pub fn to_json(&self, roster: Roster) -> serde_json::Value {
        let mut v = json!({
            "id": self.id,
            "name": self.name,
            "age": self.age,
            "contact": self.contact,
            "email": self.email,
            "profilePic": self.profile_pic,
            "dateAdded": self.date_added,
            "position": self.position,
        });
        v[roster.detail_key()] = json!(self.detail);
        v
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReorderOutcome {
    pub updated: usize,
    pub skipped: usize,
}

fn select_sql(roster: Roster, filter: &str) -> String {
    format!(
        "SELECT id, user_id, name, age, contact, {}, email, profile_pic, date_added, position
         FROM {} {}",
        roster.detail_column(),
        roster.table(),
        filter
    )
}

fn member_from_row(r: &rusqlite::Row<'_>) -> rusqlite::Result<RosterMember> {
    Ok(RosterMember {
        id: r.get(0)?,
        owner_id: r.get(1)?,
        name: r.get(2)?,
        age: r.get(3)?,
        contact: r.get(4)?,
        detail: r.get(5)?,
        email: r.get(6)?,
        profile_pic: r.get(7)?,
        date_added: r.get(8)?,
        position: r.get(9)?,
    })
}

pub fn find(conn: &Connection, roster: Roster, id: i64) -> PortalResult<Option<RosterMember>> {
    let member = conn
        .query_row(&select_sql(roster, "WHERE id = ?"), [id], member_from_row)
        .optional()?;
    Ok(member)
}

pub fn list(conn: &Connection, roster: Roster, owner: AccountId) -> PortalResult<Vec<RosterMember>> {
    let mut stmt = conn.prepare(&select_sql(roster, "WHERE user_id = ? ORDER BY position, id"))?;
    let rows = stmt
        .query_map([owner], member_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Inserts a member after the owner's current last one. Returns `(id, position)`.
pub fn append(
    conn: &Connection,
    roster: Roster,
    member: &NewMember,
    owner: AccountId,
) -> PortalResult<(i64, i64)> {
    let tx = conn.unchecked_transaction()?;
    let last: Option<i64> = tx.query_row(
        &format!("SELECT MAX(position) FROM {} WHERE user_id = ?", roster.table()),
        [owner],
        |r| r.get(0),
    )?;
    let position = last.map(|p| p + 1).unwrap_or(0);

    tx.execute(
        &format!(
            "INSERT INTO {}(user_id, name, age, contact, {}, email, profile_pic, date_added, position)
             VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?)",
            roster.table(),
            roster.detail_column()
        ),
        rusqlite::params![
            owner,
            member.name,
            member.age,
            member.contact,
            member.detail,
            member.email,
            member.profile_pic,
            now_ts(),
            position
        ],
    )?;
    let id = tx.last_insert_rowid();
    tx.commit()?;

    tracing::info!(roster = roster.label(), id, position, owner, "member added");
    Ok((id, position))
}

/// Gives each listed id its list index as position.
///
/// Ids that do not exist or belong to someone else are skipped rather than
/// rejected. A storage failure part way through rolls the whole batch back.
pub fn reorder(
    conn: &Connection,
    roster: Roster,
    ordered_ids: &[i64],
    owner: AccountId,
) -> PortalResult<ReorderOutcome> {
    let tx = conn.unchecked_transaction()?;
    let mut outcome = ReorderOutcome::default();

    for (position, id) in ordered_ids.iter().enumerate() {
        let owned = match find(&tx, roster, *id)? {
            Some(member) => is_owned_by(&member, owner),
            None => false,
        };
        if !owned {
            outcome.skipped += 1;
            continue;
        }
        tx.execute(
            &format!("UPDATE {} SET position = ? WHERE id = ?", roster.table()),
            (position as i64, id),
        )?;
        outcome.updated += 1;
    }

    tx.commit()?;

    tracing::info!(
        roster = roster.label(),
        owner,
        updated = outcome.updated,
        skipped = outcome.skipped,
        "roster reordered"
    );
    Ok(outcome)
}

/// Removes one member and its profile picture. Sibling positions are kept.
pub fn delete(
    conn: &Connection,
    files: &dyn FileStore,
    roster: Roster,
    id: i64,
    owner: AccountId,
) -> PortalResult<()> {
    let member = resolve_owned(find(conn, roster, id)?, owner, roster.label())?;

    conn.execute(
        &format!("DELETE FROM {} WHERE id = ?", roster.table()),
        [member.id],
    )?;
    if let Some(pic) = member.profile_pic.as_deref() {
        remove_best_effort(files, pic);
    }

    tracing::info!(roster = roster.label(), id, owner, "member deleted");
    Ok(())
}

/// Parses `orderedIdList`; ids arrive as numbers or as numeric strings.
pub fn parse_ordered_ids(raw: Option<&serde_json::Value>) -> PortalResult<Vec<i64>> {
    let Some(arr) = raw.and_then(|v| v.as_array()) else {
        return Err(PortalError::validation("missing/invalid orderedIdList"));
    };
    arr.iter()
        .map(|v| {
            v.as_i64()
                .or_else(|| v.as_str().and_then(|s| s.trim().parse::<i64>().ok()))
                .ok_or_else(|| PortalError::validation("orderedIdList must contain ids"))
        })
        .collect()
}
