use crate::db::now_ts;
use crate::error::{PortalError, PortalResult};
use crate::ownership::AccountId;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;

pub const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: AccountId,
    pub email: String,
    pub first_name: String,
}

#[derive(Debug, Clone)]
pub struct SignUp<'a> {
    pub email: &'a str,
    pub first_name: &'a str,
    pub password1: &'a str,
    pub password2: &'a str,
}

/// Who is logged in on this connection to the sidecar.
#[derive(Debug, Default)]
pub struct Session {
    account: Option<Account>,
}

impl Session {
    pub fn log_in(&mut self, account: Account) {
        self.account = Some(account);
    }

    pub fn log_out(&mut self) -> PortalResult<()> {
        match self.account.take() {
            Some(_) => Ok(()),
            None => Err(PortalError::unauthorized("login required")),
        }
    }

    /// Forgets any logged-in account.
    pub fn clear(&mut self) {
        self.account = None;
    }

    pub fn current(&self) -> PortalResult<&Account> {
        self.account
            .as_ref()
            .ok_or_else(|| PortalError::unauthorized("login required"))
    }

    pub fn current_account_id(&self) -> PortalResult<AccountId> {
        self.current().map(|a| a.id)
    }

    pub fn is_authenticated(&self) -> bool {
        self.account.is_some()
    }
}

pub fn hash_password(password: &str) -> PortalResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| PortalError::Storage(anyhow::anyhow!("failed to hash password: {e}")))
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

fn find_by_email(conn: &Connection, email: &str) -> PortalResult<Option<(Account, String)>> {
    let row = conn
        .query_row(
            "SELECT id, email, first_name, password_hash FROM users WHERE email = ?",
            [email],
            |r| {
                Ok((
                    Account {
                        id: r.get(0)?,
                        email: r.get(1)?,
                        first_name: r.get(2)?,
                    },
                    r.get::<_, String>(3)?,
                ))
            },
        )
        .optional()?;
    Ok(row)
}

pub fn sign_up(conn: &Connection, form: &SignUp<'_>) -> PortalResult<Account> {
    let email = form.email.trim();
    let first_name = form.first_name.trim();

    if find_by_email(conn, email)?.is_some() {
        return Err(PortalError::validation("Email already exists."));
    }
    if email.chars().count() <= 4 {
        return Err(PortalError::validation(
            "Email must be greater than 4 characters.",
        ));
    }
    if first_name.chars().count() < 2 {
        return Err(PortalError::validation(
            "First name must be greater than 1 character.",
        ));
    }
    if form.password1 != form.password2 {
        return Err(PortalError::validation("Passwords don't match."));
    }
    if form.password1.chars().count() < MIN_PASSWORD_LEN {
        return Err(PortalError::validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters."
        )));
    }

    let hash = hash_password(form.password1)?;
    conn.execute(
        "INSERT INTO users(email, password_hash, first_name, created_at) VALUES(?, ?, ?, ?)",
        (email, &hash, first_name, now_ts()),
    )?;
    let account = Account {
        id: conn.last_insert_rowid(),
        email: email.to_string(),
        first_name: first_name.to_string(),
    };
    tracing::info!(account = account.id, "account created");
    Ok(account)
}

pub fn log_in(conn: &Connection, email: &str, password: &str) -> PortalResult<Account> {
    let Some((account, hash)) = find_by_email(conn, email.trim())? else {
        return Err(PortalError::unauthorized("Email does not exist."));
    };
    if !verify_password(password, &hash) {
        tracing::warn!(account = account.id, "failed login");
        return Err(PortalError::unauthorized("Incorrect password, try again."));
    }
    tracing::info!(account = account.id, "logged in");
    Ok(account)
}
