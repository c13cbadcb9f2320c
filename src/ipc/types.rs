use crate::accounts::Session;
use crate::config::Config;
use crate::db;
use crate::error::{PortalError, PortalResult};
use crate::storage::DiskFileStore;
use rusqlite::Connection;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// An opened workspace: the database plus the two upload folders.
pub struct Workspace {
    pub path: PathBuf,
    pub conn: Connection,
    pub uploads: DiskFileStore,
    pub games: DiskFileStore,
}

impl Workspace {
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let conn = db::open_db(path)?;
        let uploads = DiskFileStore::open(path.join("uploads"))?;
        let games = DiskFileStore::open(path.join("games"))?;
        Ok(Self {
            path: path.to_path_buf(),
            conn,
            uploads,
            games,
        })
    }
}

pub struct AppState {
    pub config: Config,
    pub workspace: Option<Workspace>,
    pub session: Session,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            workspace: None,
            session: Session::default(),
        }
    }

    pub fn workspace(&self) -> PortalResult<&Workspace> {
        self.workspace.as_ref().ok_or(PortalError::NoWorkspace)
    }
}
