use thiserror::Error;

/// Failure taxonomy shared by every portal operation.
///
/// Handlers translate these into the `{ok: false, error}` envelope; storage
/// failures keep their detail for the log but only ever surface a generic
/// message to the caller.
#[derive(Debug, Error)]
pub enum PortalError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Authorization(String),
    #[error("{0}")]
    NotFound(String),
    #[error("select a workspace first")]
    NoWorkspace,
    #[error("storage failure: {0:#}")]
    Storage(anyhow::Error),
}

pub type PortalResult<T> = Result<T, PortalError>;

impl PortalError {
    pub fn validation(message: impl Into<String>) -> Self {
        PortalError::Validation(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        PortalError::Authorization(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        PortalError::NotFound(message.into())
    }

    pub fn code(&self) -> &'static str {
        match self {
            PortalError::Validation(_) => "bad_params",
            PortalError::Authorization(_) => "unauthorized",
            PortalError::NotFound(_) => "not_found",
            PortalError::NoWorkspace => "no_workspace",
            PortalError::Storage(_) => "storage_failed",
        }
    }

    /// Message safe to hand back over the wire.
    pub fn public_message(&self) -> String {
        match self {
            PortalError::Storage(_) => "Server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<rusqlite::Error> for PortalError {
    fn from(e: rusqlite::Error) -> Self {
        PortalError::Storage(e.into())
    }
}

impl From<std::io::Error> for PortalError {
    fn from(e: std::io::Error) -> Self {
        PortalError::Storage(e.into())
    }
}

impl From<anyhow::Error> for PortalError {
    fn from(e: anyhow::Error) -> Self {
        PortalError::Storage(e)
    }
}
