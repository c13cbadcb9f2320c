use crate::error::{PortalError, PortalResult};

pub type AccountId = i64;

/// A row that belongs to exactly one account.
pub trait Owned {
    fn owner_id(&self) -> AccountId;
}

pub fn is_owned_by<T: Owned>(row: &T, caller: AccountId) -> bool {
    row.owner_id() == caller
}

/// Shared guard for delete/update style operations: the row must exist and
/// belong to the caller.
pub fn resolve_owned<T: Owned>(found: Option<T>, caller: AccountId, what: &str) -> PortalResult<T> {
    let Some(row) = found else {
        return Err(PortalError::not_found(format!("{what} not found")));
    };
    if !is_owned_by(&row, caller) {
        return Err(PortalError::unauthorized(format!(
            "not authorized to modify this {what}"
        )));
    }
    Ok(row)
}
