use crate::error::{PortalError, PortalResult};
use crate::storage::read_source;
use std::path::Path;

pub fn get_required_str<'a>(params: &'a serde_json::Value, key: &str) -> PortalResult<&'a str> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| PortalError::validation(format!("missing {key}")))
}

/// Optional string param; blank strings count as absent.
pub fn get_optional_str<'a>(params: &'a serde_json::Value, key: &str) -> Option<&'a str> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Integer ids; the browser side tends to send them as strings.
pub fn get_required_id(params: &serde_json::Value, key: &str) -> PortalResult<i64> {
    let Some(v) = params.get(key) else {
        return Err(PortalError::validation(format!("missing {key}")));
    };
    v.as_i64()
        .or_else(|| v.as_str().and_then(|s| s.trim().parse::<i64>().ok()))
        .ok_or_else(|| PortalError::validation(format!("{key} must be an id")))
}

pub fn get_required_bool(params: &serde_json::Value, key: &str) -> PortalResult<bool> {
    params
        .get(key)
        .and_then(|v| v.as_bool())
        .ok_or_else(|| PortalError::validation(format!("missing/invalid {key}")))
}

pub fn get_optional_usize(params: &serde_json::Value, key: &str) -> PortalResult<Option<usize>> {
    match params.get(key) {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(v) => v
            .as_u64()
            .map(|n| Some(n as usize))
            .ok_or_else(|| PortalError::validation(format!("{key} must be a positive integer"))),
    }
}

/// Reads the file named by a path param, as `(bytes, file name)`.
pub fn read_upload(params: &serde_json::Value, key: &str) -> PortalResult<Option<(Vec<u8>, String)>> {
    let Some(p) = get_optional_str(params, key) else {
        return Ok(None);
    };
    read_source(Path::new(p))
        .map(Some)
        .map_err(|e| PortalError::validation(format!("cannot read {key}: {e:#}")))
}
