use anyhow::Context;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Where uploaded bytes live. Rows only ever hold the stored name.
pub trait FileStore {
    fn store(&self, bytes: &[u8], suggested_name: &str) -> anyhow::Result<String>;
    fn delete(&self, stored_name: &str) -> anyhow::Result<()>;
    fn path(&self, stored_name: &str) -> PathBuf;
}

#[derive(Debug, Clone)]
pub struct DiskFileStore {
    root: PathBuf,
}

impl DiskFileStore {
    pub fn open(root: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)
            .with_context(|| format!("failed to create directory {}", root.to_string_lossy()))?;
        Ok(Self { root })
    }
}

impl FileStore for DiskFileStore {
    fn store(&self, bytes: &[u8], suggested_name: &str) -> anyhow::Result<String> {
        let token = Uuid::new_v4().simple().to_string();
        let stored_name = format!("{}_{}", &token[..12], sanitize_filename(suggested_name));
        let dest = self.root.join(&stored_name);
        std::fs::write(&dest, bytes)
            .with_context(|| format!("failed to write {}", dest.to_string_lossy()))?;
        Ok(stored_name)
    }

    fn delete(&self, stored_name: &str) -> anyhow::Result<()> {
        let p = self.path(stored_name);
        if p.exists() {
            std::fs::remove_file(&p)
                .with_context(|| format!("failed to remove {}", p.to_string_lossy()))?;
        }
        Ok(())
    }

    fn path(&self, stored_name: &str) -> PathBuf {
        // Stored names never contain separators, but rows can be edited by hand.
        self.root.join(sanitize_filename(stored_name))
    }
}

/// Deletes a stored file, logging instead of failing.
pub fn remove_best_effort(store: &dyn FileStore, stored_name: &str) {
    if let Err(e) = store.delete(stored_name) {
        tracing::warn!(file = stored_name, error = %e, "could not remove stored file");
    }
}

/// Reduces an arbitrary client-supplied name to a safe single path component.
pub fn sanitize_filename(name: &str) -> String {
    let base = name
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        .collect();
    let cleaned = cleaned.trim_start_matches('.').to_string();
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}

/// Lower-cased extension of `name` if it is one of `allowed`.
pub fn allowed_extension(name: &str, allowed: &[&str]) -> Option<String> {
    let (_, ext) = name.rsplit_once('.')?;
    let ext = ext.to_ascii_lowercase();
    allowed.contains(&ext.as_str()).then_some(ext)
}

/// Reads an upload from disk, returning its bytes and file name.
pub fn read_source(source: &Path) -> anyhow::Result<(Vec<u8>, String)> {
    let bytes = std::fs::read(source)
        .with_context(|| format!("failed to read {}", source.to_string_lossy()))?;
    let name = source
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    Ok((bytes, name))
}

#[cfg(test)]
pub(crate) fn temp_dir(prefix: &str) -> PathBuf {
    use std::time::{SystemTime, UNIX_EPOCH};
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_paths_and_odd_characters() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("C:\\Users\\me\\My Photo.png"), "My_Photo.png");
        assert_eq!(sanitize_filename(".hidden"), "hidden");
        assert_eq!(sanitize_filename("???"), "upload");
    }

    #[test]
    fn allowed_extension_is_case_insensitive() {
        assert_eq!(
            allowed_extension("Game.ZIP", &["py", "zip"]),
            Some("zip".to_string())
        );
        assert_eq!(allowed_extension("game.exe", &["py", "zip"]), None);
        assert_eq!(allowed_extension("noext", &["py"]), None);
    }

    #[test]
    fn store_then_delete() {
        let store = DiskFileStore::open(temp_dir("classroomd-store")).expect("store");
        let a = store.store(b"one", "pic.png").expect("store a");
        let b = store.store(b"two", "pic.png").expect("store b");
        assert_ne!(a, b);
        assert!(a.ends_with("_pic.png"));
        assert_eq!(std::fs::read(store.path(&a)).expect("read a"), b"one");

        store.delete(&a).expect("delete");
        assert!(!store.path(&a).exists());
        // Deleting twice is fine.
        store.delete(&a).expect("delete again");
        assert!(store.path(&b).exists());
    }
}
