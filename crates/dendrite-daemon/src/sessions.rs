//! Per-client session directories.
//!
//! Every client gets exactly one directory under the uploads root; it
//! holds uploaded inputs and the simulation's output artifacts, and is
//! recursively removed when the owning connection disconnects. Client
//! ids and filenames must be single path components so a session can
//! never reach outside its own directory.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::SimError;

pub struct SessionStore {
    root: PathBuf,
}

fn is_single_component(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains('/')
        && !name.contains('\\')
        && !name.contains('\0')
}

impl SessionStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn validate(name: &str, field: &str) -> Result<(), SimError> {
        if is_single_component(name) {
            Ok(())
        } else {
            Err(SimError::invalid(field))
        }
    }

    /// Path of the client's session directory; does not create it.
    pub fn dir_for(&self, client_id: &str) -> Result<PathBuf, SimError> {
        Self::validate(client_id, "client_id")?;
        Ok(self.root.join(client_id))
    }

    /// Create the client's session directory if absent and return it.
    pub fn ensure(&self, client_id: &str) -> Result<PathBuf, SimError> {
        let dir = self.dir_for(client_id)?;
        fs::create_dir_all(&dir).map_err(|e| SimError::session("create_session_dir", e))?;
        Ok(dir)
    }

    /// Recursively remove the client's session directory.
    ///
    /// Returns whether a directory existed. Absence is not an error:
    /// disconnect cleanup runs for clients that never uploaded anything.
    pub fn remove(&self, client_id: &str) -> Result<bool, SimError> {
        let dir = self.dir_for(client_id)?;
        if !dir.exists() {
            return Ok(false);
        }
        fs::remove_dir_all(&dir).map_err(|e| SimError::session("remove_session_dir", e))?;
        info!(client_id, "removed session directory");
        Ok(true)
    }

    pub fn artifact_path(&self, client_id: &str, filename: &str) -> Result<PathBuf, SimError> {
        Self::validate(filename, "filename")?;
        Ok(self.dir_for(client_id)?.join(filename))
    }

    pub fn artifact_exists(&self, client_id: &str, filename: &str) -> bool {
        self.artifact_path(client_id, filename)
            .map(|p| p.exists())
            .unwrap_or(false)
    }

    pub fn read_artifact(&self, client_id: &str, filename: &str) -> Result<Vec<u8>, SimError> {
        let path = self.artifact_path(client_id, filename)?;
        if !path.exists() {
            return Err(SimError::ArtifactNotFound {
                client_id: client_id.to_string(),
                filename: filename.to_string(),
            });
        }
        fs::read(&path).map_err(|e| SimError::session("read_artifact", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, SessionStore) {
        let tmp = tempfile::tempdir().unwrap();
        let store = SessionStore::new(tmp.path().join("user_uploads"));
        (tmp, store)
    }

    #[test]
    fn test_ensure_creates_and_is_idempotent() {
        let (_tmp, store) = store();
        let dir = store.ensure("abc").unwrap();
        assert!(dir.is_dir());
        assert_eq!(store.ensure("abc").unwrap(), dir);
    }

    #[test]
    fn test_remove_deletes_recursively() {
        let (_tmp, store) = store();
        let dir = store.ensure("abc").unwrap();
        fs::write(dir.join("plot.svg"), b"<svg/>").unwrap();

        assert!(store.remove("abc").unwrap());
        assert!(!dir.exists());
        assert!(!store.remove("abc").unwrap());
    }

    #[test]
    fn test_client_id_confinement() {
        let (_tmp, store) = store();
        assert!(store.dir_for("../evil").is_err());
        assert!(store.dir_for("a/b").is_err());
        assert!(store.dir_for("").is_err());
        assert!(store.dir_for("..").is_err());
        assert!(store.artifact_path("abc", "../../etc/passwd").is_err());
    }

    #[test]
    fn test_read_artifact() {
        let (_tmp, store) = store();
        let dir = store.ensure("abc").unwrap();
        fs::write(dir.join("plot.svg"), b"<svg/>").unwrap();

        assert!(store.artifact_exists("abc", "plot.svg"));
        assert_eq!(store.read_artifact("abc", "plot.svg").unwrap(), b"<svg/>");
        assert!(matches!(
            store.read_artifact("abc", "missing.svg"),
            Err(SimError::ArtifactNotFound { .. })
        ));
    }
}
