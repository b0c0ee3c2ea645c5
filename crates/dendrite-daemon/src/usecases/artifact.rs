use std::sync::Arc;

use crate::error::SimError;
use crate::sessions::SessionStore;

/// Use case for fetching an output artifact from a client's session dir.
pub trait FetchArtifactUseCase: Send + Sync {
    fn execute(&self, client_id: &str, filename: &str) -> Result<Vec<u8>, SimError>;
}

pub struct FetchArtifactUseCaseImpl {
    sessions: Arc<SessionStore>,
}

impl FetchArtifactUseCaseImpl {
    pub fn new(sessions: Arc<SessionStore>) -> Self {
        Self { sessions }
    }
}

impl FetchArtifactUseCase for FetchArtifactUseCaseImpl {
    fn execute(&self, client_id: &str, filename: &str) -> Result<Vec<u8>, SimError> {
        self.sessions.read_artifact(client_id, filename)
    }
}
