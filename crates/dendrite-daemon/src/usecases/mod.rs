//! Use cases: one trait + implementation per surfaced operation.
//!
//! Handlers depend on the traits, so handler tests swap in mocks and
//! use-case tests swap in `MockSimRepository`.

mod artifact;
mod relay;
mod sim;

pub use artifact::FetchArtifactUseCase;
pub use artifact::FetchArtifactUseCaseImpl;
pub use relay::PushUseCase;
pub use relay::PushUseCaseImpl;
pub use sim::CommandUseCase;
pub use sim::CommandUseCaseImpl;
pub use sim::LaunchUseCase;
pub use sim::LaunchUseCaseImpl;
pub use sim::SimsUseCase;
pub use sim::SimsUseCaseImpl;
pub use sim::StatusUseCase;
pub use sim::StatusUseCaseImpl;
pub use sim::TerminateUseCase;
pub use sim::TerminateUseCaseImpl;

use std::sync::Arc;

use crate::relay::DataRelay;
use crate::repository::SimRepository;
use crate::sessions::SessionStore;

/// All use cases wired to their production collaborators.
pub struct UseCaseContainer<R: SimRepository> {
    pub launch: LaunchUseCaseImpl<R>,
    pub terminate: TerminateUseCaseImpl<R>,
    pub status: StatusUseCaseImpl<R>,
    pub command: CommandUseCaseImpl<R>,
    pub sims: SimsUseCaseImpl<R>,
    pub push: PushUseCaseImpl,
    pub artifact: FetchArtifactUseCaseImpl,
}

impl<R: SimRepository> UseCaseContainer<R> {
    pub fn new(repository: Arc<R>, relay: Arc<DataRelay>, sessions: Arc<SessionStore>) -> Self {
        Self {
            launch: LaunchUseCaseImpl::new(Arc::clone(&repository)),
            terminate: TerminateUseCaseImpl::new(Arc::clone(&repository)),
            status: StatusUseCaseImpl::new(Arc::clone(&repository)),
            command: CommandUseCaseImpl::new(Arc::clone(&repository)),
            sims: SimsUseCaseImpl::new(repository),
            push: PushUseCaseImpl::new(relay),
            artifact: FetchArtifactUseCaseImpl::new(sessions),
        }
    }
}
