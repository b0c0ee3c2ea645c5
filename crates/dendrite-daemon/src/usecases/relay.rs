use std::sync::Arc;

use serde_json::Value;

use crate::relay::DataRelay;

/// Use case for the internal push endpoint: the external simulation's
/// results re-enter the system here and fan out to subscribers.
pub trait PushUseCase: Send + Sync {
    /// Returns the number of connections the payload was delivered to.
    fn execute(&self, channel: &str, payload: Value) -> usize;
}

pub struct PushUseCaseImpl {
    relay: Arc<DataRelay>,
}

impl PushUseCaseImpl {
    pub fn new(relay: Arc<DataRelay>) -> Self {
        Self { relay }
    }
}

impl PushUseCase for PushUseCaseImpl {
    fn execute(&self, channel: &str, payload: Value) -> usize {
        self.relay.publish(channel, payload)
    }
}
