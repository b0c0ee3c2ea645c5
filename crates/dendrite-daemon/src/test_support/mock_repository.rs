//! Configurable mock repository with call tracking.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::Value;

use crate::domain::{LaunchOutput, SimInfo, SimStatus};
use crate::error::SimError;
use crate::repository::SimRepository;

#[derive(Default)]
pub struct MockSimRepository {
    launch_results: Mutex<VecDeque<Result<LaunchOutput, SimError>>>,
    terminate_results: Mutex<VecDeque<bool>>,
    status_result: Mutex<SimStatus>,
    command_result: Mutex<bool>,
    sims: Mutex<Vec<SimInfo>>,

    launch_calls: AtomicUsize,
    terminate_calls: AtomicUsize,
    status_calls: AtomicUsize,
    command_calls: AtomicUsize,

    launched: Mutex<Vec<(String, Value)>>,
    terminated: Mutex<Vec<u32>>,
    commands: Mutex<Vec<(u32, String, Value)>>,
}

impl MockSimRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_launch_ok(self, output: LaunchOutput) -> Self {
        self.launch_results.lock().unwrap().push_back(Ok(output));
        self
    }

    pub fn with_launch_err(self, err: SimError) -> Self {
        self.launch_results.lock().unwrap().push_back(Err(err));
        self
    }

    pub fn with_terminate_results(self, results: impl IntoIterator<Item = bool>) -> Self {
        self.terminate_results.lock().unwrap().extend(results);
        self
    }

    pub fn with_status(self, status: SimStatus) -> Self {
        *self.status_result.lock().unwrap() = status;
        self
    }

    pub fn with_command_result(self, delivered: bool) -> Self {
        *self.command_result.lock().unwrap() = delivered;
        self
    }

    pub fn with_sims(self, sims: Vec<SimInfo>) -> Self {
        *self.sims.lock().unwrap() = sims;
        self
    }

    pub fn launch_call_count(&self) -> usize {
        self.launch_calls.load(Ordering::SeqCst)
    }

    pub fn terminate_call_count(&self) -> usize {
        self.terminate_calls.load(Ordering::SeqCst)
    }

    pub fn launched(&self) -> Vec<(String, Value)> {
        self.launched.lock().unwrap().clone()
    }

    pub fn terminated(&self) -> Vec<u32> {
        self.terminated.lock().unwrap().clone()
    }

    pub fn commands(&self) -> Vec<(u32, String, Value)> {
        self.commands.lock().unwrap().clone()
    }
}

impl SimRepository for MockSimRepository {
    fn launch(&self, client_id: &str, config: &Value) -> Result<LaunchOutput, SimError> {
        self.launch_calls.fetch_add(1, Ordering::SeqCst);
        self.launched
            .lock()
            .unwrap()
            .push((client_id.to_string(), config.clone()));
        self.launch_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Ok(LaunchOutput {
                    pid: 1234,
                    data_channel_id: "ch-1".to_string(),
                    artifact: "plot.svg".to_string(),
                })
            })
    }

    fn terminate(&self, pid: u32) -> bool {
        self.terminate_calls.fetch_add(1, Ordering::SeqCst);
        self.terminated.lock().unwrap().push(pid);
        self.terminate_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(true)
    }

    fn terminate_for_client(&self, _client_id: &str) -> Option<u32> {
        None
    }

    fn status(&self, _pid: u32) -> SimStatus {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        *self.status_result.lock().unwrap()
    }

    fn command(&self, pid: u32, command: &str, params: &Value) -> bool {
        self.command_calls.fetch_add(1, Ordering::SeqCst);
        self.commands
            .lock()
            .unwrap()
            .push((pid, command.to_string(), params.clone()));
        *self.command_result.lock().unwrap()
    }

    fn list(&self) -> Vec<SimInfo> {
        self.sims.lock().unwrap().clone()
    }

    fn process_count(&self) -> usize {
        self.sims.lock().unwrap().len()
    }
}
