//! Process supervision: launch, preempt, terminate, status.
//!
//! The supervisor owns the Process Registry (pid -> record) and the
//! Client->Process Index (client id -> pid). For a given client the
//! index holds at most one pid, and that pid always exists in the
//! registry; launch enforces this by synchronously terminating the
//! client's prior process before spawning the new one.
//!
//! Lock ordering: launch_serial -> processes -> record mutex -> by_client.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::RwLock;
use std::time::Duration;

use chrono::DateTime;
use chrono::Utc;
use serde_json::Value;
use serde_json::json;
use tracing::debug;
use tracing::info;
use tracing::warn;
use uuid::Uuid;

use dendrite_common::mutex_lock_or_recover;
use dendrite_common::rwlock_read_or_recover;
use dendrite_common::rwlock_write_or_recover;
use dendrite_proc::{ChildHandle, ProcessLauncher, Signal, SpawnSpec};

use crate::config::DaemonConfig;
use crate::domain::{LaunchOutput, SimInfo, SimStatus};
use crate::error::SimError;
use crate::lock_helpers::{LOCK_TIMEOUT, try_lock_timeout};
use crate::sessions::SessionStore;
use crate::sleeper::Sleeper;
use crate::streamer::spawn_output_streamers;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// One spawned simulation, exclusively owned by the registry.
pub struct SimProcess {
    pub pid: u32,
    pub client_id: String,
    pub data_channel_id: String,
    pub artifact_name: String,
    pub temp_config_path: PathBuf,
    pub started_at: DateTime<Utc>,
    child: Box<dyn ChildHandle>,
}

impl SimProcess {
    fn is_running(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }
}

pub struct Supervisor {
    processes: RwLock<HashMap<u32, Arc<Mutex<SimProcess>>>>,
    by_client: RwLock<HashMap<String, u32>>,
    /// Serializes preempt+spawn+register so rapid repeated launches for
    /// one client can never interleave.
    launch_serial: Mutex<()>,
    launcher: Arc<dyn ProcessLauncher>,
    sessions: Arc<SessionStore>,
    sleeper: Arc<dyn Sleeper>,
    sim_command: String,
    artifact_name: String,
    temp_config_dir: PathBuf,
    terminate_timeout: Duration,
    kill_timeout: Duration,
}

fn config_is_present(config: &Value) -> bool {
    match config {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        Value::Object(map) => !map.is_empty(),
        _ => true,
    }
}

impl Supervisor {
    pub fn new(
        config: &DaemonConfig,
        launcher: Arc<dyn ProcessLauncher>,
        sessions: Arc<SessionStore>,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        Self {
            processes: RwLock::new(HashMap::new()),
            by_client: RwLock::new(HashMap::new()),
            launch_serial: Mutex::new(()),
            launcher,
            sessions,
            sleeper,
            sim_command: config.sim_command.clone(),
            artifact_name: config.artifact_name.clone(),
            temp_config_dir: config.temp_config_dir(),
            terminate_timeout: config.terminate_timeout,
            kill_timeout: config.kill_timeout,
        }
    }

    /// Launch a simulation for `client_id`, preempting any prior one.
    ///
    /// On spawn failure no registry entries are created and the temp
    /// config file is removed.
    pub fn launch(&self, client_id: &str, config: &Value) -> Result<LaunchOutput, SimError> {
        if !config_is_present(config) {
            return Err(SimError::invalid("config"));
        }
        // Validates the client id before any state is touched.
        self.sessions.dir_for(client_id)?;

        let _serial = mutex_lock_or_recover(&self.launch_serial);

        let prior = rwlock_read_or_recover(&self.by_client).get(client_id).copied();
        if let Some(old_pid) = prior {
            info!(client_id, old_pid, "preempting prior simulation");
            self.terminate(old_pid);
        }

        fs::create_dir_all(&self.temp_config_dir)
            .map_err(|e| SimError::session("create_temp_dir", e))?;
        let temp_config_path = self
            .temp_config_dir
            .join(format!("config_{}.json", Uuid::new_v4()));
        let body = serde_json::to_vec_pretty(config).map_err(|e| SimError::Session {
            operation: "encode_config".to_string(),
            reason: e.to_string(),
        })?;
        fs::write(&temp_config_path, body).map_err(|e| SimError::session("write_config", e))?;

        let session_dir = self.sessions.ensure(client_id)?;
        let data_channel_id = Uuid::new_v4().to_string();
        let artifact = self.artifact_name.clone();

        let spec = SpawnSpec::new(self.sim_command.as_str())
            .arg(temp_config_path.display().to_string())
            .arg("--artifact-file")
            .arg(session_dir.join(&artifact).display().to_string())
            .arg("--data-channel-id")
            .arg(data_channel_id.clone())
            .arg("--session-path")
            .arg(session_dir.display().to_string())
            .cwd(&session_dir);

        let mut child = match self.launcher.spawn(&spec) {
            Ok(child) => child,
            Err(e) => {
                if let Err(rm) = fs::remove_file(&temp_config_path) {
                    debug!(error = %rm, "could not remove temp config after failed spawn");
                }
                warn!(client_id, error = %e, "failed to launch simulation");
                return Err(SimError::Process(e));
            }
        };

        let pid = child.pid();
        spawn_output_streamers(pid, child.take_stdout(), child.take_stderr());

        let record = SimProcess {
            pid,
            client_id: client_id.to_string(),
            data_channel_id: data_channel_id.clone(),
            artifact_name: artifact.clone(),
            temp_config_path,
            started_at: Utc::now(),
            child,
        };
        rwlock_write_or_recover(&self.processes).insert(pid, Arc::new(Mutex::new(record)));
        rwlock_write_or_recover(&self.by_client).insert(client_id.to_string(), pid);

        info!(client_id, pid, channel = %data_channel_id, "launched simulation");
        Ok(LaunchOutput {
            pid,
            data_channel_id,
            artifact,
        })
    }

    /// Terminate a registered process. Idempotent: unknown pids return
    /// false without error.
    ///
    /// Tracking state is removed before any blocking OS work, so a
    /// misbehaving child can never leak registry entries. A child that
    /// ignores the graceful signal past the bound is forcefully killed.
    pub fn terminate(&self, pid: u32) -> bool {
        let record = {
            let mut processes = rwlock_write_or_recover(&self.processes);
            match processes.remove(&pid) {
                Some(record) => record,
                None => return false,
            }
        };

        let mut proc = mutex_lock_or_recover(&record);
        {
            let mut by_client = rwlock_write_or_recover(&self.by_client);
            if by_client.get(&proc.client_id) == Some(&pid) {
                by_client.remove(&proc.client_id);
            }
        }

        if proc.is_running() {
            info!(pid, client_id = %proc.client_id, "terminating simulation");
            if let Err(e) = proc.child.signal(Signal::Term) {
                warn!(pid, error = %e, "graceful signal failed");
            }
            if !self.wait_for_exit(&mut proc, self.terminate_timeout) {
                warn!(pid, "graceful termination timed out, escalating to kill");
                if let Err(e) = proc.child.signal(Signal::Kill) {
                    warn!(pid, error = %e, "forced kill failed");
                }
                if !self.wait_for_exit(&mut proc, self.kill_timeout) {
                    warn!(pid, "process survived forced kill");
                }
            }
        }

        if let Err(e) = fs::remove_file(&proc.temp_config_path) {
            debug!(pid, error = %e, "could not remove temp config");
        }
        info!(pid, "simulation deregistered");
        true
    }

    /// Terminate the client's active process, if any. Returns its pid.
    pub fn terminate_for_client(&self, client_id: &str) -> Option<u32> {
        let pid = rwlock_read_or_recover(&self.by_client).get(client_id).copied()?;
        self.terminate(pid);
        Some(pid)
    }

    /// Lifecycle state of a pid. Once the process has exited, artifact
    /// existence in the owner's session dir decides completed vs error.
    pub fn status(&self, pid: u32) -> SimStatus {
        let record = rwlock_read_or_recover(&self.processes).get(&pid).cloned();
        let Some(record) = record else {
            return SimStatus::NotFound;
        };

        let mut proc = mutex_lock_or_recover(&record);
        match proc.child.try_wait() {
            Ok(None) => SimStatus::Running,
            Ok(Some(_)) | Err(_) => {
                if self
                    .sessions
                    .artifact_exists(&proc.client_id, &proc.artifact_name)
                {
                    SimStatus::Completed
                } else {
                    SimStatus::CompletedError
                }
            }
        }
    }

    /// Relay an interactive command to a running process's stdin as one
    /// JSON line. Unknown pids and exited processes drop the command
    /// silently; the return value only feeds logging and metrics.
    pub fn command(&self, pid: u32, command: &str, params: &Value) -> bool {
        let record = rwlock_read_or_recover(&self.processes).get(&pid).cloned();
        let Some(record) = record else {
            debug!(pid, command, "command for unknown pid dropped");
            return false;
        };

        let mut proc = mutex_lock_or_recover(&record);
        if !proc.is_running() {
            debug!(pid, command, "command for exited process dropped");
            return false;
        }

        let line = json!({ "command": command, "params": params }).to_string();
        match proc.child.write_stdin_line(&line) {
            Ok(()) => {
                debug!(pid, command, "command relayed");
                true
            }
            Err(e) => {
                warn!(pid, command, error = %e, "command relay failed");
                false
            }
        }
    }

    /// Pid the index holds for a client, if any.
    pub fn active_pid(&self, client_id: &str) -> Option<u32> {
        rwlock_read_or_recover(&self.by_client).get(client_id).copied()
    }

    pub fn process_count(&self) -> usize {
        rwlock_read_or_recover(&self.processes).len()
    }

    pub fn list(&self) -> Vec<SimInfo> {
        let records: Vec<(u32, Arc<Mutex<SimProcess>>)> = {
            let processes = rwlock_read_or_recover(&self.processes);
            processes
                .iter()
                .map(|(pid, record)| (*pid, Arc::clone(record)))
                .collect()
        };

        records
            .into_iter()
            .map(|(pid, record)| match try_lock_timeout(&record, LOCK_TIMEOUT) {
                Some(mut proc) => SimInfo {
                    pid,
                    client_id: proc.client_id.clone(),
                    data_channel_id: proc.data_channel_id.clone(),
                    running: proc.is_running(),
                    started_at: proc.started_at.to_rfc3339(),
                },
                // Record busy (terminate in flight); report it as still
                // running rather than blocking the listing.
                None => SimInfo {
                    pid,
                    client_id: "(busy)".to_string(),
                    data_channel_id: String::new(),
                    running: true,
                    started_at: String::new(),
                },
            })
            .collect()
    }

    /// Terminate everything; used on daemon shutdown.
    pub fn shutdown_all(&self) {
        let pids: Vec<u32> = rwlock_read_or_recover(&self.processes).keys().copied().collect();
        for pid in pids {
            self.terminate(pid);
        }
    }

    fn wait_for_exit(&self, proc: &mut SimProcess, timeout: Duration) -> bool {
        // Iteration-count based so a mock sleeper terminates the loop.
        let attempts = (timeout.as_millis() / POLL_INTERVAL.as_millis()).max(1);
        for _ in 0..attempts {
            match proc.child.try_wait() {
                Ok(Some(_)) => return true,
                Ok(None) => {}
                Err(e) => {
                    warn!(pid = proc.pid, error = %e, "poll failed during wait");
                    return false;
                }
            }
            self.sleeper.sleep(POLL_INTERVAL);
        }
        matches!(proc.child.try_wait(), Ok(Some(_)))
    }
}
