use std::env;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_MAX_CONNECTIONS: usize = 64;
const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 300;
const DEFAULT_MAX_REQUEST_BYTES: usize = 1_048_576; // 1MB
const DEFAULT_TERMINATE_TIMEOUT_SECS: u64 = 5;
const DEFAULT_KILL_TIMEOUT_SECS: u64 = 2;
const DEFAULT_SIM_COMMAND: &str = "dendrite-sim";
const DEFAULT_ARTIFACT_NAME: &str = "plot.svg";

#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// Root under which per-client session dirs and temp configs live.
    pub data_dir: PathBuf,
    /// Simulator executable invoked once per launch.
    pub sim_command: String,
    /// Expected output file name inside the session directory.
    pub artifact_name: String,
    /// Graceful bound between SIGTERM and the SIGKILL escalation.
    pub terminate_timeout: Duration,
    /// Bound on the post-SIGKILL reap wait.
    pub kill_timeout: Duration,
    pub max_connections: usize,
    pub idle_timeout: Duration,
    pub max_request_bytes: usize,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

fn default_data_dir() -> PathBuf {
    env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
        .join(".dendrite")
}

impl DaemonConfig {
    pub fn from_env() -> Self {
        Self {
            data_dir: env::var("DENDRITE_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| default_data_dir()),
            sim_command: env::var("DENDRITE_SIM_CMD")
                .unwrap_or_else(|_| DEFAULT_SIM_COMMAND.to_string()),
            artifact_name: env::var("DENDRITE_ARTIFACT_NAME")
                .unwrap_or_else(|_| DEFAULT_ARTIFACT_NAME.to_string()),
            terminate_timeout: Duration::from_secs(
                env::var("DENDRITE_TERMINATE_TIMEOUT")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(DEFAULT_TERMINATE_TIMEOUT_SECS),
            ),
            kill_timeout: Duration::from_secs(
                env::var("DENDRITE_KILL_TIMEOUT")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(DEFAULT_KILL_TIMEOUT_SECS),
            ),
            max_connections: env::var("DENDRITE_MAX_CONNECTIONS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_MAX_CONNECTIONS),
            idle_timeout: Duration::from_secs(
                env::var("DENDRITE_IDLE_TIMEOUT")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(DEFAULT_IDLE_TIMEOUT_SECS),
            ),
            max_request_bytes: env::var("DENDRITE_MAX_REQUEST")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_MAX_REQUEST_BYTES),
        }
    }

    /// Per-client session directories live here.
    pub fn uploads_dir(&self) -> PathBuf {
        self.data_dir.join("user_uploads")
    }

    /// Temp config files written at launch live here.
    pub fn temp_config_dir(&self) -> PathBuf {
        self.data_dir.join("temp_configs")
    }

    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    pub fn with_sim_command(mut self, command: impl Into<String>) -> Self {
        self.sim_command = command.into();
        self
    }

    pub fn with_artifact_name(mut self, name: impl Into<String>) -> Self {
        self.artifact_name = name.into();
        self
    }

    pub fn with_terminate_timeout(mut self, timeout: Duration) -> Self {
        self.terminate_timeout = timeout;
        self
    }

    pub fn with_kill_timeout(mut self, timeout: Duration) -> Self {
        self.kill_timeout = timeout;
        self
    }

    pub fn with_max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }
}
