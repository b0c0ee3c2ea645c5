//! End-to-end tests over a real Unix socket: client connections, RPC
//! dispatch, pub/sub relay, and disconnect cleanup.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use serde_json::json;

use dendrite_daemon::{DaemonConfig, DaemonServer, UnixSocketListener};
use dendrite_ipc::error_codes;
use dendrite_ipc::{ClientError, DaemonClient, Event};

struct TestDaemon {
    tmp: tempfile::TempDir,
    socket: PathBuf,
    shutdown: Arc<AtomicBool>,
    serve_thread: Option<JoinHandle<()>>,
}

fn write_script(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("sim.sh");
    fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

impl TestDaemon {
    fn start(sim_body: &str) -> Self {
        let tmp = tempfile::tempdir().unwrap();
        let script = write_script(tmp.path(), sim_body);
        let socket = tmp.path().join("dendrite.sock");

        let config = DaemonConfig::from_env()
            .with_data_dir(tmp.path().join("data"))
            .with_sim_command(script.display().to_string())
            .with_terminate_timeout(Duration::from_secs(1))
            .with_kill_timeout(Duration::from_secs(1))
            .with_max_connections(4)
            .with_idle_timeout(Duration::from_secs(10));

        let server = Arc::new(DaemonServer::with_config(config));
        let listener = UnixSocketListener::bind(&socket).unwrap();
        let shutdown = Arc::new(AtomicBool::new(false));
        let serve_shutdown = Arc::clone(&shutdown);
        let serve_thread = std::thread::spawn(move || {
            server.serve(listener, serve_shutdown).unwrap();
        });

        Self {
            tmp,
            socket,
            shutdown,
            serve_thread: Some(serve_thread),
        }
    }

    fn client(&self) -> DaemonClient {
        DaemonClient::connect_to(&self.socket).unwrap()
    }

    fn session_dir(&self, client_id: &str) -> PathBuf {
        self.tmp.path().join("data/user_uploads").join(client_id)
    }
}

impl Drop for TestDaemon {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(handle) = self.serve_thread.take() {
            let _ = handle.join();
        }
    }
}

fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(50));
    }
    false
}

#[test]
fn ping_health_and_unknown_method() {
    let daemon = TestDaemon::start("exec sleep 30");
    let mut client = daemon.client();

    let pong = client.call("ping", None).unwrap();
    assert_eq!(pong["pong"], true);

    let health = client.call("health", None).unwrap();
    assert_eq!(health["status"], "ok");
    assert_eq!(health["sims"], 0);

    let err = client.call("no_such_method", None).unwrap_err();
    match err {
        ClientError::Rpc { code, .. } => assert_eq!(code, error_codes::METHOD_NOT_FOUND),
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn launch_command_terminate_scenario() {
    // Simulator that stays alive consuming commands on stdin.
    let daemon = TestDaemon::start("while read line; do :; done");
    let mut client = daemon.client();

    let launched = client
        .call(
            "launch",
            Some(json!({ "client_id": "u1", "config": {"steps": 10} })),
        )
        .unwrap();
    let pid = launched["pid"].as_u64().unwrap();
    assert!(launched["data_channel_id"].as_str().unwrap().len() > 8);

    let status = client.call("status", Some(json!({ "pid": pid }))).unwrap();
    assert_eq!(status["status"], "running");

    let relayed = client
        .call(
            "sim_command",
            Some(json!({ "pid": pid, "command": "pause", "params": {} })),
        )
        .unwrap();
    assert_eq!(relayed["delivered"], true);

    let terminated = client.call("terminate", Some(json!({ "pid": pid }))).unwrap();
    assert_eq!(terminated["terminated"], true);

    let err = client.call("status", Some(json!({ "pid": pid }))).unwrap_err();
    match err {
        ClientError::Rpc { code, .. } => assert_eq!(code, error_codes::SIM_NOT_FOUND),
        other => panic!("unexpected error: {}", other),
    }

    // Terminate stays idempotent through the RPC surface.
    let again = client.call("terminate", Some(json!({ "pid": pid }))).unwrap();
    assert_eq!(again["terminated"], false);
}

#[test]
fn launch_rejects_missing_fields() {
    let daemon = TestDaemon::start("exec sleep 30");
    let mut client = daemon.client();

    let err = client
        .call("launch", Some(json!({ "config": {"steps": 1} })))
        .unwrap_err();
    match err {
        ClientError::Rpc { code, .. } => assert_eq!(code, error_codes::INVALID_REQUEST),
        other => panic!("unexpected error: {}", other),
    }

    let err = client
        .call("launch", Some(json!({ "client_id": "u1" })))
        .unwrap_err();
    match err {
        ClientError::Rpc { code, .. } => assert_eq!(code, error_codes::INVALID_REQUEST),
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn push_relays_to_joined_connections() {
    let daemon = TestDaemon::start("exec sleep 30");
    let mut watcher = daemon.client();
    let mut publisher = daemon.client();

    // Publishing before anyone joined drops the payload silently.
    let dropped = publisher
        .call(
            "push",
            Some(json!({ "data_channel_id": "ch-test", "payload": {"t": 0} })),
        )
        .unwrap();
    assert_eq!(dropped["delivered"], 0);

    watcher
        .call("join_channel", Some(json!({ "data_channel_id": "ch-test" })))
        .unwrap();

    let pushed = publisher
        .call(
            "push",
            Some(json!({ "data_channel_id": "ch-test", "payload": {"t": 1, "vm": -65.0} })),
        )
        .unwrap();
    assert_eq!(pushed["delivered"], 1);

    let event = watcher.read_event().unwrap();
    match event {
        Event::SimulationData {
            data_channel_id,
            payload,
        } => {
            assert_eq!(data_channel_id, "ch-test");
            assert_eq!(payload, json!({"t": 1, "vm": -65.0}));
        }
    }
}

#[test]
fn push_requires_payload() {
    let daemon = TestDaemon::start("exec sleep 30");
    let mut client = daemon.client();

    let err = client
        .call("push", Some(json!({ "data_channel_id": "ch" })))
        .unwrap_err();
    match err {
        ClientError::Rpc { code, .. } => assert_eq!(code, error_codes::INVALID_REQUEST),
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn disconnect_cleans_session_process_and_index() {
    let daemon = TestDaemon::start("exec sleep 30");

    let mut registered = daemon.client();
    registered
        .call("register_client", Some(json!({ "client_id": "abc" })))
        .unwrap();
    let launched = registered
        .call(
            "launch",
            Some(json!({ "client_id": "abc", "config": {"steps": 10} })),
        )
        .unwrap();
    let pid = launched["pid"].as_u64().unwrap();
    assert!(daemon.session_dir("abc").exists());

    // Closing the registered connection triggers cleanup.
    drop(registered);

    assert!(wait_until(Duration::from_secs(10), || {
        !daemon.session_dir("abc").exists()
    }));

    let mut observer = daemon.client();
    assert!(wait_until(Duration::from_secs(10), || {
        matches!(
            observer.call("status", Some(json!({ "pid": pid }))),
            Err(ClientError::Rpc { code, .. }) if code == error_codes::SIM_NOT_FOUND
        )
    }));

    let health = observer.call("health", None).unwrap();
    assert_eq!(health["sims"], 0);
}

#[test]
fn unregistered_disconnect_is_a_noop() {
    let daemon = TestDaemon::start("exec sleep 30");

    let mut transient = daemon.client();
    transient
        .call("join_channel", Some(json!({ "data_channel_id": "ch-z" })))
        .unwrap();
    drop(transient);

    // The daemon keeps serving and no state was disturbed.
    let mut client = daemon.client();
    let health = client.call("health", None).unwrap();
    assert_eq!(health["status"], "ok");
    assert_eq!(health["sims"], 0);
}
