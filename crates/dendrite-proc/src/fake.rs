//! Scripted launcher and child for supervisor tests.
//!
//! Public (not `#[cfg(test)]`) so the daemon crate's unit tests can drive
//! supervision logic without spawning real OS processes.

use std::collections::VecDeque;
use std::io::Cursor;
use std::io::Read;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::error::ProcError;
use crate::launcher::{ChildHandle, ProcessLauncher, Signal, SpawnSpec};

/// Behavior of the next fake child a `FakeLauncher` hands out.
#[derive(Debug, Clone, Default)]
pub struct FakeChildScript {
    /// Exit code reported once the child "exits"; `None` keeps it running
    /// until signalled.
    pub exit_code: Option<i32>,
    /// Ignore `Signal::Term` (simulates a child trapping SIGTERM).
    pub ignore_term: bool,
    /// Bytes served from the child's stdout/stderr pipes.
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

/// Observable state of one fake child, shared with the test.
#[derive(Debug)]
pub struct FakeChildState {
    pub pid: u32,
    exited: Mutex<Option<i32>>,
    ignore_term: bool,
    signals: Mutex<Vec<Signal>>,
    stdin_lines: Mutex<Vec<String>>,
}

impl FakeChildState {
    pub fn signals(&self) -> Vec<Signal> {
        self.signals.lock().unwrap().clone()
    }

    pub fn stdin_lines(&self) -> Vec<String> {
        self.stdin_lines.lock().unwrap().clone()
    }

    pub fn is_exited(&self) -> bool {
        self.exited.lock().unwrap().is_some()
    }

    /// Mark the child exited out-of-band, as if it finished on its own.
    pub fn exit_with(&self, code: i32) {
        *self.exited.lock().unwrap() = Some(code);
    }
}

pub struct FakeChild {
    state: Arc<FakeChildState>,
    stdout: Option<Box<dyn Read + Send>>,
    stderr: Option<Box<dyn Read + Send>>,
}

impl ChildHandle for FakeChild {
    fn pid(&self) -> u32 {
        self.state.pid
    }

    fn try_wait(&mut self) -> Result<Option<i32>, ProcError> {
        Ok(*self.state.exited.lock().unwrap())
    }

    fn signal(&mut self, signal: Signal) -> Result<(), ProcError> {
        self.state.signals.lock().unwrap().push(signal);
        match signal {
            Signal::Term if self.state.ignore_term => {}
            Signal::Term => {
                let mut exited = self.state.exited.lock().unwrap();
                exited.get_or_insert(0);
            }
            Signal::Kill => {
                let mut exited = self.state.exited.lock().unwrap();
                exited.get_or_insert(-1);
            }
        }
        Ok(())
    }

    fn write_stdin_line(&mut self, line: &str) -> Result<(), ProcError> {
        if self.state.is_exited() {
            return Err(ProcError::Stdin("stdin already closed".to_string()));
        }
        self.state.stdin_lines.lock().unwrap().push(line.to_string());
        Ok(())
    }

    fn take_stdout(&mut self) -> Option<Box<dyn Read + Send>> {
        self.stdout.take()
    }

    fn take_stderr(&mut self) -> Option<Box<dyn Read + Send>> {
        self.stderr.take()
    }
}

/// Launcher that hands out scripted children and records every spawn.
#[derive(Default)]
pub struct FakeLauncher {
    next_pid: AtomicU32,
    scripts: Mutex<VecDeque<FakeChildScript>>,
    fail_next: Mutex<Option<String>>,
    spawned: Mutex<Vec<(SpawnSpec, Arc<FakeChildState>)>>,
}

impl FakeLauncher {
    pub fn new() -> Self {
        Self {
            next_pid: AtomicU32::new(1000),
            ..Self::default()
        }
    }

    /// Queue the behavior of the next spawned child. Unqueued spawns get
    /// a default long-running child.
    pub fn push_script(&self, script: FakeChildScript) {
        self.scripts.lock().unwrap().push_back(script);
    }

    /// Make the next spawn fail with the given OS-style reason.
    pub fn fail_next_spawn(&self, reason: impl Into<String>) {
        *self.fail_next.lock().unwrap() = Some(reason.into());
    }

    pub fn spawn_count(&self) -> usize {
        self.spawned.lock().unwrap().len()
    }

    pub fn spawn_specs(&self) -> Vec<SpawnSpec> {
        self.spawned
            .lock()
            .unwrap()
            .iter()
            .map(|(spec, _)| spec.clone())
            .collect()
    }

    pub fn children(&self) -> Vec<Arc<FakeChildState>> {
        self.spawned
            .lock()
            .unwrap()
            .iter()
            .map(|(_, state)| Arc::clone(state))
            .collect()
    }
}

impl ProcessLauncher for FakeLauncher {
    fn spawn(&self, spec: &SpawnSpec) -> Result<Box<dyn ChildHandle>, ProcError> {
        if let Some(reason) = self.fail_next.lock().unwrap().take() {
            return Err(ProcError::Spawn(reason));
        }

        let script = self.scripts.lock().unwrap().pop_front().unwrap_or_default();
        let state = Arc::new(FakeChildState {
            pid: self.next_pid.fetch_add(1, Ordering::SeqCst),
            exited: Mutex::new(script.exit_code),
            ignore_term: script.ignore_term,
            signals: Mutex::new(Vec::new()),
            stdin_lines: Mutex::new(Vec::new()),
        });

        self.spawned
            .lock()
            .unwrap()
            .push((spec.clone(), Arc::clone(&state)));

        Ok(Box::new(FakeChild {
            state,
            stdout: Some(Box::new(Cursor::new(script.stdout))),
            stderr: Some(Box::new(Cursor::new(script.stderr))),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_child_runs_until_term() {
        let launcher = FakeLauncher::new();
        let mut child = launcher.spawn(&SpawnSpec::new("sim")).unwrap();

        assert_eq!(child.try_wait().unwrap(), None);
        child.signal(Signal::Term).unwrap();
        assert_eq!(child.try_wait().unwrap(), Some(0));
    }

    #[test]
    fn test_term_resistant_child_needs_kill() {
        let launcher = FakeLauncher::new();
        launcher.push_script(FakeChildScript {
            ignore_term: true,
            ..Default::default()
        });
        let mut child = launcher.spawn(&SpawnSpec::new("sim")).unwrap();

        child.signal(Signal::Term).unwrap();
        assert_eq!(child.try_wait().unwrap(), None);
        child.signal(Signal::Kill).unwrap();
        assert_eq!(child.try_wait().unwrap(), Some(-1));
    }

    #[test]
    fn test_fail_next_spawn() {
        let launcher = FakeLauncher::new();
        launcher.fail_next_spawn("No such file or directory");
        assert!(launcher.spawn(&SpawnSpec::new("sim")).is_err());
        // Failure is one-shot.
        assert!(launcher.spawn(&SpawnSpec::new("sim")).is_ok());
        assert_eq!(launcher.spawn_count(), 1);
    }

    #[test]
    fn test_stdin_recorded_until_exit() {
        let launcher = FakeLauncher::new();
        let mut child = launcher.spawn(&SpawnSpec::new("sim")).unwrap();

        child.write_stdin_line(r#"{"command":"pause"}"#).unwrap();
        child.signal(Signal::Term).unwrap();
        assert!(child.write_stdin_line("late").is_err());

        let state = &launcher.children()[0];
        assert_eq!(state.stdin_lines(), vec![r#"{"command":"pause"}"#]);
    }
}
