//! Spawning and controlling external simulation processes.
//!
//! The daemon talks to children through the `ProcessLauncher`/`ChildHandle`
//! pair so supervision logic can run against scripted fakes in tests. The
//! production implementation wraps `std::process` with piped stdin (the
//! command channel), stdout, and stderr; stdout and stderr stay separate
//! streams so the output readers can tag lines by source.

use std::io::Read;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};

use crate::error::ProcError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Term,
    Kill,
}

/// Everything needed to start one simulation process.
#[derive(Debug, Clone)]
pub struct SpawnSpec {
    pub command: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub env: Vec<(String, String)>,
}

impl SpawnSpec {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            cwd: None,
            env: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }
}

/// A live child process.
///
/// `take_stdout`/`take_stderr` hand the pipe read halves to the caller
/// exactly once; the handle keeps stdin for the command channel.
pub trait ChildHandle: Send {
    fn pid(&self) -> u32;

    /// `Ok(Some(code))` once the process has exited, `Ok(None)` while it
    /// is still running. Never blocks.
    fn try_wait(&mut self) -> Result<Option<i32>, ProcError>;

    fn signal(&mut self, signal: Signal) -> Result<(), ProcError>;

    /// Write one line to the child's stdin and flush immediately so the
    /// child observes it without buffering delay.
    fn write_stdin_line(&mut self, line: &str) -> Result<(), ProcError>;

    fn take_stdout(&mut self) -> Option<Box<dyn Read + Send>>;

    fn take_stderr(&mut self) -> Option<Box<dyn Read + Send>>;
}

pub trait ProcessLauncher: Send + Sync {
    fn spawn(&self, spec: &SpawnSpec) -> Result<Box<dyn ChildHandle>, ProcError>;
}

/// Production launcher over `std::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsProcessLauncher;

impl ProcessLauncher for OsProcessLauncher {
    fn spawn(&self, spec: &SpawnSpec) -> Result<Box<dyn ChildHandle>, ProcError> {
        let mut command = Command::new(&spec.command);
        command
            .args(&spec.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        if let Some(cwd) = &spec.cwd {
            command.current_dir(cwd);
        }
        for (key, value) in &spec.env {
            command.env(key, value);
        }

        let child = command.spawn().map_err(|e| ProcError::Spawn(e.to_string()))?;
        Ok(Box::new(OsChild { child }))
    }
}

struct OsChild {
    child: Child,
}

impl ChildHandle for OsChild {
    fn pid(&self) -> u32 {
        self.child.id()
    }

    fn try_wait(&mut self) -> Result<Option<i32>, ProcError> {
        match self.child.try_wait() {
            // A signal-terminated child has no exit code; report -1.
            Ok(Some(status)) => Ok(Some(status.code().unwrap_or(-1))),
            Ok(None) => Ok(None),
            Err(e) => Err(ProcError::Wait(e.to_string())),
        }
    }

    fn signal(&mut self, signal: Signal) -> Result<(), ProcError> {
        let pid = self.pid();
        let pid_t: libc::pid_t = pid.try_into().map_err(|_| ProcError::Signal {
            pid,
            reason: "PID out of range".to_string(),
        })?;

        let sig = match signal {
            Signal::Term => libc::SIGTERM,
            Signal::Kill => libc::SIGKILL,
        };

        let result = unsafe { libc::kill(pid_t, sig) };
        if result == 0 {
            return Ok(());
        }

        let err = std::io::Error::last_os_error();
        // ESRCH means the process is already gone, which is what the
        // caller wanted.
        if err.raw_os_error() == Some(libc::ESRCH) {
            return Ok(());
        }
        Err(ProcError::Signal {
            pid,
            reason: err.to_string(),
        })
    }

    fn write_stdin_line(&mut self, line: &str) -> Result<(), ProcError> {
        let stdin = self
            .child
            .stdin
            .as_mut()
            .ok_or_else(|| ProcError::Stdin("stdin already closed".to_string()))?;
        writeln!(stdin, "{}", line).map_err(|e| ProcError::Stdin(e.to_string()))?;
        stdin.flush().map_err(|e| ProcError::Stdin(e.to_string()))
    }

    fn take_stdout(&mut self) -> Option<Box<dyn Read + Send>> {
        self.child
            .stdout
            .take()
            .map(|s| Box::new(s) as Box<dyn Read + Send>)
    }

    fn take_stderr(&mut self) -> Option<Box<dyn Read + Send>> {
        self.child
            .stderr
            .take()
            .map(|s| Box::new(s) as Box<dyn Read + Send>)
    }
}
