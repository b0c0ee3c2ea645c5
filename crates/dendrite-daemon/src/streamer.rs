//! Output streamers.
//!
//! Each spawned process gets two reader threads, one per stream, so the
//! child can never block on a full pipe buffer. A reader drains its
//! stream line by line, logging each line tagged with the pid and stream
//! name, and exits when the stream closes on process exit. Readers run
//! entirely outside the request path.

use std::io::BufRead;
use std::io::BufReader;
use std::io::Read;
use std::thread;
use std::thread::JoinHandle;

use tracing::debug;
use tracing::info;
use tracing::warn;

/// Drain a stream line by line into `on_line` until EOF.
///
/// Lines with invalid UTF-8 are dropped (logged) rather than killing the
/// reader; the stream keeps draining either way.
fn drain_lines<R: BufRead>(pid: u32, stream_name: &str, reader: R, mut on_line: impl FnMut(&str)) {
    for line in reader.lines() {
        match line {
            Ok(line) => on_line(line.trim_end()),
            Err(e) => {
                warn!(pid, stream = stream_name, error = %e, "stream read error");
                break;
            }
        }
    }
    debug!(pid, stream = stream_name, "stream finished");
}

/// Spawn the reader thread for one stream.
pub fn spawn_stream_reader(
    pid: u32,
    stream_name: &'static str,
    stream: Box<dyn Read + Send>,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name(format!("sim-{}-{}", stream_name, pid))
        .spawn(move || {
            let reader = BufReader::new(stream);
            drain_lines(pid, stream_name, reader, |line| {
                info!(target: "dendrite::sim", pid, stream = stream_name, "{}", line);
            });
        })
}

/// Spawn readers for both output streams of a child.
///
/// A missing stream (already taken, or the launcher gave none) is
/// logged and skipped; supervision continues without it.
pub fn spawn_output_streamers(
    pid: u32,
    stdout: Option<Box<dyn Read + Send>>,
    stderr: Option<Box<dyn Read + Send>>,
) {
    for (name, stream) in [("stdout", stdout), ("stderr", stderr)] {
        match stream {
            Some(stream) => {
                if let Err(e) = spawn_stream_reader(pid, name, stream) {
                    warn!(pid, stream = name, error = %e, "failed to spawn stream reader");
                }
            }
            None => warn!(pid, stream = name, "no stream to drain"),
        }
    }
}
