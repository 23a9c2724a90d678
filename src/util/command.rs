//! Bounded runner for read-only system commands.
//!
//! Captures raw stdout/stderr without interpreting them. The runner never
//! fails: spawn errors end up in `stderr`, commands exceeding the timeout
//! are killed, and oversized output is cut with an explicit marker.

use std::io::Read;
use std::process::{Command, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use crate::storage::model::FactValue;

const POLL_INTERVAL: Duration = Duration::from_millis(10);
/// How long to wait for pipes to drain once the child is gone. Grandchildren
/// can hold a pipe open after the direct child is killed.
const DRAIN_GRACE: Duration = Duration::from_millis(200);

/// Limits applied to every command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandLimits {
    pub timeout: Duration,
    pub max_stdout_chars: usize,
    pub max_stderr_chars: usize,
}

impl Default for CommandLimits {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(4),
            max_stdout_chars: 200_000,
            max_stderr_chars: 50_000,
        }
    }
}

/// Raw result of one command.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandCapture {
    pub argv: Vec<String>,
    /// Exit code; `None` on timeout, spawn failure or signal.
    pub rc: Option<i32>,
    pub timed_out: bool,
    pub stdout: String,
    pub stderr: String,
    pub stdout_truncated: bool,
    pub stderr_truncated: bool,
    /// Length in characters before truncation.
    pub stdout_len: usize,
    pub stderr_len: usize,
}

impl From<CommandCapture> for FactValue {
    fn from(c: CommandCapture) -> Self {
        FactValue::map([
            ("argv", FactValue::from(c.argv)),
            ("rc", FactValue::from(c.rc)),
            ("timeout", FactValue::from(c.timed_out)),
            ("stdout", FactValue::from(c.stdout)),
            ("stderr", FactValue::from(c.stderr)),
            ("stdout_truncated", FactValue::from(c.stdout_truncated)),
            ("stderr_truncated", FactValue::from(c.stderr_truncated)),
            ("stdout_len", FactValue::from(c.stdout_len)),
            ("stderr_len", FactValue::from(c.stderr_len)),
        ])
    }
}

/// Text cut to a character budget.
#[derive(Debug, Clone, PartialEq)]
pub struct Truncated {
    pub text: String,
    pub truncated: bool,
    pub original_len: usize,
}

/// Cuts `s` to `max_chars` characters, appending a marker when cut.
pub fn truncate_text(s: &str, max_chars: usize) -> Truncated {
    let original_len = s.chars().count();
    if max_chars == 0 {
        return Truncated {
            text: String::new(),
            truncated: original_len > 0,
            original_len,
        };
    }
    if original_len <= max_chars {
        return Truncated {
            text: s.to_string(),
            truncated: false,
            original_len,
        };
    }

    let mut text: String = s.chars().take(max_chars).collect();
    text.push_str(&format!(
        "\n[TRUNCATED] original_len={} max_chars={}\n",
        original_len, max_chars
    ));
    Truncated {
        text,
        truncated: true,
        original_len,
    }
}

/// Runs `argv` with `limits` and returns its bounded capture.
pub fn run_command(argv: &[&str], limits: &CommandLimits) -> CommandCapture {
    let argv_owned: Vec<String> = argv.iter().map(|s| s.to_string()).collect();

    let Some((program, args)) = argv.split_first() else {
        return failed_capture(argv_owned, "empty argv".to_string(), limits);
    };

    let spawned = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn();

    let mut child = match spawned {
        Ok(child) => child,
        Err(e) => return failed_capture(argv_owned, format!("{}: {}", program, e), limits),
    };

    let stdout_rx = drain(child.stdout.take());
    let stderr_rx = drain(child.stderr.take());

    let deadline = Instant::now() + limits.timeout;
    let mut timed_out = false;
    let rc = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status.code(),
            Ok(None) if Instant::now() >= deadline => {
                timed_out = true;
                let _ = child.kill();
                let _ = child.wait();
                break None;
            }
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(_) => {
                let _ = child.kill();
                let _ = child.wait();
                break None;
            }
        }
    };

    let stdout = String::from_utf8_lossy(&stdout_rx.recv_timeout(DRAIN_GRACE).unwrap_or_default())
        .into_owned();
    let stderr = String::from_utf8_lossy(&stderr_rx.recv_timeout(DRAIN_GRACE).unwrap_or_default())
        .into_owned();

    let out = truncate_text(&stdout, limits.max_stdout_chars);
    let err = truncate_text(&stderr, limits.max_stderr_chars);

    CommandCapture {
        argv: argv_owned,
        rc,
        timed_out,
        stdout: out.text,
        stderr: err.text,
        stdout_truncated: out.truncated,
        stderr_truncated: err.truncated,
        stdout_len: out.original_len,
        stderr_len: err.original_len,
    }
}

/// Runs each command in order and returns the captures as a fact list.
pub fn capture_all(commands: &[&[&str]], limits: &CommandLimits) -> FactValue {
    FactValue::List(
        commands
            .iter()
            .map(|argv| run_command(argv, limits).into())
            .collect(),
    )
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> mpsc::Receiver<Vec<u8>> {
    let (tx, rx) = mpsc::channel();
    if let Some(mut pipe) = pipe {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            let _ = tx.send(buf);
        });
    }
    rx
}

fn failed_capture(argv: Vec<String>, message: String, limits: &CommandLimits) -> CommandCapture {
    let err = truncate_text(&message, limits.max_stderr_chars);
    CommandCapture {
        argv,
        rc: None,
        timed_out: false,
        stdout: String::new(),
        stderr: err.text,
        stdout_truncated: false,
        stderr_truncated: err.truncated,
        stdout_len: 0,
        stderr_len: err.original_len,
    }
}
