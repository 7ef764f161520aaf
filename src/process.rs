//! Subprocess plumbing: fire-and-forget launches and bounded output capture.

use std::ffi::OsStr;
use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::{Error, Result};

/// Spawn a child process and drop the handle without waiting on it.
///
/// The child outlives this program if it wants to; nothing supervises it
/// after the spawn succeeds.
pub fn spawn_detached<I, S>(program: &Path, args: I) -> Result<()>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    Command::new(program)
        .args(args)
        .spawn()
        .map(|_child| ())
        .map_err(|source| Error::Launch {
            program: program.to_path_buf(),
            source,
        })
}

/// Run a command and capture its combined stdout/stderr text, killing the
/// child if it outlives `budget`.
///
/// Both pipes are drained on reader threads so the child can never block on
/// a full pipe while the deadline loop waits on it. Returns `None` on spawn
/// failure, timeout, or a wait error.
pub fn capture_with_timeout<I, S>(program: &Path, args: I, budget: Duration) -> Option<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .ok()?;

    let mut stdout = child.stdout.take()?;
    let mut stderr = child.stderr.take()?;
    let out_reader = thread::spawn(move || {
        let mut buf = String::new();
        let _ = stdout.read_to_string(&mut buf);
        buf
    });
    let err_reader = thread::spawn(move || {
        let mut buf = String::new();
        let _ = stderr.read_to_string(&mut buf);
        buf
    });

    let deadline = Instant::now() + budget;
    let finished = loop {
        match child.try_wait() {
            Ok(Some(_status)) => break true,
            Ok(None) if Instant::now() >= deadline => break false,
            Ok(None) => thread::sleep(Duration::from_millis(25)),
            Err(_) => break false,
        }
    };
    if !finished {
        log::warn!("{} did not finish within {:?}, killing it", program.display(), budget);
        let _ = child.kill();
    }
    let _ = child.wait();

    let mut combined = out_reader.join().ok()?;
    combined.push_str(&err_reader.join().ok()?);
    if finished {
        Some(combined)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    fn sh() -> &'static Path {
        Path::new("/bin/sh")
    }

    #[cfg(unix)]
    #[test]
    fn captures_stdout() {
        let out = capture_with_timeout(sh(), ["-c", "echo hello"], Duration::from_secs(5));
        assert!(out.expect("capture failed").contains("hello"));
    }

    #[cfg(unix)]
    #[test]
    fn captures_stderr_too() {
        let out = capture_with_timeout(sh(), ["-c", "echo oops >&2"], Duration::from_secs(5));
        assert!(out.expect("capture failed").contains("oops"));
    }

    #[cfg(unix)]
    #[test]
    fn kills_child_past_the_budget() {
        let started = Instant::now();
        let out = capture_with_timeout(sh(), ["-c", "sleep 30"], Duration::from_millis(200));
        assert!(out.is_none());
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn spawn_failure_reports_the_program() {
        let missing = Path::new("/no/such/binary");
        let err = spawn_detached(missing, ["--help"]).unwrap_err();
        match err {
            Error::Launch { program, .. } => assert_eq!(program, missing),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn detached_spawn_returns_immediately() {
        spawn_detached(sh(), ["-c", "sleep 0"]).expect("spawn failed");
    }
}
