//! Child-process handle for the warning dialog

use anyhow::{anyhow, Context, Result};
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::acknowledge;
use crate::constants::monitor::STOP_GRACE;

/// A running warning dialog whose stdout is watched for `SAFE`
pub struct WarningProcess {
    child: Option<Child>,
    acks: Receiver<()>,
}

impl WarningProcess {
    /// Run `<exe> warning`, normally our own executable
    pub fn spawn(exe: &Path) -> Result<Self> {
        let mut command = Command::new(exe);
        command.arg("warning");
        Self::spawn_command(command)
    }

    fn spawn_command(mut command: Command) -> Result<Self> {
        let mut child = command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .spawn()
            .context("failed to start warning dialog")?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| anyhow!("warning dialog stdout was not captured"))?;

        let (tx, acks) = mpsc::channel();
        let spawned = thread::Builder::new()
            .name("warning-listener".to_string())
            .spawn(move || listen(stdout, tx));
        if let Err(e) = spawned {
            let _ = child.kill();
            let _ = child.wait();
            return Err(e).context("failed to start warning listener");
        }

        info!(pid = child.id(), "warning started");
        Ok(Self {
            child: Some(child),
            acks,
        })
    }

    pub fn id(&self) -> Option<u32> {
        self.child.as_ref().map(Child::id)
    }

    /// Non-blocking check for the token
    pub fn try_acknowledged(&self) -> bool {
        self.acks.try_recv().is_ok()
    }

    /// Wait up to `timeout` for the token. Returns early if the dialog's stdout closes.
    pub fn wait_acknowledged(&self, timeout: Duration) -> bool {
        self.acks.recv_timeout(timeout).is_ok()
    }

    /// Terminate the dialog and reap it
    pub fn stop(&mut self) {
        self.stop_within(STOP_GRACE);
    }

    /// SIGTERM, then kill if the dialog is still running after `grace`
    fn stop_within(&mut self, grace: Duration) {
        let Some(mut child) = self.child.take() else {
            return;
        };
        terminate(&mut child);

        let deadline = Instant::now() + grace;
        loop {
            match child.try_wait() {
                Ok(Some(status)) => {
                    debug!(%status, "warning dialog exited");
                    return;
                }
                Ok(None) if Instant::now() < deadline => thread::sleep(Duration::from_millis(20)),
                Ok(None) => {
                    warn!(pid = child.id(), "warning dialog ignored SIGTERM, killing");
                    break;
                }
                Err(e) => {
                    error!(error = %e, "failed to poll warning dialog");
                    break;
                }
            }
        }

        let _ = child.kill();
        match child.wait() {
            Ok(status) => debug!(%status, "warning dialog killed"),
            Err(e) => error!(error = %e, "failed to reap warning dialog"),
        }
    }
}

impl Drop for WarningProcess {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Forward the first acknowledgment line, then stop reading
fn listen<R: Read>(reader: R, tx: Sender<()>) {
    for line in BufReader::new(reader).lines() {
        match line {
            Ok(line) if acknowledge::is_acknowledgment(&line) => {
                let _ = tx.send(());
                break;
            }
            Ok(line) => debug!(%line, "ignoring warning output"),
            Err(e) => {
                debug!(error = %e, "warning stdout closed");
                break;
            }
        }
    }
}

#[cfg(unix)]
fn terminate(child: &mut Child) {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let pid = Pid::from_raw(child.id() as i32);
    if let Err(e) = kill(pid, Signal::SIGTERM) {
        debug!(error = %e, "SIGTERM failed, killing warning dialog");
        let _ = child.kill();
    }
}

#[cfg(not(unix))]
fn terminate(child: &mut Child) {
    let _ = child.kill();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_listen_forwards_token_once() {
        let (tx, rx) = mpsc::channel();
        listen(Cursor::new("starting\nSAFE\nSAFE\n"), tx);
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_listen_without_token() {
        let (tx, rx) = mpsc::channel();
        listen(Cursor::new("hello\nworld\n"), tx);
        assert_eq!(rx.try_recv(), Err(mpsc::TryRecvError::Disconnected));
    }

    #[cfg(unix)]
    #[test]
    fn test_child_acknowledgment() {
        let mut command = Command::new("sh");
        command.args(["-c", "echo SAFE"]);
        let process = WarningProcess::spawn_command(command).unwrap();
        assert!(process.wait_acknowledged(Duration::from_secs(5)));
    }

    #[cfg(unix)]
    #[test]
    fn test_child_exit_without_token() {
        let mut command = Command::new("sh");
        command.args(["-c", "echo nope"]);
        let process = WarningProcess::spawn_command(command).unwrap();
        assert!(!process.wait_acknowledged(Duration::from_secs(5)));
    }

    #[cfg(unix)]
    #[test]
    fn test_stop_terminates_child() {
        let mut command = Command::new("sleep");
        command.arg("30");
        let mut process = WarningProcess::spawn_command(command).unwrap();
        assert!(process.id().is_some());
        process.stop();
        assert!(process.id().is_none());
        assert!(!process.try_acknowledged());
    }

    #[cfg(unix)]
    #[test]
    fn test_stop_kills_child_ignoring_sigterm() {
        // The ignored disposition survives exec, so sleep itself ignores SIGTERM
        let mut command = Command::new("sh");
        command.args(["-c", "trap '' TERM; exec sleep 30"]);
        let mut process = WarningProcess::spawn_command(command).unwrap();
        // Let the shell install the trap before signalling
        thread::sleep(Duration::from_millis(200));

        let start = Instant::now();
        process.stop_within(Duration::from_millis(300));
        assert!(process.id().is_none());
        assert!(start.elapsed() < Duration::from_secs(10));
    }
}
