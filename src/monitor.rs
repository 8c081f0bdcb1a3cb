//! Idle monitor - polls idle time, raises the warning, reacts to intrusions

use anyhow::{Context, Result};
use chrono::Local;
use std::io::{self, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::actions;
use crate::config::MonitorConfig;
use crate::idle::{self, IdleSource};
use crate::tracker::{Tracker, Verdict};
use crate::warning::WarningProcess;

/// Owns the running dialog (if any) alongside the tracker
struct Monitor<W: Write> {
    config: MonitorConfig,
    tracker: Tracker,
    source: Box<dyn IdleSource>,
    warning: Option<WarningProcess>,
    exe: std::path::PathBuf,
    /// Console status line; stdout outside tests
    status: W,
}

impl<W: Write> Monitor<W> {
    fn tick(&mut self) {
        let idle = match self.source.idle_time() {
            Ok(idle) => idle.as_secs_f64(),
            Err(e) => {
                debug!(error = %e, "failed to read idle time, skipping tick");
                return;
            }
        };

        let line = self.tracker.status_line(idle);
        print_status(&mut self.status, &line);

        let acknowledged = self
            .warning
            .as_ref()
            .is_some_and(WarningProcess::try_acknowledged);

        match self.tracker.poll(idle, acknowledged) {
            Verdict::Steady => {}
            Verdict::StartWarning => self.start_warning(),
            Verdict::Acknowledged => self.stop_warning(),
            Verdict::AwaitAcknowledgement => {
                let grace = self.config.ack_grace();
                let acknowledged = self
                    .warning
                    .as_ref()
                    .is_some_and(|w| w.wait_acknowledged(grace));
                self.stop_warning();
                if self.tracker.resolve(acknowledged, idle) == Verdict::Intrusion {
                    self.handle_detection();
                }
            }
            Verdict::Intrusion => self.handle_detection(),
        }
    }

    fn start_warning(&mut self) {
        match WarningProcess::spawn(&self.exe) {
            Ok(process) => {
                warn!(pid = ?process.id(), lead_secs = self.config.warning_lead_secs, "warning shown - waiting for acknowledgment");
                self.warning = Some(process);
            }
            Err(e) => {
                error!(error = ?e, "failed to start warning dialog");
                self.tracker.warning_failed();
            }
        }
    }

    fn stop_warning(&mut self) {
        if let Some(mut process) = self.warning.take() {
            process.stop();
        }
    }

    fn handle_detection(&mut self) {
        warn!("UNAUTHORIZED ACCESS DETECTED - locking");

        // Photo runs in parallel; locking does not wait for it
        let path = actions::photo_path(&self.config.photo_dir(), &Local::now());
        info!(path = %path.display(), "capturing photo");
        let photo = actions::spawn_photo_capture(self.config.photo_command.clone(), path)
            .inspect_err(|e| error!(error = ?e, "photo capture not started"))
            .ok();

        if let Err(e) = actions::lock_screen(&self.config.lock_command) {
            error!(error = ?e, "lock failed");
        }

        if let Some(photo) = photo {
            match photo.recv_timeout(self.config.photo_wait()) {
                Ok(Ok(path)) => info!(path = %path.display(), "photo saved"),
                Ok(Err(e)) => warn!(error = ?e, "photo failed"),
                Err(_) => info!("photo still in progress"),
            }
        }

        self.tracker.reset();
    }
}

/// Overwrite the current terminal line
fn print_status<W: Write>(out: &mut W, line: &str) {
    let _ = write!(out, "\r\x1b[K{line}");
    let _ = out.flush();
}

/// Sleep in short slices so a shutdown request is noticed promptly.
/// Returns false if shutdown was requested.
fn sleep_unless(shutdown: &AtomicBool, duration: Duration) -> bool {
    let deadline = Instant::now() + duration;
    while !shutdown.load(Ordering::Relaxed) {
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        thread::sleep((deadline - now).min(Duration::from_millis(100)));
    }
    false
}

#[cfg(unix)]
fn register_shutdown(shutdown: &Arc<AtomicBool>) -> Result<()> {
    use signal_hook::consts::{SIGINT, SIGTERM};

    for signal in [SIGINT, SIGTERM] {
        signal_hook::flag::register(signal, Arc::clone(shutdown))
            .with_context(|| format!("failed to register handler for signal {signal}"))?;
    }
    Ok(())
}

#[cfg(not(unix))]
fn register_shutdown(_shutdown: &Arc<AtomicBool>) -> Result<()> {
    Ok(())
}

/// Run the monitor until SIGINT/SIGTERM
pub fn run_monitor(config: MonitorConfig) -> Result<()> {
    let shutdown = Arc::new(AtomicBool::new(false));
    register_shutdown(&shutdown)?;

    info!(config = ?config, "SECURITY MONITOR - starting in {}s", config.startup_delay_secs);
    if !sleep_unless(&shutdown, config.startup_delay()) {
        return Ok(());
    }

    if let Some(camera) = config.photo_command.first()
        && !actions::command_available(camera)
    {
        warn!(%camera, "camera tool not found, photos disabled until it is installed");
    }

    let source = idle::open(config.idle_source)?;
    let exe = std::env::current_exe().context("failed to locate own executable")?;

    let mut monitor = Monitor {
        tracker: Tracker::new(config.idle_timeout_secs, config.warning_lead_secs),
        source,
        warning: None,
        exe,
        config,
        status: io::stdout(),
    };

    loop {
        monitor.tick();
        if !sleep_unless(&shutdown, monitor.config.poll_interval()) {
            break;
        }
    }

    monitor.stop_warning();
    let _ = writeln!(monitor.status);
    info!("shutting down");
    Ok(())
}
