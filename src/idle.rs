//! System idle time sources

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::process::Command;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};
use x11rb::connection::Connection;
use x11rb::protocol::screensaver::ConnectionExt as ScreensaverExt;
use x11rb::protocol::xproto::Window;
use x11rb::rust_connection::RustConnection;

/// Time since the last keyboard or pointer input
pub trait IdleSource {
    fn idle_time(&mut self) -> Result<Duration>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdleSourceKind {
    /// `ioreg` on macOS, X11 everywhere else
    #[default]
    Auto,
    X11,
    Ioreg,
}

impl FromStr for IdleSourceKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "x11" => Ok(Self::X11),
            "ioreg" => Ok(Self::Ioreg),
            other => Err(anyhow!("unknown idle source '{other}' (expected auto, x11 or ioreg)")),
        }
    }
}

impl IdleSourceKind {
    fn resolve(self) -> Self {
        match self {
            Self::Auto if cfg!(target_os = "macos") => Self::Ioreg,
            Self::Auto => Self::X11,
            other => other,
        }
    }
}

/// Open the configured idle source
pub fn open(kind: IdleSourceKind) -> Result<Box<dyn IdleSource>> {
    match kind.resolve() {
        IdleSourceKind::Ioreg => {
            info!("Using ioreg HIDIdleTime as idle source");
            Ok(Box::new(IoregIdle))
        }
        _ => {
            let source = X11Idle::connect()?;
            info!("Using X11 screensaver extension as idle source");
            Ok(Box::new(source))
        }
    }
}

/// Idle time from the X11 MIT-SCREEN-SAVER extension
pub struct X11Idle {
    conn: RustConnection,
    root: Window,
}

impl X11Idle {
    pub fn connect() -> Result<Self> {
        let (conn, screen_num) = x11rb::connect(None).context("failed to connect to X11")?;
        let root = conn.setup().roots[screen_num].root;
        let version = conn
            .screensaver_query_version(1, 1)?
            .reply()
            .context("X11 server lacks the MIT-SCREEN-SAVER extension")?;
        debug!(
            major = version.server_major_version,
            minor = version.server_minor_version,
            "screensaver extension available"
        );
        Ok(Self { conn, root })
    }
}

impl IdleSource for X11Idle {
    fn idle_time(&mut self) -> Result<Duration> {
        let info = self.conn.screensaver_query_info(self.root)?.reply()?;
        Ok(Duration::from_millis(u64::from(info.ms_since_user_input)))
    }
}

/// Idle time from `ioreg -c IOHIDSystem` (macOS)
pub struct IoregIdle;

impl IdleSource for IoregIdle {
    fn idle_time(&mut self) -> Result<Duration> {
        let output = Command::new("ioreg")
            .args(["-c", "IOHIDSystem"])
            .output()
            .context("failed to run ioreg")?;
        parse_hid_idle_time(&String::from_utf8_lossy(&output.stdout))
    }
}

/// Extract the first `HIDIdleTime` value (nanoseconds) from ioreg output
pub fn parse_hid_idle_time(output: &str) -> Result<Duration> {
    let line = output
        .lines()
        .find(|line| line.contains("HIDIdleTime"))
        .ok_or_else(|| anyhow!("could not find HIDIdleTime"))?;
    let value = line
        .split_once('=')
        .and_then(|(_, rhs)| rhs.split_whitespace().next())
        .ok_or_else(|| anyhow!("malformed HIDIdleTime line: {line:?}"))?;
    let nanos: u64 = value
        .parse()
        .with_context(|| format!("invalid HIDIdleTime value {value:?}"))?;
    Ok(Duration::from_nanos(nanos))
}
