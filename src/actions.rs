//! Responses to an intrusion: lock the session, photograph the intruder

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, TimeZone};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::mpsc::{self, Receiver};
use std::thread;
use tracing::{debug, info};

use crate::constants::monitor::{PHOTO_PREFIX, PHOTO_TIMESTAMP};

/// Run `argv[0]` with the remaining arguments and require success
pub fn run_command(argv: &[String]) -> Result<()> {
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| anyhow!("empty command"))?;
    debug!(%program, ?args, "running command");
    let status = Command::new(program)
        .args(args)
        .status()
        .with_context(|| format!("failed to run '{program}'"))?;
    if !status.success() {
        bail!("'{program}' exited with {status}");
    }
    Ok(())
}

pub fn lock_screen(command: &[String]) -> Result<()> {
    info!("locking screen");
    run_command(command).context("failed to lock screen")
}

/// `<dir>/idle-trap_<timestamp>.jpg`
pub fn photo_path<Tz: TimeZone>(dir: &Path, now: &DateTime<Tz>) -> PathBuf
where
    Tz::Offset: std::fmt::Display,
{
    dir.join(format!("{PHOTO_PREFIX}_{}.jpg", now.format(PHOTO_TIMESTAMP)))
}

/// Take one photo, appending the output path to the camera command
pub fn capture_photo(command: &[String], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create photo directory {}", parent.display()))?;
    }
    let mut argv = command.to_vec();
    argv.push(path.to_string_lossy().into_owned());
    run_command(&argv).context("error capturing photo")
}

/// Capture on a worker thread; the receiver yields the saved path or the error
pub fn spawn_photo_capture(command: Vec<String>, path: PathBuf) -> Result<Receiver<Result<PathBuf>>> {
    let (tx, rx) = mpsc::channel();
    thread::Builder::new()
        .name("photo-capture".to_string())
        .spawn(move || {
            let result = capture_photo(&command, &path).map(|()| path);
            let _ = tx.send(result);
        })
        .context("failed to start photo capture")?;
    Ok(rx)
}

/// True if `program` resolves to a file, directly or through `PATH`
pub fn command_available(program: &str) -> bool {
    let candidate = Path::new(program);
    if candidate.components().count() > 1 {
        return candidate.is_file();
    }
    env::var_os("PATH")
        .map(|paths| env::split_paths(&paths).any(|dir| dir.join(program).is_file()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::time::Duration;

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_photo_path_format() {
        let now = Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        let path = photo_path(Path::new("/tmp/photos"), &now);
        assert_eq!(path, PathBuf::from("/tmp/photos/idle-trap_2024-03-09_07-05-01.jpg"));
    }

    #[test]
    fn test_run_command_empty() {
        assert!(run_command(&[]).is_err());
    }

    #[test]
    fn test_run_command_missing_program() {
        assert!(run_command(&argv(&["idle-trap-no-such-program"])).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_run_command_status() {
        assert!(run_command(&argv(&["true"])).is_ok());
        let err = run_command(&argv(&["false"])).unwrap_err();
        assert!(err.to_string().contains("exited with"));
    }

    #[cfg(unix)]
    #[test]
    fn test_capture_photo_appends_path() {
        let dir = env::temp_dir().join(format!("idle-trap-test-{}", std::process::id()));
        let path = dir.join("shot.jpg");
        // `touch <path>` stands in for the camera tool
        let rx = spawn_photo_capture(argv(&["touch"]), path.clone()).unwrap();
        let saved = rx.recv_timeout(Duration::from_secs(5)).unwrap().unwrap();
        assert_eq!(saved, path);
        assert!(path.is_file());
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_command_available() {
        assert!(!command_available("idle-trap-no-such-program"));
        assert!(!command_available("/nonexistent/dir/tool"));
        #[cfg(unix)]
        assert!(command_available("sh"));
    }
}
