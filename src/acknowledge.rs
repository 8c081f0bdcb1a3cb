//! Stdout protocol between the warning dialog and the monitor

use std::io::{self, Write};

/// Token the dialog prints when its hidden region is clicked
pub const SAFE_TOKEN: &str = "SAFE";

/// Write `SAFE\n` and flush so the reader sees it before the process exits
pub fn write_token<W: Write>(out: &mut W) -> io::Result<()> {
    out.write_all(SAFE_TOKEN.as_bytes())?;
    out.write_all(b"\n")?;
    out.flush()
}

/// True if a line read from the dialog's stdout carries the token
pub fn is_acknowledgment(line: &str) -> bool {
    line.contains(SAFE_TOKEN)
}
