//! Application-wide constants

pub mod dialog {
    use crate::types::Size;

    pub const APP_ID: &str = "idle-trap-warning";
    pub const TITLE: &str = "Beveiligingswaarschuwing";
    pub const MESSAGE: &str = "Het systeem maakt foto's bij ongeautoriseerde activiteit.";

    pub const WINDOW: Size = Size::new(400.0, 150.0);
    /// Logical screen used when the display reports no size
    pub const FALLBACK_SCREEN: Size = Size::new(1000.0, 800.0);

    pub const FONT_SIZE: f32 = 14.0;
    /// Horizontal inset of the label on each side
    pub const LABEL_INSET: f32 = 20.0;
    /// Side of the invisible click target in the bottom-left corner
    pub const HIDDEN_SIDE: f32 = 50.0;
}

pub mod config {
    pub const APP_DIR: &str = "idle-trap";
    pub const FILENAME: &str = "idle-trap.toml";
}

pub mod monitor {
    use std::time::Duration;

    /// Photo file name prefix, followed by a timestamp
    pub const PHOTO_PREFIX: &str = "idle-trap";
    pub const PHOTO_TIMESTAMP: &str = "%Y-%m-%d_%H-%M-%S";
    pub const PHOTO_DIR: &str = "idle-trap-photos";

    /// Idle time must drop by more than this to count as input activity
    pub const ACTIVITY_DROP_SECS: f64 = 1.0;

    /// How long a dialog gets to exit after SIGTERM before it is killed
    pub const STOP_GRACE: Duration = Duration::from_secs(2);
}

pub mod validation {
    pub const MIN_TIMEOUT_SECS: f64 = 1.0;
    pub const MAX_TIMEOUT_SECS: f64 = 86_400.0;
    pub const MAX_ACK_GRACE_MS: u64 = 60_000;
    pub const MIN_POLL_INTERVAL_MS: u64 = 100;
    pub const MAX_POLL_INTERVAL_MS: u64 = 10_000;
    pub const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];
}
