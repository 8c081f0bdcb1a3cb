//! GUI module - egui-based warning dialog

mod warning;

pub use warning::run_warning;
