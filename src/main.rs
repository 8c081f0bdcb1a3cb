#![forbid(unsafe_code)]

mod acknowledge;
mod actions;
mod config;
mod constants;
mod gui;
mod idle;
mod monitor;
mod tracker;
mod types;
mod warning;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::FmtSubscriber;

use config::MonitorConfig;

#[derive(Parser, Debug)]
#[command(name = "idle-trap")]
#[command(version)]
#[command(about = "Idle-time intrusion trap with a covert acknowledgment dialog", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Verbose logging for idle-trap itself
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Show the warning dialog; prints SAFE when the hidden region is clicked
    Warning,
    /// Watch idle time, warn before the timeout and lock on unacknowledged input
    Monitor {
        /// Idle timeout in seconds (overrides the config file)
        #[arg(long)]
        timeout: Option<f64>,
    },
    /// Print the effective monitor configuration as TOML
    PrintConfig,
}

/// Default log filter when `RUST_LOG` is unset.
/// The dialog takes no configuration; the monitor honours `log_level`.
fn filter_directives(cli: &Cli) -> String {
    if cli.debug {
        return "info,idle_trap=debug".to_string();
    }
    match cli.command {
        None | Some(Commands::Warning) => "info".to_string(),
        Some(_) => format!("info,idle_trap={}", MonitorConfig::configured_log_level()),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter_directives(&cli)));

    // stdout belongs to the dialog's SAFE token and the monitor status line
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        None | Some(Commands::Warning) => gui::run_warning(),
        Some(Commands::Monitor { timeout }) => {
            let mut config = MonitorConfig::load();
            if let Some(timeout) = timeout {
                info!(timeout, "idle timeout set from command line");
                config.idle_timeout_secs = timeout;
                config.validate_and_clamp();
            }
            monitor::run_monitor(config)
        }
        Some(Commands::PrintConfig) => {
            print!("{}", MonitorConfig::load().to_toml()?);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_flag_wins() {
        let cli = Cli::parse_from(["idle-trap", "--debug", "monitor"]);
        assert_eq!(filter_directives(&cli), "info,idle_trap=debug");
    }

    #[test]
    fn test_dialog_ignores_config_log_level() {
        for args in [vec!["idle-trap"], vec!["idle-trap", "warning"]] {
            let cli = Cli::parse_from(args);
            assert_eq!(filter_directives(&cli), "info");
        }
    }

    #[test]
    fn test_monitor_uses_configured_level() {
        let cli = Cli::parse_from(["idle-trap", "monitor", "--timeout", "30"]);
        assert!(filter_directives(&cli).starts_with("info,idle_trap="));
    }
}
