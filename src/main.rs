// zram-advisor - zRAM effectiveness analyzer and swap lifecycle manager
// SPDX-License-Identifier: GPL-3.0-or-later

use std::time::Duration;

use clap::{Parser, Subcommand};

use zram_advisor::defaults;
use zram_advisor::error;
use zram_advisor::exec::{self, Runner};
use zram_advisor::lifecycle::{self, LifecycleError};
use zram_advisor::report;
use zram_advisor::service;
use zram_advisor::sizing::SizingSpec;
use zram_advisor::warn;

#[derive(Parser)]
#[command(name = "zram-advisor")]
#[command(about = "Analyze zRAM effectiveness and manage zram swap lifecycle")]
#[command(after_help = "Without a subcommand the live report runs; use `load` to enable zram swap.")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Live effectiveness report, refreshed until Ctrl-C (default)
    Watch {
        /// Seconds between refreshes
        #[arg(long, default_value_t = defaults::WATCH_INTERVAL_SECS)]
        interval: u64,
    },
    /// Print one snapshot and exit
    Report,
    /// (Re)create zram devices and enable them as swap
    Load {
        /// Number of zram devices to create
        #[arg(long, default_value_t = defaults::DEVICE_COUNT)]
        devices: u32,
        /// Echo privileged actions instead of performing them
        #[arg(long)]
        dry_run: bool,
        /// Sizing tokens: `<float>x` of RAM (default 1.75x) and an
        /// `<int>m`/`<int>g` cap (default 12288m)
        sizing: Vec<String>,
    },
    /// Disable zram swap and unload the driver
    Unload {
        #[arg(long)]
        dry_run: bool,
    },
    /// Install a boot service that replays `load` with this sizing
    Setup {
        #[arg(long, default_value_t = defaults::DEVICE_COUNT)]
        devices: u32,
        #[arg(long)]
        dry_run: bool,
        sizing: Vec<String>,
    },
    /// Remove the boot service and installed executable
    Unsetup {
        #[arg(long)]
        dry_run: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command.unwrap_or(Commands::Watch {
        interval: defaults::WATCH_INTERVAL_SECS,
    }) {
        Commands::Watch { interval } => report::watch(Duration::from_secs(interval.max(1)))
            .map_err(Into::into),
        Commands::Report => report::report_once().map_err(Into::into),
        Commands::Load {
            devices,
            dry_run,
            sizing,
        } => cmd_load(&sizing, devices, dry_run),
        Commands::Unload { dry_run } => cmd_unload(dry_run),
        Commands::Setup {
            devices,
            dry_run,
            sizing,
        } => cmd_setup(&sizing, devices, dry_run),
        Commands::Unsetup { dry_run } => cmd_unsetup(dry_run),
    };

    if let Err(e) = result {
        error!("{}", e);
        std::process::exit(1);
    }
}

type CmdResult = Result<(), Box<dyn std::error::Error>>;

fn cmd_load(sizing: &[String], devices: u32, dry_run: bool) -> CmdResult {
    // Sizing is validated before anything runs or escalates
    let spec = SizingSpec::parse_tokens(sizing, devices)?;
    exec::ensure_root(dry_run)?;
    let runner = Runner::new(dry_run);
    lifecycle::load(&runner, &spec)?;
    Ok(())
}

fn cmd_unload(dry_run: bool) -> CmdResult {
    exec::ensure_root(dry_run)?;
    let runner = Runner::new(dry_run);
    unload_severity(lifecycle::unload(&runner))
}

/// The OS keeping a device busy is an operator report, not a process
/// failure; the system stays in its prior state. Anything else is a
/// real error.
fn unload_severity(result: Result<(), LifecycleError>) -> CmdResult {
    match result {
        Err(LifecycleError::UnloadBlocked { kept }) => {
            warn!(
                "unload incomplete: {} device(s) still active, free some RAM and retry",
                kept
            );
            Ok(())
        }
        other => other.map_err(Into::into),
    }
}

fn cmd_setup(sizing: &[String], devices: u32, dry_run: bool) -> CmdResult {
    let spec = SizingSpec::parse_tokens(sizing, devices)?;
    exec::ensure_root(dry_run)?;
    let runner = Runner::new(dry_run);
    service::setup(&runner, &spec)?;
    Ok(())
}

fn cmd_unsetup(dry_run: bool) -> CmdResult {
    exec::ensure_root(dry_run)?;
    let runner = Runner::new(dry_run);
    service::unsetup(&runner)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use zram_advisor::exec::ExecError;

    #[test]
    fn test_blocked_unload_is_not_a_process_failure() {
        let blocked = Err(LifecycleError::UnloadBlocked { kept: 2 });
        assert!(unload_severity(blocked).is_ok());
    }

    #[test]
    fn test_other_unload_errors_stay_fatal() {
        let failed = Err(LifecycleError::Exec(ExecError::CommandFailed(
            "swapoff /dev/zram0 exited with signal".to_string(),
        )));
        assert!(unload_severity(failed).is_err());
    }

    #[test]
    fn test_clean_unload_passes_through() {
        assert!(unload_severity(Ok(())).is_ok());
    }
}
