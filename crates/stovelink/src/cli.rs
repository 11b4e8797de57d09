//! Clap derive structures for the `stovelink` CLI.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// stovelink -- control cloud-connected pellet stoves from the command line
#[derive(Debug, Parser)]
#[command(
    name = "stovelink",
    version,
    about = "Read and control a cloud-connected pellet stove",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Stove profile to use (from the config file)
    #[arg(long, short = 'p', env = "STOVELINK_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

// ── Commands ─────────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch the current state once and print it
    Status,

    /// Keep refreshing and print every state change (Ctrl-C to stop)
    Watch {
        /// Override the refresh interval in seconds
        #[arg(long)]
        interval: Option<u64>,
    },

    /// List the live alarm log entries
    Alarms,

    /// Turn the stove on or off
    Power { state: OnOff },

    /// Set the target temperature in °C
    Temp { value: f64 },

    /// Set the ventilation level of one fan
    Fan {
        /// Fan index (1-based)
        index: u8,
        /// Ventilation level
        level: u8,
    },

    /// Toggle the air-care function
    Airkare { state: OnOff },

    /// Toggle relax (quiet night) mode
    Relax { state: OnOff },

    /// Toggle the weekly programmer
    Chrono { state: OnOff },

    /// Toggle standby (requires automatic mode)
    Standby { state: OnOff },

    /// Switch to automatic regulation
    Auto,

    /// Switch to manual regulation at the given power level (1-5)
    Manual { level: u8 },

    /// Ask the stove to re-run its configuration self-check
    Check,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OnOff {
    On,
    Off,
}

impl From<OnOff> for bool {
    fn from(state: OnOff) -> Self {
        matches!(state, OnOff::On)
    }
}
