//! # CLI Interface
//!
//! Defines the command-line argument structure for `cairn-node` using
//! `clap` derive. Supports three subcommands: `oracle`, `swap`, and
//! `version`.

use clap::{Parser, Subcommand};

/// CAIRN custody ledger demo node.
///
/// Runs scripted scenarios against each vault generation, wired to
/// in-memory collaborators, logging every state transition and printing
/// the resulting audit trail as JSON.
#[derive(Parser, Debug)]
#[command(
    name = "cairn-node",
    about = "CAIRN custody ledger demo node",
    version,
    propagate_version = true
)]
pub struct CairnNodeCli {
    /// Default log level when RUST_LOG is not set.
    #[arg(long, env = "CAIRN_LOG_LEVEL", default_value = "info", global = true)]
    pub log_level: String,

    /// Log output format: "pretty" or "json".
    #[arg(long, env = "CAIRN_LOG_FORMAT", default_value = "pretty", global = true)]
    pub log_format: String,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands for the CAIRN node binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the oracle-generation scenario: priced native deposits,
    /// an identity-valued stable asset, and a ceiling-bounded
    /// withdrawal.
    Oracle(ScenarioArgs),
    /// Run the swap-generation scenario: exchange-converted deposits
    /// into the canonical asset.
    Swap(ScenarioArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments shared by the scenario subcommands.
#[derive(Parser, Debug)]
pub struct ScenarioArgs {
    /// Capacity ceiling in whole normalized units.
    #[arg(long, default_value_t = 1_000_000)]
    pub capacity: u64,

    /// Per-call withdrawal ceiling in whole withdrawal units.
    #[arg(long, default_value_t = 1_000)]
    pub withdrawal_limit: u64,
}
