// Copyright (c) 2026 Cairn Labs. MIT License.
// See LICENSE for details.

//! # CAIRN Demo Node
//!
//! Entry point for the `cairn-node` binary. Parses CLI arguments,
//! initializes logging, and runs a scripted custody scenario against the
//! selected vault generation, wired to in-memory collaborators.
//!
//! The binary supports three subcommands:
//!
//! - `oracle`  -- run the oracle-generation scenario
//! - `swap`    -- run the swap-generation scenario
//! - `version` -- print build version information
//!
//! Log output goes to stderr; the scenario summary and the audit trail
//! are printed to stdout as JSON.

mod cli;
mod logging;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use cairn_engine::asset::{native_asset_id, AccountId, AssetId, AssetInfo};
use cairn_engine::memory::{
    FixedRateRouter, InMemoryMover, MemoryAuditSink, SingleAdmin, StaticPriceFeed,
};
use cairn_engine::valuation::SwapValuation;
use cairn_vaults::{OracleVault, SwapVault};

use cli::{CairnNodeCli, Commands, ScenarioArgs};
use logging::LogFormat;

const ONE_NATIVE: u128 = 1_000_000_000_000_000_000;
const ONE_NORMALIZED: u128 = 1_000_000;

/// 2000.00000000 in 8-fractional-digit price units.
const DEMO_PRICE: i128 = 200_000_000_000;

fn main() -> Result<()> {
    let cli = CairnNodeCli::parse();
    logging::init_logging(&cli.log_level, LogFormat::from_str_lossy(&cli.log_format));

    match cli.command {
        Commands::Oracle(args) => run_oracle_scenario(&args),
        Commands::Swap(args) => run_swap_scenario(&args),
        Commands::Version => {
            println!("cairn-node {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn run_oracle_scenario(args: &ScenarioArgs) -> Result<()> {
    tracing::info!(capacity = args.capacity, "starting oracle-generation scenario");

    let admin = AccountId::named("admin");
    let alice = AccountId::named("alice");
    let bob = AccountId::named("bob");

    let mover = Arc::new(InMemoryMover::new());
    let feed = Arc::new(StaticPriceFeed::new("native/reference demo feed", DEMO_PRICE));
    let audit = Arc::new(MemoryAuditSink::new());

    let vault = OracleVault::new(
        u128::from(args.capacity) * ONE_NORMALIZED,
        u128::from(args.withdrawal_limit) * ONE_NATIVE,
        feed,
        mover.clone(),
        Arc::new(SingleAdmin::new(admin)),
        audit.clone(),
    );

    // Seed external holdings: 5 native units for alice, 1000 USDX for bob.
    let usdx = AssetId::derive("USDX", "cairn:demo-issuer");
    mover.fund(alice, native_asset_id(), 5 * ONE_NATIVE);
    mover.fund(bob, usdx, 1000 * ONE_NORMALIZED);

    vault
        .add_supported_asset(admin, usdx, "USDX", 6)
        .context("registering the demo stable asset")?;

    vault
        .deposit(alice, 2 * ONE_NATIVE)
        .context("alice's native deposit")?;
    vault
        .deposit_asset(bob, usdx, 750 * ONE_NORMALIZED)
        .context("bob's stable deposit")?;
    vault
        .withdraw(alice, ONE_NATIVE)
        .context("alice's withdrawal")?;

    // An over-ceiling withdrawal fails with a typed, inspectable error.
    if let Err(err) = vault.withdraw(
        alice,
        (u128::from(args.withdrawal_limit) + 1) * ONE_NATIVE,
    ) {
        tracing::warn!(%err, "over-ceiling withdrawal rejected as expected");
    }

    let summary = serde_json::json!({
        "generation": "oracle",
        "price": vault.get_price().value,
        "capacity_normalized": vault.get_capacity_in_normalized_value(),
        "current_total_normalized": vault.get_current_total_balance(),
        "deposits": vault.get_total_deposits(),
        "withdrawals": vault.get_total_withdrawals(),
        "alice_native_balance": vault.get_balance(&alice),
        "bob_usdx_balance": vault.get_balance_asset(&bob, &usdx),
    });
    print_report(&summary, &audit)
}

fn run_swap_scenario(args: &ScenarioArgs) -> Result<()> {
    tracing::info!(capacity = args.capacity, "starting swap-generation scenario");

    let admin = AccountId::named("admin");
    let alice = AccountId::named("alice");
    let bob = AccountId::named("bob");

    let usdc = AssetId::derive("USDC", "cairn:demo-issuer");
    let wnat = AssetId::derive("WNAT", "cairn:demo-issuer");
    let dai = AssetId::derive("DAI", "cairn:demo-issuer");

    let mover = Arc::new(InMemoryMover::new());
    let router = Arc::new(FixedRateRouter::new());
    // Native enters the path as the wrapped intermediate at 2000
    // canonical per native unit; DAI fills 1:1 across the digit gap.
    router.set_rate(wnat, 2000 * ONE_NORMALIZED, ONE_NATIVE);
    router.set_rate(dai, ONE_NORMALIZED, ONE_NATIVE);
    let audit = Arc::new(MemoryAuditSink::new());

    let vault = SwapVault::new(
        u128::from(args.capacity) * ONE_NORMALIZED,
        u128::from(args.withdrawal_limit) * ONE_NORMALIZED,
        SwapValuation::new(router.clone(), wnat, usdc),
        AssetInfo {
            symbol: "USDC".into(),
            decimals: 6,
        },
        mover.clone(),
        Arc::new(SingleAdmin::new(admin)),
        audit.clone(),
    )
    .context("assembling the swap vault")?;

    mover.fund(alice, native_asset_id(), 2 * ONE_NATIVE);
    mover.fund(alice, usdc, 500 * ONE_NORMALIZED);
    mover.fund(bob, dai, 250 * ONE_NATIVE);

    vault
        .add_supported_asset(admin, dai, "DAI", 18)
        .context("registering DAI")?;

    vault
        .deposit(alice, ONE_NATIVE)
        .context("alice's native deposit")?;
    vault
        .deposit_asset(alice, usdc, 500 * ONE_NORMALIZED)
        .context("alice's canonical deposit")?;
    vault
        .deposit_asset(bob, dai, 250 * ONE_NATIVE)
        .context("bob's DAI deposit")?;
    vault
        .withdraw(alice, 300 * ONE_NORMALIZED)
        .context("alice's withdrawal")?;

    let summary = serde_json::json!({
        "generation": "swap",
        "canonical_asset": vault.canonical_asset().to_hex(),
        "capacity": vault.get_capacity(),
        "current_total": vault.get_current_total_balance(),
        "deposits": vault.get_total_deposits(),
        "withdrawals": vault.get_total_withdrawals(),
        "alice_balance": vault.get_balance(&alice),
        "bob_balance": vault.get_balance(&bob),
        "router_quotes": router.quote_count(),
        "router_swaps": router.swap_count(),
    });
    print_report(&summary, &audit)
}

fn print_report(summary: &serde_json::Value, audit: &MemoryAuditSink) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(summary).context("rendering the scenario summary")?
    );
    println!(
        "{}",
        serde_json::to_string_pretty(&audit.events()).context("rendering the audit trail")?
    );
    Ok(())
}
