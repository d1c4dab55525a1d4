//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.
//!
//! Every command opens the redb-backed engine with the system clock and
//! the stake table loaded from the sidecar report file, so CLI sessions
//! observe the same oracle reports the server does.

use crate::api::{self, AppState};
use crate::config::{AppConfig, load_stakes, save_stakes, stake_file_for};
use chrysalis_core::{
    ChrysalisError, IdentityId, Principal, SharedStakeTable, StakeAmount, SystemClock,
    TraitEngine, TraitRecord,
};
use std::path::Path;

// =============================================================================
// ENGINE SETUP
// =============================================================================

/// Open the persistent engine for a CLI command.
fn open_engine(
    db_path: &Path,
    config_path: Option<&Path>,
) -> Result<(TraitEngine, SharedStakeTable, AppConfig), ChrysalisError> {
    let config = AppConfig::load(config_path)?;
    let stakes = load_stakes(&stake_file_for(db_path))?;
    let engine = TraitEngine::with_redb(
        db_path,
        config.controller_principal(),
        stakes.clone(),
        SystemClock,
        config.engine_config(),
    )?;
    Ok((engine, stakes, config))
}

/// The principal a CLI mutation acts as: an explicit `--caller`, or the
/// configured controller (the local operator is the controller by default).
fn caller_principal(config: &AppConfig, caller: Option<String>) -> Principal {
    caller.map_or_else(|| config.controller_principal(), Principal::new)
}

/// Parse a base-10 u128 CLI argument.
fn parse_amount(field: &str, raw: &str) -> Result<u128, ChrysalisError> {
    raw.parse().map_err(|_| {
        ChrysalisError::Serialization(format!("{} must be a base-10 unsigned integer", field))
    })
}

// =============================================================================
// SERVE COMMAND
// =============================================================================

/// Start the HTTP server.
pub async fn cmd_serve(
    db_path: &Path,
    config_path: Option<&Path>,
    host: &str,
    port: u16,
) -> Result<(), ChrysalisError> {
    let (engine, stakes, config) = open_engine(db_path, config_path)?;

    println!("Chrysalis Trait-Evolution Server Starting...");
    println!();
    println!("Configuration:");
    println!("  Host:       {}", host);
    println!("  Port:       {}", port);
    println!("  Database:   {:?}", db_path);
    println!("  Controller: {}", config.controller);
    println!("  Threshold:  {} units", config.evolution_threshold);
    println!();
    println!("Endpoints:");
    println!("  GET  /health                  - Health check");
    println!("  GET  /status                  - Engine status");
    println!("  GET  /identity/{{id}}           - Record state");
    println!("  GET  /identity/{{id}}/uri       - Token URI");
    println!("  POST /identity/{{id}}/init      - Initialize record");
    println!("  POST /identity/{{id}}/evolve    - Evolve record");
    println!("  POST /identity/{{id}}/override  - Pin history index");
    println!("  POST /stake/{{id}}              - Report stake balance");
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let state = AppState::new(engine, stakes, Some(stake_file_for(db_path)));
    let addr = format!("{}:{}", host, port);
    api::run_server(&addr, state).await
}

// =============================================================================
// STATUS COMMAND
// =============================================================================

/// Show engine status.
pub fn cmd_status(
    db_path: &Path,
    config_path: Option<&Path>,
    json_mode: bool,
) -> Result<(), ChrysalisError> {
    let (engine, _, config) = open_engine(db_path, config_path)?;

    let identity_count = engine.identity_count()?;
    let entry_total = engine.entry_total()?;

    if json_mode {
        let output = serde_json::json!({
            "database": db_path.to_string_lossy(),
            "controller": config.controller,
            "evolution_threshold": config.evolution_threshold,
            "identity_count": identity_count,
            "entry_total": entry_total,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_default()
        );
        return Ok(());
    }

    println!("Chrysalis Engine Status");
    println!("=======================");
    println!("Database:   {:?}", db_path);
    println!("Controller: {}", config.controller);
    println!("Threshold:  {} units", config.evolution_threshold);
    println!();
    println!("Identities: {}", identity_count);
    println!("Entries:    {}", entry_total);

    Ok(())
}

// =============================================================================
// MUTATION COMMANDS
// =============================================================================

/// Initialize an identity's trait record.
pub fn cmd_init(
    db_path: &Path,
    config_path: Option<&Path>,
    json_mode: bool,
    id: u64,
    gender: u8,
    skin: u8,
    dna: &str,
    caller: Option<String>,
) -> Result<(), ChrysalisError> {
    let (mut engine, _, config) = open_engine(db_path, config_path)?;
    let identity = IdentityId(id);
    let caller = caller_principal(&config, caller);
    let dna = parse_amount("dna", dna)?;

    engine.init_traits(&caller, identity, TraitRecord::with_traits(gender, skin, dna))?;

    report_mutation(&engine, identity, json_mode, "initialized")
}

/// Append a new history entry for an eligible identity.
pub fn cmd_evolve(
    db_path: &Path,
    config_path: Option<&Path>,
    json_mode: bool,
    id: u64,
    caller: Option<String>,
) -> Result<(), ChrysalisError> {
    let (mut engine, _, config) = open_engine(db_path, config_path)?;
    let identity = IdentityId(id);
    let caller = caller_principal(&config, caller);

    engine.evolve(&caller, identity)?;

    report_mutation(&engine, identity, json_mode, "evolved")
}

/// Pin the displayed history index.
pub fn cmd_pin(
    db_path: &Path,
    config_path: Option<&Path>,
    json_mode: bool,
    id: u64,
    index: u32,
    caller: Option<String>,
) -> Result<(), ChrysalisError> {
    let (mut engine, _, config) = open_engine(db_path, config_path)?;
    let identity = IdentityId(id);
    let caller = caller_principal(&config, caller);

    engine.override_history(&caller, identity, index)?;

    report_mutation(&engine, identity, json_mode, "pinned")
}

/// Print the post-mutation view of an identity.
fn report_mutation(
    engine: &TraitEngine,
    identity: IdentityId,
    json_mode: bool,
    action: &str,
) -> Result<(), ChrysalisError> {
    let count = engine.history_count(identity)?;
    let uri = engine.token_uri(identity)?;

    if json_mode {
        let output = serde_json::json!({
            "identity": identity.0,
            "action": action,
            "history_count": count,
            "token_uri": uri,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_default()
        );
    } else {
        println!("Identity {} {}", identity.0, action);
        println!("  History entries: {}", count);
        println!("  Token URI:       {}", uri);
    }
    Ok(())
}

// =============================================================================
// READ COMMANDS
// =============================================================================

/// Show an identity's record.
pub fn cmd_show(
    db_path: &Path,
    config_path: Option<&Path>,
    json_mode: bool,
    id: u64,
    index: Option<u32>,
) -> Result<(), ChrysalisError> {
    let (engine, _, _) = open_engine(db_path, config_path)?;
    let identity = IdentityId(id);

    let record = match index {
        Some(index) => engine.trait_data_at(identity, index)?,
        None => engine.latest_trait_data(identity)?,
    };
    let count = engine.history_count(identity)?;
    let pinned = engine.history_override(identity)?;
    let displayed = engine.resolved_display_index(identity)?;

    if json_mode {
        let output = serde_json::json!({
            "identity": id,
            "initialized": count > 0,
            "gender": record.gender,
            "skin": record.skin,
            "dna": record.dna.to_string(),
            "last_recorded_stake": record.last_recorded_stake.value().to_string(),
            "last_recorded_at": record.last_recorded_at.secs(),
            "history_count": count,
            "history_override": pinned,
            "displayed_index": displayed,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_default()
        );
        return Ok(());
    }

    println!("Identity {}", id);
    println!("=========={}", "=".repeat(id.to_string().len()));
    if count == 0 {
        println!("Uninitialized (blank record)");
        return Ok(());
    }
    println!("Gender:          {}", record.gender);
    println!("Skin:            {}", record.skin);
    println!("DNA:             {}", record.dna);
    println!("Recorded stake:  {}", record.last_recorded_stake.value());
    println!("Recorded at:     {}", record.last_recorded_at.secs());
    println!();
    println!("History entries: {}", count);
    println!("Pinned index:    {}", pinned);
    println!("Displayed index: {}", displayed);

    Ok(())
}

/// Resolve an identity's token URI.
pub fn cmd_uri(
    db_path: &Path,
    config_path: Option<&Path>,
    json_mode: bool,
    id: u64,
) -> Result<(), ChrysalisError> {
    let (engine, _, _) = open_engine(db_path, config_path)?;
    let identity = IdentityId(id);

    let displayed = engine.resolved_display_index(identity)?;
    let uri = engine.token_uri(identity)?;

    if json_mode {
        let output = serde_json::json!({
            "identity": id,
            "displayed_index": displayed,
            "token_uri": uri,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_default()
        );
    } else {
        println!("{}", uri);
    }
    Ok(())
}

// =============================================================================
// STAKE COMMAND
// =============================================================================

/// Record a stake-oracle balance report in the sidecar file.
///
/// This touches only the report table; the trait ledger is never opened.
pub fn cmd_stake(
    db_path: &Path,
    json_mode: bool,
    id: u64,
    amount: &str,
) -> Result<(), ChrysalisError> {
    let amount = StakeAmount::new(parse_amount("amount", amount)?);
    let path = stake_file_for(db_path);

    let stakes = load_stakes(&path)?;
    stakes.set_stake(IdentityId(id), amount);
    save_stakes(&path, &stakes)?;

    if json_mode {
        let output = serde_json::json!({
            "identity": id,
            "amount": amount.value().to_string(),
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_default()
        );
    } else {
        println!("Identity {} stake recorded: {} units", id, amount.value());
    }
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
