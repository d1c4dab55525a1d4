//! # Configuration
//!
//! Server configuration loaded from a TOML file, plus the sidecar file
//! that carries stake-oracle reports between CLI sessions.
//!
//! ## Example `chrysalis.toml`
//!
//! ```toml
//! controller = "governance"
//! evolution_threshold = 1000
//! token_uri_base = "https://meta.example.org"
//! ```
//!
//! Security-sensitive knobs (API key, rate limit, CORS origins) stay in
//! environment variables; see the `api` module.

use chrysalis_core::{
    ChrysalisError, EngineConfig, IdentityId, Principal, SharedStakeTable, StakeAmount,
    primitives::{DEFAULT_EVOLUTION_THRESHOLD, MAX_PRINCIPAL_LENGTH, MAX_URI_BASE_LENGTH},
};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

// =============================================================================
// APP CONFIG
// =============================================================================

/// Engine-facing configuration for the binary.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// The single principal allowed to mutate records.
    pub controller: String,
    /// Stake growth (oracle units) required to evolve.
    pub evolution_threshold: u64,
    /// Base prepended to token URI fragments.
    pub token_uri_base: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            controller: "controller".to_string(),
            evolution_threshold: DEFAULT_EVOLUTION_THRESHOLD as u64,
            token_uri_base: String::new(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    ///
    /// A missing path yields the defaults; a present but malformed file
    /// is an error (silent fallback would mask operator mistakes).
    pub fn load(path: Option<&Path>) -> Result<Self, ChrysalisError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let raw = std::fs::read_to_string(path).map_err(|e| {
            ChrysalisError::Io(format!("Cannot read config '{}': {}", path.display(), e))
        })?;
        let config: Self = toml::from_str(&raw).map_err(|e| {
            ChrysalisError::Serialization(format!("Invalid config '{}': {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Bounds-check string fields before they reach the engine.
    pub fn validate(&self) -> Result<(), ChrysalisError> {
        if self.controller.is_empty() || self.controller.len() > MAX_PRINCIPAL_LENGTH {
            return Err(ChrysalisError::Serialization(format!(
                "controller must be 1..={} bytes",
                MAX_PRINCIPAL_LENGTH
            )));
        }
        if self.token_uri_base.len() > MAX_URI_BASE_LENGTH {
            return Err(ChrysalisError::Serialization(format!(
                "token_uri_base exceeds {} bytes",
                MAX_URI_BASE_LENGTH
            )));
        }
        Ok(())
    }

    /// The configured controller principal.
    #[must_use]
    pub fn controller_principal(&self) -> Principal {
        Principal::new(&self.controller)
    }

    /// Convert to the core engine configuration.
    #[must_use]
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            evolution_threshold: StakeAmount::new(self.evolution_threshold as u128),
            token_uri_base: self.token_uri_base.clone(),
        }
    }
}

// =============================================================================
// STAKE REPORT SIDECAR
// =============================================================================

/// Load previously reported stake balances from the sidecar JSON file.
///
/// The file maps identity ids to decimal amount strings. A missing file
/// is an empty table; oracle reports simply have not arrived yet.
pub fn load_stakes(path: &Path) -> Result<SharedStakeTable, ChrysalisError> {
    let table = SharedStakeTable::new();
    if !path.exists() {
        return Ok(table);
    }

    let raw = std::fs::read_to_string(path)
        .map_err(|e| ChrysalisError::Io(format!("Cannot read stakes '{}': {}", path.display(), e)))?;
    let entries: BTreeMap<String, String> = serde_json::from_str(&raw).map_err(|e| {
        ChrysalisError::Serialization(format!("Invalid stakes '{}': {}", path.display(), e))
    })?;

    for (id, amount) in entries {
        let id: u64 = id
            .parse()
            .map_err(|_| ChrysalisError::Serialization(format!("Invalid identity id '{}'", id)))?;
        let amount: u128 = amount.parse().map_err(|_| {
            ChrysalisError::Serialization(format!("Invalid stake amount '{}'", amount))
        })?;
        table.set_stake(IdentityId(id), StakeAmount::new(amount));
    }
    Ok(table)
}

/// Persist the current stake-report table to the sidecar JSON file.
pub fn save_stakes(path: &Path, table: &SharedStakeTable) -> Result<(), ChrysalisError> {
    let entries: BTreeMap<String, String> = table
        .entries()
        .into_iter()
        .map(|(id, amount)| (id.0.to_string(), amount.value().to_string()))
        .collect();

    let raw = serde_json::to_string_pretty(&entries)
        .map_err(|e| ChrysalisError::Serialization(e.to_string()))?;
    std::fs::write(path, raw)
        .map_err(|e| ChrysalisError::Io(format!("Cannot write stakes '{}': {}", path.display(), e)))?;
    Ok(())
}

/// Sidecar path derived from the database path.
#[must_use]
pub fn stake_file_for(db_path: &Path) -> std::path::PathBuf {
    let mut name = db_path.as_os_str().to_os_string();
    name.push(".stakes.json");
    std::path::PathBuf::from(name)
}

// =============================================================================
// TESTS
// =============================================================================
