//! Pool configuration structures.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

/// Declarative capacity table for one allocation pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Resource key to capacity.
    pub resources: BTreeMap<String, i64>,
}

/// Root configuration: named allocation pools.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FoundryConfig {
    /// Map of pool name to capacity table.
    pub pools: HashMap<String, PoolConfig>,
}

impl PoolConfig {
    /// Validate pool configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.resources.is_empty() {
            return Err("at least one resource must be defined".into());
        }
        for (key, capacity) in &self.resources {
            if key.trim().is_empty() {
                return Err("resource keys must be non-empty".into());
            }
            if *capacity < 0 {
                return Err(format!("resource `{key}` has negative capacity {capacity}"));
            }
        }
        Ok(())
    }
}

impl FoundryConfig {
    /// Validate all pools and ensure at least one pool exists.
    pub fn validate(&self) -> Result<(), String> {
        if self.pools.is_empty() {
            return Err("at least one pool must be defined".into());
        }
        for (name, pool) in &self.pools {
            pool.validate()
                .map_err(|e| format!("pool `{name}` invalid: {e}"))?;
        }
        Ok(())
    }

    /// Parse foundry configuration from a JSON string and validate.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: FoundryConfig =
            serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }
}
