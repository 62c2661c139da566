//! Engine configuration
//!
//! Every field has a default, so an empty TOML document is a valid config:
//!
//! ```toml
//! seed = 42
//!
//! [pool]
//! capacity = 20
//! easy_streak_purge_threshold = 2
//!
//! [selector]
//! exploration_every = 5
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

// ============================================================================
// POOL CONFIG
// ============================================================================

/// Configuration for the Leitner review pool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Maximum number of entries per user
    pub capacity: usize,
    /// Easy streak at which an entry becomes a purge candidate
    pub easy_streak_purge_threshold: u32,
    /// Any level above this resets every level of the user to zero
    pub level_ceiling: u32,
    /// Level assigned to entries joining an empty pool
    pub min_level: u32,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            capacity: 20,
            easy_streak_purge_threshold: 2,
            level_ceiling: 60,
            min_level: 0,
        }
    }
}

// ============================================================================
// SELECTOR CONFIG
// ============================================================================

/// Configuration for the item selector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    /// Look-back window as a share of the session size
    pub lookback_ratio: f64,
    /// Smallest look-back window
    pub lookback_min: usize,
    /// Largest look-back window
    pub lookback_max: usize,
    /// Every n-th selection uses the exploration ordering
    pub exploration_every: usize,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            lookback_ratio: 0.2,
            lookback_min: 3,
            lookback_max: 5,
            exploration_every: 5,
        }
    }
}

// ============================================================================
// SESSION CONFIG
// ============================================================================

/// Configuration for learning sessions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Size used when a session is started without an explicit size
    pub default_size: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { default_size: 20 }
    }
}

// ============================================================================
// ENGINE CONFIG
// ============================================================================

/// Top-level engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub pool: PoolConfig,
    pub selector: SelectorConfig,
    pub session: SessionConfig,
    /// Seed for all random draws; unseeded when absent
    pub seed: Option<u64>,
}

impl EngineConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: EngineConfig =
            toml::from_str(source).map_err(|e| EngineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path).map_err(|e| {
            EngineError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&source)
    }

    /// Reject settings the engine cannot operate with
    pub fn validate(&self) -> Result<()> {
        if self.pool.capacity == 0 {
            return Err(EngineError::Config("pool.capacity must be positive".into()));
        }
        if self.pool.easy_streak_purge_threshold == 0 {
            return Err(EngineError::Config(
                "pool.easy_streak_purge_threshold must be positive".into(),
            ));
        }
        if self.selector.lookback_min > self.selector.lookback_max {
            return Err(EngineError::Config(format!(
                "selector.lookback_min ({}) exceeds selector.lookback_max ({})",
                self.selector.lookback_min, self.selector.lookback_max
            )));
        }
        if !(0.0..=1.0).contains(&self.selector.lookback_ratio) {
            return Err(EngineError::Config(
                "selector.lookback_ratio must be within 0.0..=1.0".into(),
            ));
        }
        if self.selector.exploration_every == 0 {
            return Err(EngineError::Config(
                "selector.exploration_every must be positive".into(),
            ));
        }
        if self.session.default_size == 0 {
            return Err(EngineError::Config(
                "session.default_size must be positive".into(),
            ));
        }
        Ok(())
    }
}
