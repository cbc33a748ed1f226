use serde::{Deserialize, Serialize};

use crate::conditions::ConditionsConfig;
use crate::equilibrium::SolverConfig;
use crate::error::ConfigError;

/// Gold a new player starts with
pub const STARTING_GOLD: u64 = 1000;

/// Tunables for a world's markets. Every field has a default, so a partial
/// JSON document only overrides what it names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketConfig {
    pub solver: SolverConfig,
    /// Stock each good starts with in a new city
    pub initial_quantity: u32,
    /// Refill level applied before each day's re-pricing; `None` lets stock run down
    pub restock: Option<u32>,
    pub conditions: ConditionsConfig,
    pub seed: u64,
    pub starting_gold: u64,
    /// Solve sequentially even when built with `parallel`
    pub force_sequential: bool,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            solver: SolverConfig::default(),
            initial_quantity: 100,
            restock: Some(100),
            conditions: ConditionsConfig::default(),
            seed: 1393,
            starting_gold: STARTING_GOLD,
            force_sequential: false,
        }
    }
}

impl MarketConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field, reason: String| Err(ConfigError::InvalidSetting { field, reason });

        let s = &self.solver;
        if !s.initial_guess.is_finite() {
            return invalid("solver.initial_guess", format!("must be finite, got {}", s.initial_guess));
        }
        if !(s.price_tolerance.is_finite() && s.price_tolerance > 0.0) {
            return invalid(
                "solver.price_tolerance",
                format!("must be positive, got {}", s.price_tolerance),
            );
        }
        if s.max_iterations == 0 {
            return invalid("solver.max_iterations", "must be at least 1".to_string());
        }
        let v = self.conditions.volatility;
        if !(0.0..=1.0).contains(&v) {
            return invalid("conditions.volatility", format!("must be in [0, 1], got {v}"));
        }
        Ok(())
    }
}
