use thiserror::Error;

use crate::types::Good;

/// Which of the two curves a bad parameter belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurveSide {
    Demand,
    Supply,
}

impl std::fmt::Display for CurveSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CurveSide::Demand => f.write_str("demand"),
            CurveSide::Supply => f.write_str("supply"),
        }
    }
}

/// The root search ran but could not pin down a crossing.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConvergenceError {
    #[error("no sign change within {expansions} bracket expansions from {guess}")]
    NoBracket { guess: f64, expansions: u32 },

    #[error("both shares underflow near {price}; crossing is not determined")]
    Degenerate { price: f64 },

    #[error("iteration limit {limit} reached at price {price} (residual {residual})")]
    IterationLimit { limit: u32, price: f64, residual: f64 },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolveError {
    #[error("invalid {side} {param}: {value}")]
    InvalidParameter {
        side: CurveSide,
        param: &'static str,
        value: f64,
    },

    #[error("invalid initial guess: {value}")]
    InvalidGuess { value: f64 },

    #[error("equilibrium search failed: {0}")]
    Convergence(#[from] ConvergenceError),
}

impl SolveError {
    /// Bad inputs point at malformed configuration rather than numerics.
    pub fn is_configuration(&self) -> bool {
        !matches!(self, SolveError::Convergence(_))
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TradeError {
    #[error("quantity must be positive")]
    ZeroQuantity,

    #[error("{0} is not traded in this market")]
    UnlistedGood(Good),

    #[error("market holds {available} {good}, {requested} requested")]
    InsufficientStock {
        good: Good,
        requested: u32,
        available: u32,
    },

    #[error("purchase costs {cost} gold, player has {gold}")]
    InsufficientGold { cost: u64, gold: u64 },

    #[error("player holds {held} {good}, {requested} offered")]
    InsufficientHoldings { good: Good, requested: u32, held: u32 },

    #[error("unknown city")]
    UnknownCity,

    #[error("unknown player")]
    UnknownPlayer,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("malformed configuration: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid entry for {good}: {reason}")]
    InvalidGood { good: Good, reason: String },

    #[error("invalid setting {field}: {reason}")]
    InvalidSetting { field: &'static str, reason: String },
}
