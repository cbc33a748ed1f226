use serde::{Deserialize, Serialize};
use tsify_next::Tsify;
use wasm_bindgen::prelude::*;

pub mod catalog;
pub mod conditions;
pub mod config;
pub mod equilibrium;
pub mod error;
pub mod market;
pub mod parallel;
pub mod trade;
pub mod types;
pub mod world;

pub use catalog::{GoodSpec, GoodsCatalog};
pub use conditions::{ConditionsConfig, roll_conditions};
pub use config::MarketConfig;
pub use equilibrium::{
    DemandCurve, Equilibrium, EquilibriumSolver, SolverConfig, SupplyCurve, norm_cdf, norm_sf,
    solve_equilibrium,
};
pub use error::{ConfigError, ConvergenceError, CurveSide, SolveError, TradeError};
pub use market::{DayReport, Listing, Market, MarketQuote, MarketUpdater, UpdateFailure};
pub use trade::{Player, PlayerHolding, Side, Transaction};
pub use types::*;
pub use world::{City, HANSEATIC_CITIES, World};

/// City the default player starts in
pub const STARTING_CITY: &str = "lubeck";

// ============================================================================
// Snapshot Types - What the browser front end renders
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi)]
pub struct QuoteSnapshot {
    pub good: Good,
    pub price: u32,
    pub quantity: u32,
    pub previous_price: u32,
    pub previous_quantity: u32,
    pub price_change: i64,
    pub demand_level: DemandLevel,
    pub supply_level: SupplyLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi)]
pub struct MarketSnapshot {
    pub id: u64,
    pub day: u64,
    pub city: String,
    pub region: Region,
    pub quotes: Vec<QuoteSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi)]
pub struct PlayerSnapshot {
    pub name: String,
    pub city: String,
    pub gold: u64,
    pub holdings: Vec<(Good, PlayerHolding)>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi)]
pub struct DaySummary {
    pub day: u64,
    pub updated: u32,
    pub clamped: u32,
    pub failed: u32,
}

impl From<&DayReport> for DaySummary {
    fn from(report: &DayReport) -> Self {
        Self {
            day: report.day,
            updated: report.updated as u32,
            clamped: report.clamped.len() as u32,
            failed: report.failures.len() as u32,
        }
    }
}

// ============================================================================
// WASM API - Simulation
// ============================================================================

#[wasm_bindgen]
pub struct Simulation {
    world: World,
    player: Option<PlayerId>,
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new()
    }
}

#[wasm_bindgen]
impl Simulation {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        // Better panic messages in browser console
        console_error_panic_hook::set_once();
        Self::from_config(MarketConfig::default())
    }

    /// Same world, different random stream for market conditions
    #[wasm_bindgen]
    pub fn with_seed(seed: u64) -> Self {
        console_error_panic_hook::set_once();
        Self::from_config(MarketConfig {
            seed,
            ..MarketConfig::default()
        })
    }

    #[wasm_bindgen]
    pub fn from_config_json(json: &str) -> Result<Simulation, JsError> {
        console_error_panic_hook::set_once();
        Ok(Self::from_config(MarketConfig::from_json(json)?))
    }

    /// Re-price every market for the next day
    #[wasm_bindgen]
    pub fn advance_day(&mut self) -> DaySummary {
        DaySummary::from(&self.world.advance_day())
    }

    #[wasm_bindgen]
    pub fn get_day(&self) -> u64 {
        self.world.day
    }

    #[wasm_bindgen]
    pub fn get_cities(&self) -> Vec<String> {
        self.world.cities.values().map(|c| c.name.clone()).collect()
    }

    #[wasm_bindgen]
    pub fn get_market_snapshot(&self, city: &str) -> Result<MarketSnapshot, JsError> {
        Ok(self.market_snapshot(city).ok_or(TradeError::UnknownCity)?)
    }

    /// The goods table as `{ good: { category, inputs, base_price, ... } }`
    #[wasm_bindgen]
    pub fn get_catalog(&self) -> Result<JsValue, JsError> {
        Ok(serde_wasm_bindgen::to_value(self.world.catalog())?)
    }

    #[wasm_bindgen]
    pub fn get_player(&self) -> Result<PlayerSnapshot, JsError> {
        Ok(self.player_snapshot().ok_or(TradeError::UnknownPlayer)?)
    }

    #[wasm_bindgen]
    pub fn buy(&mut self, good: Good, quantity: u32) -> Result<Transaction, JsError> {
        let player = self.player.ok_or(TradeError::UnknownPlayer)?;
        Ok(self.world.buy(player, good, quantity)?)
    }

    #[wasm_bindgen]
    pub fn sell(&mut self, good: Good, quantity: u32) -> Result<Transaction, JsError> {
        let player = self.player.ok_or(TradeError::UnknownPlayer)?;
        Ok(self.world.sell(player, good, quantity)?)
    }

    /// Move the player to another city's market
    #[wasm_bindgen]
    pub fn move_to(&mut self, city: &str) -> Result<(), JsError> {
        let player = self.player.ok_or(TradeError::UnknownPlayer)?;
        let city = self.world.city_by_name(city).ok_or(TradeError::UnknownCity)?;
        Ok(self.world.relocate_player(player, city)?)
    }
}

impl Simulation {
    pub fn from_config(config: MarketConfig) -> Self {
        let mut world = World::hanseatic(config);
        let player = world
            .city_by_name(STARTING_CITY)
            .and_then(|city| world.add_player("merchant", city).ok());
        Self { world, player }
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn market_snapshot(&self, city: &str) -> Option<MarketSnapshot> {
        let id = self.world.city_by_name(city)?;
        let city = self.world.city(id)?;
        let quotes = city
            .market
            .quotes()
            .map(|(good, q)| QuoteSnapshot {
                good,
                price: q.current_price,
                quantity: q.current_quantity,
                previous_price: q.previous_price,
                previous_quantity: q.previous_quantity,
                price_change: q.price_change(),
                demand_level: q.demand_level,
                supply_level: q.supply_level,
            })
            .collect();
        Some(MarketSnapshot {
            id: id.to_u64(),
            day: self.world.day,
            city: city.name.clone(),
            region: city.region,
            quotes,
        })
    }

    pub fn player_snapshot(&self) -> Option<PlayerSnapshot> {
        let player = self.world.player(self.player?)?;
        let city = self.world.city(player.location)?;
        Some(PlayerSnapshot {
            name: player.name.clone(),
            city: city.name.clone(),
            gold: player.gold,
            holdings: player
                .holdings
                .iter()
                .filter(|(_, h)| h.quantity > 0)
                .map(|(g, h)| (*g, *h))
                .collect(),
        })
    }
}
