// World state: the cities, their markets and the players trading in them

use std::sync::Arc;

use rand::SeedableRng;
use rand::rngs::StdRng;
use slotmap::{SecondaryMap, SlotMap};

use crate::catalog::GoodsCatalog;
use crate::conditions::roll_conditions;
use crate::config::MarketConfig;
use crate::equilibrium::EquilibriumSolver;
use crate::error::TradeError;
use crate::market::{DayReport, Market, MarketUpdater, PlannedUpdate};
use crate::parallel;
use crate::trade::{self, Player, Transaction};
use crate::types::{CityId, Good, PlayerId, Region};

/// The Hanseatic trading towns and the waters they sit on
pub const HANSEATIC_CITIES: [(&str, Region); 18] = [
    ("antwerp", Region::EnglishChannel),
    ("bruges", Region::EnglishChannel),
    ("cologne", Region::EnglishChannel),
    ("london", Region::EnglishChannel),
    ("bergen", Region::NorthSea),
    ("bremen", Region::NorthSea),
    ("hamburg", Region::NorthSea),
    ("kampen", Region::NorthSea),
    ("danzig", Region::SouthBaltic),
    ("lubeck", Region::SouthBaltic),
    ("malmo", Region::SouthBaltic),
    ("rostock", Region::SouthBaltic),
    ("stralsund", Region::SouthBaltic),
    ("novorod", Region::NorthBaltic),
    ("riga", Region::NorthBaltic),
    ("stockholm", Region::NorthBaltic),
    ("tallinn", Region::NorthBaltic),
    ("visby", Region::NorthBaltic),
];

#[derive(Debug, Clone, PartialEq)]
pub struct City {
    pub name: String,
    pub region: Region,
    pub market: Market,
}

#[derive(Debug, Clone)]
pub struct World {
    pub day: u64,
    pub cities: SlotMap<CityId, City>,
    pub players: SlotMap<PlayerId, Player>,
    updater: MarketUpdater,
    config: MarketConfig,
    rng: StdRng,
}

impl World {
    pub fn new(config: MarketConfig, catalog: GoodsCatalog) -> Self {
        let updater = MarketUpdater::new(
            Arc::new(catalog),
            EquilibriumSolver::new(config.solver),
            config.restock,
        );
        Self {
            day: 0,
            cities: SlotMap::with_key(),
            players: SlotMap::with_key(),
            updater,
            rng: StdRng::seed_from_u64(config.seed),
            config,
        }
    }

    /// Every Hanseatic city stocked from the built-in goods table
    pub fn hanseatic(config: MarketConfig) -> Self {
        let mut world = Self::new(config, GoodsCatalog::hanseatic());
        for (name, region) in HANSEATIC_CITIES {
            world.add_city(name, region);
        }
        world
    }

    pub fn config(&self) -> &MarketConfig {
        &self.config
    }

    pub fn catalog(&self) -> &GoodsCatalog {
        self.updater.catalog()
    }

    // === City Management ===

    pub fn add_city(&mut self, name: impl Into<String>, region: Region) -> CityId {
        let market = Market::stocked(self.updater.catalog(), self.config.initial_quantity);
        self.cities.insert(City {
            name: name.into(),
            region,
            market,
        })
    }

    pub fn city(&self, id: CityId) -> Option<&City> {
        self.cities.get(id)
    }

    pub fn city_mut(&mut self, id: CityId) -> Option<&mut City> {
        self.cities.get_mut(id)
    }

    pub fn city_by_name(&self, name: &str) -> Option<CityId> {
        self.cities
            .iter()
            .find(|(_, c)| c.name == name)
            .map(|(id, _)| id)
    }

    pub fn cities_in(&self, region: Region) -> Vec<CityId> {
        self.cities
            .iter()
            .filter(|(_, c)| c.region == region)
            .map(|(id, _)| id)
            .collect()
    }

    // === Player Management ===

    pub fn add_player(&mut self, name: impl Into<String>, city: CityId) -> Result<PlayerId, TradeError> {
        let market = &self.cities.get(city).ok_or(TradeError::UnknownCity)?.market;
        let mut player = Player::new(name, city, self.config.starting_gold);
        player.observe(market);
        Ok(self.players.insert(player))
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(id)
    }

    /// Put the player in another city's market. Travel itself is not modelled.
    pub fn relocate_player(&mut self, id: PlayerId, city: CityId) -> Result<(), TradeError> {
        let market = &self.cities.get(city).ok_or(TradeError::UnknownCity)?.market;
        let player = self.players.get_mut(id).ok_or(TradeError::UnknownPlayer)?;
        player.location = city;
        player.observe(market);
        Ok(())
    }

    pub fn buy(&mut self, id: PlayerId, good: Good, quantity: u32) -> Result<Transaction, TradeError> {
        let player = self.players.get_mut(id).ok_or(TradeError::UnknownPlayer)?;
        let city = self.cities.get_mut(player.location).ok_or(TradeError::UnknownCity)?;
        trade::buy(player, &mut city.market, good, quantity)
    }

    pub fn sell(&mut self, id: PlayerId, good: Good, quantity: u32) -> Result<Transaction, TradeError> {
        let player = self.players.get_mut(id).ok_or(TradeError::UnknownPlayer)?;
        let city = self.cities.get_mut(player.location).ok_or(TradeError::UnknownCity)?;
        trade::sell(player, &mut city.market, good, quantity)
    }

    // === Daily Update ===

    /// Advance one day: roll market conditions, solve every (city, good) pair,
    /// then write the new quotes city by city.
    pub fn advance_day(&mut self) -> DayReport {
        self.day += 1;
        let day = self.day;

        let volatility = self.config.conditions.volatility;
        if volatility > 0.0 {
            for city in self.cities.values_mut() {
                roll_conditions(&mut city.market, &mut self.rng, volatility);
            }
        }

        // Solving reads quotes only; nothing is written until every city has a plan.
        let jobs: Vec<(CityId, Good)> = self
            .cities
            .iter()
            .flat_map(|(id, city)| city.market.quotes().map(move |(good, _)| (id, good)))
            .collect();

        let updater = &self.updater;
        let cities = &self.cities;
        let solved: Vec<(CityId, Option<PlannedUpdate>)> = parallel::map_slice(
            &jobs,
            |&(id, good)| {
                let planned = cities[id]
                    .market
                    .quote(good)
                    .and_then(|quote| updater.solve_quote(good, quote));
                (id, planned)
            },
            self.config.force_sequential,
        );

        let mut plans: SecondaryMap<CityId, Vec<PlannedUpdate>> = SecondaryMap::new();
        for (id, planned) in solved {
            if let Some(entry) = plans.entry(id) {
                let plan = entry.or_default();
                plan.extend(planned);
            }
        }

        let mut report = DayReport::new(day);
        for (id, plan) in plans {
            if let Some(city) = self.cities.get_mut(id) {
                report.merge(self.updater.commit(&city.name, day, &mut city.market, plan));
            }
        }

        for player in self.players.values_mut() {
            if let Some(city) = self.cities.get(player.location) {
                player.observe(&city.market);
            }
        }

        if !report.is_clean() {
            tracing::warn!(
                day,
                clamped = report.clamped.len(),
                failed = report.failures.len(),
                "day finished with unpriced or clamped goods"
            );
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hanseatic_world_has_every_city() {
        let world = World::hanseatic(MarketConfig::default());
        assert_eq!(world.cities.len(), 18);
        assert!(world.city_by_name("lubeck").is_some());
        assert!(world.city_by_name("atlantis").is_none());
        assert_eq!(world.cities_in(Region::NorthSea).len(), 4);
        assert_eq!(world.cities_in(Region::NorthBaltic).len(), 5);

        let riga = world.city(world.city_by_name("riga").unwrap()).unwrap();
        assert_eq!(riga.market.len(), 29);
        assert_eq!(riga.market.quote(Good::Wood).unwrap().current_price, 30);
    }

    #[test]
    fn advance_day_reprices_every_city() {
        let mut world = World::hanseatic(MarketConfig::default());
        let report = world.advance_day();

        assert_eq!(world.day, 1);
        assert_eq!(report.day, 1);
        assert!(report.is_clean(), "{report:?}");
        assert_eq!(report.updated, 18 * 29);

        for city in world.cities.values() {
            let wood = city.market.quote(Good::Wood).unwrap();
            assert_eq!(wood.current_price, 15, "{}", city.name);
            assert_eq!(wood.previous_price, 30);
            assert_eq!(wood.current_quantity, 50);
        }
    }

    #[test]
    fn repeated_days_are_stable_without_volatility() {
        let mut world = World::hanseatic(MarketConfig::default());
        world.advance_day();
        let first: Vec<_> = world.cities.values().map(|c| c.market.listings()).collect();
        world.advance_day();
        let second: Vec<_> = world.cities.values().map(|c| c.market.listings()).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn same_seed_same_prices_with_volatility() {
        let config = MarketConfig {
            conditions: crate::conditions::ConditionsConfig { volatility: 0.4 },
            ..MarketConfig::default()
        };
        let run = || {
            let mut world = World::hanseatic(config.clone());
            for _ in 0..5 {
                world.advance_day();
            }
            world.cities.values().map(|c| c.market.clone()).collect::<Vec<_>>()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn players_trade_at_their_location() {
        let mut world = World::hanseatic(MarketConfig::default());
        let lubeck = world.city_by_name("lubeck").unwrap();
        let bergen = world.city_by_name("bergen").unwrap();
        let hanna = world.add_player("hanna", lubeck).unwrap();
        assert_eq!(world.player(hanna).unwrap().gold, 1000);

        world.buy(hanna, Good::Fish, 5).unwrap();
        assert_eq!(world.city(lubeck).unwrap().market.quote(Good::Fish).unwrap().current_quantity, 95);
        assert_eq!(world.city(bergen).unwrap().market.quote(Good::Fish).unwrap().current_quantity, 100);

        world.relocate_player(hanna, bergen).unwrap();
        world.sell(hanna, Good::Fish, 5).unwrap();
        assert_eq!(world.city(bergen).unwrap().market.quote(Good::Fish).unwrap().current_quantity, 105);
        assert_eq!(world.player(hanna).unwrap().gold, 1000);
    }

    #[test]
    fn unknown_ids_are_errors() {
        let mut world = World::hanseatic(MarketConfig::default());
        let lubeck = world.city_by_name("lubeck").unwrap();
        let hanna = world.add_player("hanna", lubeck).unwrap();

        let mut other = World::hanseatic(MarketConfig::default());
        other.cities.clear();
        assert_eq!(other.add_player("x", lubeck), Err(TradeError::UnknownCity));

        world.players.remove(hanna);
        assert_eq!(world.buy(hanna, Good::Wood, 1), Err(TradeError::UnknownPlayer));
    }
}
