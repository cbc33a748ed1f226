// Day-to-day market conditions.
//
// Each quote carries a demand level and a supply level. They start at Normal and
// only move when volatility is configured, so a default world prices every good
// purely from the catalog.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::equilibrium::{DemandCurve, SupplyCurve};
use crate::market::{Market, MarketQuote};
use crate::types::{DemandLevel, SupplyLevel};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConditionsConfig {
    /// Chance per good per day that each level moves one notch (0 = frozen)
    pub volatility: f64,
}

/// Shift catalog curves by the quote's levels. Stronger demand raises what buyers
/// will pay; more plentiful supply lowers what sellers ask.
pub fn shifted(
    demand: DemandCurve,
    supply: SupplyCurve,
    demand_level: DemandLevel,
    supply_level: SupplyLevel,
) -> (DemandCurve, SupplyCurve) {
    (
        DemandCurve::new(demand.mean * demand_level.multiplier(), demand.spread),
        SupplyCurve::new(supply.mean / supply_level.multiplier(), supply.spread),
    )
}

/// Random-walk every quote's levels. Previous levels are kept for comparison.
pub fn roll_conditions<R: Rng + ?Sized>(market: &mut Market, rng: &mut R, volatility: f64) {
    let volatility = volatility.clamp(0.0, 1.0);
    for quote in market.quotes_mut() {
        roll_quote(quote, rng, volatility);
    }
}

fn roll_quote<R: Rng + ?Sized>(quote: &mut MarketQuote, rng: &mut R, volatility: f64) {
    quote.previous_demand_level = quote.demand_level;
    quote.previous_supply_level = quote.supply_level;

    if rng.random_bool(volatility) {
        quote.demand_level = if rng.random_bool(0.5) {
            quote.demand_level.step_up()
        } else {
            quote.demand_level.step_down()
        };
    }
    if rng.random_bool(volatility) {
        quote.supply_level = if rng.random_bool(0.5) {
            quote.supply_level.step_up()
        } else {
            quote.supply_level.step_down()
        };
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::catalog::GoodsCatalog;
    use crate::types::Good;

    #[test]
    fn normal_levels_leave_curves_alone() {
        let d = DemandCurve::new(15.0, 7.5);
        let s = SupplyCurve::new(15.0, 7.5);
        assert_eq!(shifted(d, s, DemandLevel::Normal, SupplyLevel::Normal), (d, s));
    }

    #[test]
    fn high_demand_and_scarce_supply_raise_means() {
        let d = DemandCurve::new(20.0, 5.0);
        let s = SupplyCurve::new(20.0, 5.0);
        let (d2, s2) = shifted(d, s, DemandLevel::High, SupplyLevel::Low);
        assert_eq!(d2.mean, 30.0);
        assert_eq!(s2.mean, 40.0);
        assert_eq!(d2.spread, 5.0);
    }

    #[test]
    fn zero_volatility_never_moves() {
        let catalog = GoodsCatalog::hanseatic();
        let mut market = Market::stocked(&catalog, 100);
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            roll_conditions(&mut market, &mut rng, 0.0);
        }
        for quote in market.quotes().map(|(_, q)| q) {
            assert_eq!(quote.demand_level, DemandLevel::Normal);
            assert_eq!(quote.supply_level, SupplyLevel::Normal);
        }
    }

    #[test]
    fn full_volatility_moves_one_notch_and_records_previous() {
        let catalog = GoodsCatalog::hanseatic();
        let mut market = Market::stocked(&catalog, 100);
        let mut rng = StdRng::seed_from_u64(7);
        roll_conditions(&mut market, &mut rng, 1.0);

        let quote = market.quote(Good::Wood).unwrap();
        assert_eq!(quote.previous_demand_level, DemandLevel::Normal);
        assert_ne!(quote.demand_level, DemandLevel::Normal);
        assert!(matches!(
            quote.demand_level,
            DemandLevel::Reduced | DemandLevel::Elevated
        ));
    }

    #[test]
    fn same_seed_same_levels() {
        let catalog = GoodsCatalog::hanseatic();
        let roll = |seed| {
            let mut market = Market::stocked(&catalog, 100);
            let mut rng = StdRng::seed_from_u64(seed);
            for _ in 0..10 {
                roll_conditions(&mut market, &mut rng, 0.3);
            }
            market
        };
        assert_eq!(roll(42), roll(42));
    }
}
