use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tsify_next::Tsify;

use crate::catalog::GoodsCatalog;
use crate::conditions;
use crate::equilibrium::{DemandCurve, Equilibrium, EquilibriumSolver, SupplyCurve};
use crate::error::SolveError;
use crate::types::{DemandLevel, Good, SupplyLevel};

// ============================================================================
// Market Quote - One good's price and stock in one city
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi)]
pub struct MarketQuote {
    pub current_price: u32,
    pub current_quantity: u32,
    pub previous_price: u32,
    pub previous_quantity: u32,
    pub demand_level: DemandLevel,
    pub supply_level: SupplyLevel,
    pub previous_demand_level: DemandLevel,
    pub previous_supply_level: SupplyLevel,
}

/// What `MarketQuote::apply` did to the price
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuoteChange {
    /// Solver output before clamping and rounding
    pub raw_price: f64,
    pub clamped: bool,
}

impl MarketQuote {
    pub fn new(price: u32, quantity: u32) -> Self {
        Self {
            current_price: price,
            current_quantity: quantity,
            previous_price: price,
            previous_quantity: quantity,
            demand_level: DemandLevel::Normal,
            supply_level: SupplyLevel::Normal,
            previous_demand_level: DemandLevel::Normal,
            previous_supply_level: SupplyLevel::Normal,
        }
    }

    pub fn restock(&mut self, baseline: u32) {
        self.current_quantity = baseline;
    }

    /// Move today's figures into `previous_*` and price from the equilibrium.
    /// Negative prices clamp to zero.
    pub fn apply(&mut self, eq: &Equilibrium) -> QuoteChange {
        let clamped = eq.price < 0.0;
        let price = eq.price.max(0.0).round();
        let quantity = (eq.fraction.clamp(0.0, 1.0) * f64::from(self.current_quantity)).round();

        // Float-to-int casts saturate, so absurd prices pin at u32::MAX
        *self = MarketQuote {
            current_price: price as u32,
            current_quantity: quantity as u32,
            previous_price: self.current_price,
            previous_quantity: self.current_quantity,
            ..*self
        };

        QuoteChange {
            raw_price: eq.price,
            clamped,
        }
    }

    pub fn price_change(&self) -> i64 {
        i64::from(self.current_price) - i64::from(self.previous_price)
    }

    pub fn quantity_change(&self) -> i64 {
        i64::from(self.current_quantity) - i64::from(self.previous_quantity)
    }
}

// ============================================================================
// Market - All quotes for one city
// ============================================================================

/// One row of the price board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi)]
pub struct Listing {
    pub good: Good,
    pub price: u32,
    pub quantity: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Market {
    quotes: BTreeMap<Good, MarketQuote>,
}

impl Market {
    /// Every catalog good at its rounded base price
    pub fn stocked(catalog: &GoodsCatalog, initial_quantity: u32) -> Self {
        let quotes = catalog
            .goods()
            .map(|(good, spec)| {
                let price = spec.base_price.max(0.0).round() as u32;
                (good, MarketQuote::new(price, initial_quantity))
            })
            .collect();
        Self { quotes }
    }

    pub fn quote(&self, good: Good) -> Option<&MarketQuote> {
        self.quotes.get(&good)
    }

    pub fn quote_mut(&mut self, good: Good) -> Option<&mut MarketQuote> {
        self.quotes.get_mut(&good)
    }

    pub fn quotes(&self) -> impl Iterator<Item = (Good, &MarketQuote)> {
        self.quotes.iter().map(|(g, q)| (*g, q))
    }

    pub fn quotes_mut(&mut self) -> impl Iterator<Item = &mut MarketQuote> {
        self.quotes.values_mut()
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }

    pub fn listings(&self) -> Vec<Listing> {
        self.quotes()
            .map(|(good, q)| Listing {
                good,
                price: q.current_price,
                quantity: q.current_quantity,
            })
            .collect()
    }
}

// ============================================================================
// Day Report
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct PriceClamp {
    pub city: String,
    pub good: Good,
    pub raw_price: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateFailure {
    pub city: String,
    pub good: Good,
    pub error: SolveError,
}

/// Outcome of one day's update, for one city or merged across many
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DayReport {
    pub day: u64,
    pub updated: usize,
    pub clamped: Vec<PriceClamp>,
    pub failures: Vec<UpdateFailure>,
}

impl DayReport {
    pub fn new(day: u64) -> Self {
        Self {
            day,
            ..Default::default()
        }
    }

    pub fn merge(&mut self, other: DayReport) {
        self.updated += other.updated;
        self.clamped.extend(other.clamped);
        self.failures.extend(other.failures);
    }

    pub fn is_clean(&self) -> bool {
        self.clamped.is_empty() && self.failures.is_empty()
    }
}

// ============================================================================
// Market Updater - Daily re-pricing
// ============================================================================

pub type PlannedUpdate = (Good, Result<Equilibrium, SolveError>);

/// Re-prices markets from the shared catalog. Solving is pure and touches no
/// quote, so plans for many cities can be computed side by side and committed
/// afterwards.
#[derive(Debug, Clone)]
pub struct MarketUpdater {
    catalog: Arc<GoodsCatalog>,
    solver: EquilibriumSolver,
    restock: Option<u32>,
}

impl MarketUpdater {
    pub fn new(catalog: Arc<GoodsCatalog>, solver: EquilibriumSolver, restock: Option<u32>) -> Self {
        Self {
            catalog,
            solver,
            restock,
        }
    }

    pub fn catalog(&self) -> &GoodsCatalog {
        &self.catalog
    }

    pub fn solver(&self) -> &EquilibriumSolver {
        &self.solver
    }

    /// Catalog curves shifted by the quote's demand and supply levels
    pub fn curves_for(&self, good: Good, quote: &MarketQuote) -> Option<(DemandCurve, SupplyCurve)> {
        let (demand, supply) = self.catalog.curves(good)?;
        Some(conditions::shifted(
            demand,
            supply,
            quote.demand_level,
            quote.supply_level,
        ))
    }

    /// Solve one quote. `None` when the catalog does not know the good.
    pub fn solve_quote(&self, good: Good, quote: &MarketQuote) -> Option<PlannedUpdate> {
        let (demand, supply) = self.curves_for(good, quote)?;
        Some((good, self.solver.solve(&demand, &supply)))
    }

    pub fn plan(&self, market: &Market) -> Vec<PlannedUpdate> {
        market
            .quotes()
            .filter_map(|(good, quote)| {
                let planned = self.solve_quote(good, quote);
                if planned.is_none() {
                    tracing::warn!(good = good.name(), "good missing from catalog; not priced");
                }
                planned
            })
            .collect()
    }

    /// Write solved equilibria into `market`. Failed goods keep yesterday's quote.
    pub fn commit(
        &self,
        city: &str,
        day: u64,
        market: &mut Market,
        plan: Vec<PlannedUpdate>,
    ) -> DayReport {
        let mut report = DayReport::new(day);

        for (good, result) in plan {
            let Some(quote) = market.quote_mut(good) else {
                continue;
            };

            let eq = match result {
                Ok(eq) => eq,
                Err(error) => {
                    if error.is_configuration() {
                        tracing::error!(
                            city,
                            good = good.name(),
                            %error,
                            "bad curve parameters; quote skipped"
                        );
                    } else {
                        tracing::warn!(
                            city,
                            good = good.name(),
                            %error,
                            "no equilibrium; keeping previous quote"
                        );
                    }
                    report.failures.push(UpdateFailure {
                        city: city.to_string(),
                        good,
                        error,
                    });
                    continue;
                }
            };

            let mut next = *quote;
            if let Some(baseline) = self.restock {
                next.restock(baseline);
            }
            let change = next.apply(&eq);
            *quote = next;
            report.updated += 1;

            if change.clamped {
                tracing::warn!(
                    city,
                    good = good.name(),
                    raw_price = change.raw_price,
                    "negative equilibrium price clamped to zero"
                );
                #[cfg(feature = "instrument")]
                tracing::info!(
                    target: "price_clamp",
                    day,
                    city,
                    good = good.name(),
                    raw_price = change.raw_price,
                );
                report.clamped.push(PriceClamp {
                    city: city.to_string(),
                    good,
                    raw_price: change.raw_price,
                });
            }

            #[cfg(feature = "instrument")]
            tracing::info!(
                target: "market_update",
                day,
                city,
                good = good.name(),
                price = next.current_price,
                quantity = next.current_quantity,
                previous_price = next.previous_price,
                previous_quantity = next.previous_quantity,
                raw_price = eq.price,
                fraction = eq.fraction,
                iterations = eq.iterations,
            );
        }

        report
    }

    pub fn update(&self, city: &str, day: u64, market: &mut Market) -> DayReport {
        let plan = self.plan(market);
        self.commit(city, day, market, plan)
    }
}
