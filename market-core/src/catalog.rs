use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::equilibrium::{DemandCurve, SupplyCurve};
use crate::error::ConfigError;
use crate::types::{Good, GoodCategory};

// ============================================================================
// Good Spec - Static description of one commodity
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoodSpec {
    pub category: GoodCategory,
    /// Goods this one is made from. Informational only.
    #[serde(default)]
    pub inputs: Vec<Good>,
    pub base_price: f64,
    /// Overrides the `base_price / 4` default
    #[serde(default)]
    pub demand_spread: Option<f64>,
    #[serde(default)]
    pub supply_spread: Option<f64>,
}

impl GoodSpec {
    fn new(category: GoodCategory, base_price: f64, inputs: &[Good]) -> Self {
        Self {
            category,
            inputs: inputs.to_vec(),
            base_price,
            demand_spread: None,
            supply_spread: None,
        }
    }

    /// Both curves centre on half the base price
    pub fn mean(&self) -> f64 {
        self.base_price / 2.0
    }

    pub fn default_spread(&self) -> f64 {
        self.base_price / 4.0
    }

    pub fn demand_curve(&self) -> DemandCurve {
        DemandCurve::new(
            self.mean(),
            self.demand_spread.unwrap_or_else(|| self.default_spread()),
        )
    }

    pub fn supply_curve(&self) -> SupplyCurve {
        SupplyCurve::new(
            self.mean(),
            self.supply_spread.unwrap_or_else(|| self.default_spread()),
        )
    }

    fn validate(&self, good: Good) -> Result<(), ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidGood { good, reason };
        if !self.base_price.is_finite() || self.base_price <= 0.0 {
            return Err(invalid(format!(
                "base_price must be positive, got {}",
                self.base_price
            )));
        }
        for (name, spread) in [
            ("demand_spread", self.demand_spread),
            ("supply_spread", self.supply_spread),
        ] {
            if let Some(s) = spread.filter(|s| !s.is_finite() || *s <= 0.0) {
                return Err(invalid(format!("{name} must be positive, got {s}")));
            }
        }
        if self.inputs.contains(&good) {
            return Err(invalid("lists itself as an input".to_string()));
        }
        Ok(())
    }
}

// ============================================================================
// Goods Catalog - Read-only table shared by every market
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GoodsCatalog {
    goods: BTreeMap<Good, GoodSpec>,
}

impl GoodsCatalog {
    pub fn new(goods: BTreeMap<Good, GoodSpec>) -> Result<Self, ConfigError> {
        for (good, spec) in &goods {
            spec.validate(*good)?;
        }
        Ok(Self { goods })
    }

    /// Load a `{ "wood": { "category": "forestry", "base_price": 30, ... } }` table
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let goods: BTreeMap<Good, GoodSpec> = serde_json::from_str(json)?;
        Self::new(goods)
    }

    /// The full Baltic / North Sea table
    pub fn hanseatic() -> Self {
        use Good::*;
        use GoodCategory::*;

        let table: [(Good, GoodSpec); 29] = [
            (Linen, GoodSpec::new(Textiles, 10.0, &[Hemp, Flax])),
            (Broadcloth, GoodSpec::new(Textiles, 100.0, &[Wool, Dyes])),
            (Clothing, GoodSpec::new(Textiles, 120.0, &[Linen, Wool, Pelts, Dyes])),
            (Wood, GoodSpec::new(Forestry, 30.0, &[])),
            (Charcoal, GoodSpec::new(Forestry, 50.0, &[Wood])),
            (Pitch, GoodSpec::new(Forestry, 80.0, &[Wood])),
            (Grain, GoodSpec::new(Farming, 30.0, &[])),
            (Honey, GoodSpec::new(Farming, 50.0, &[])),
            (Hemp, GoodSpec::new(Farming, 80.0, &[])),
            (Flax, GoodSpec::new(Farming, 50.0, &[])),
            (Spices, GoodSpec::new(Farming, 200.0, &[])),
            (Dyes, GoodSpec::new(Farming, 120.0, &[])),
            (Wine, GoodSpec::new(Alcohol, 150.0, &[])),
            (Mead, GoodSpec::new(Alcohol, 80.0, &[Honey])),
            (Beer, GoodSpec::new(Alcohol, 60.0, &[Grain])),
            (Fish, GoodSpec::new(Fishing, 60.0, &[Salt])),
            (Oil, GoodSpec::new(Fishing, 100.0, &[Fish])),
            (Salt, GoodSpec::new(Fishing, 50.0, &[])),
            (Meat, GoodSpec::new(Ranching, 120.0, &[Salt])),
            (Cheese, GoodSpec::new(Ranching, 200.0, &[Salt])),
            (Pelts, GoodSpec::new(Ranching, 150.0, &[])),
            (Wool, GoodSpec::new(Ranching, 90.0, &[])),
            (Iron, GoodSpec::new(Mining, 100.0, &[])),
            (Gems, GoodSpec::new(Mining, 400.0, &[])),
            (Tools, GoodSpec::new(ManufacturedItems, 150.0, &[Wood, Iron])),
            (Weapons, GoodSpec::new(ManufacturedItems, 200.0, &[Wood, Iron, Tools])),
            (
                Armor,
                GoodSpec::new(ManufacturedItems, 300.0, &[Wood, Iron, Tools, Clothing]),
            ),
            (Jewelry, GoodSpec::new(ManufacturedItems, 1000.0, &[Iron, Gems, Tools])),
            (
                Furniture,
                GoodSpec::new(ManufacturedItems, 200.0, &[Wood, Linen, Pelts, Iron]),
            ),
        ];

        Self {
            goods: table.into_iter().collect(),
        }
    }

    pub fn spec(&self, good: Good) -> Option<&GoodSpec> {
        self.goods.get(&good)
    }

    pub fn goods(&self) -> impl Iterator<Item = (Good, &GoodSpec)> {
        self.goods.iter().map(|(g, s)| (*g, s))
    }

    pub fn len(&self) -> usize {
        self.goods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.goods.is_empty()
    }

    /// Goods that list `input` among their inputs
    pub fn with_input(&self, input: Good) -> Vec<Good> {
        self.goods()
            .filter(|(_, spec)| spec.inputs.contains(&input))
            .map(|(good, _)| good)
            .collect()
    }

    pub fn in_category(&self, category: GoodCategory) -> Vec<Good> {
        self.goods()
            .filter(|(_, spec)| spec.category == category)
            .map(|(good, _)| good)
            .collect()
    }

    /// Unshifted demand and supply curves for `good`
    pub fn curves(&self, good: Good) -> Option<(DemandCurve, SupplyCurve)> {
        self.spec(good)
            .map(|spec| (spec.demand_curve(), spec.supply_curve()))
    }
}
