use serde::{Deserialize, Serialize};
use slotmap::new_key_type;
use tsify_next::Tsify;

// ============================================================================
// IDs - Using slotmap for generational indices
// ============================================================================

new_key_type! {
    pub struct CityId;
    pub struct PlayerId;
}

/// Trait for converting SlotMap keys to u64 for WASM boundary
pub trait KeyToU64 {
    fn to_u64(self) -> u64;
}

impl KeyToU64 for CityId {
    fn to_u64(self) -> u64 {
        self.0.as_ffi()
    }
}

impl KeyToU64 for PlayerId {
    fn to_u64(self) -> u64 {
        self.0.as_ffi()
    }
}

// ============================================================================
// Goods - The commodities traded between the Hanseatic towns
// ============================================================================

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Tsify,
)]
#[tsify(into_wasm_abi, from_wasm_abi)]
#[serde(rename_all = "snake_case")]
pub enum Good {
    // Textiles
    Linen,
    Broadcloth,
    Clothing,
    // Forestry
    Wood,
    Charcoal,
    Pitch,
    // Farming
    Grain,
    Honey,
    Hemp,
    Flax,
    Spices,
    Dyes,
    // Alcohol
    Wine,
    Mead,
    Beer,
    // Fishing
    Fish,
    Oil,
    Salt,
    // Ranching
    Meat,
    Cheese,
    Pelts,
    Wool,
    // Mining
    Iron,
    Gems,
    // Manufactured
    Tools,
    Weapons,
    Armor,
    Jewelry,
    Furniture,
}

const ALL_GOODS: [Good; 29] = [
    Good::Linen,
    Good::Broadcloth,
    Good::Clothing,
    Good::Wood,
    Good::Charcoal,
    Good::Pitch,
    Good::Grain,
    Good::Honey,
    Good::Hemp,
    Good::Flax,
    Good::Spices,
    Good::Dyes,
    Good::Wine,
    Good::Mead,
    Good::Beer,
    Good::Fish,
    Good::Oil,
    Good::Salt,
    Good::Meat,
    Good::Cheese,
    Good::Pelts,
    Good::Wool,
    Good::Iron,
    Good::Gems,
    Good::Tools,
    Good::Weapons,
    Good::Armor,
    Good::Jewelry,
    Good::Furniture,
];

impl Good {
    /// Returns an iterator over all goods
    pub fn all() -> impl Iterator<Item = Good> {
        ALL_GOODS.into_iter()
    }

    /// Lowercase identifier, matching the serde name
    pub fn name(&self) -> &'static str {
        match self {
            Good::Linen => "linen",
            Good::Broadcloth => "broadcloth",
            Good::Clothing => "clothing",
            Good::Wood => "wood",
            Good::Charcoal => "charcoal",
            Good::Pitch => "pitch",
            Good::Grain => "grain",
            Good::Honey => "honey",
            Good::Hemp => "hemp",
            Good::Flax => "flax",
            Good::Spices => "spices",
            Good::Dyes => "dyes",
            Good::Wine => "wine",
            Good::Mead => "mead",
            Good::Beer => "beer",
            Good::Fish => "fish",
            Good::Oil => "oil",
            Good::Salt => "salt",
            Good::Meat => "meat",
            Good::Cheese => "cheese",
            Good::Pelts => "pelts",
            Good::Wool => "wool",
            Good::Iron => "iron",
            Good::Gems => "gems",
            Good::Tools => "tools",
            Good::Weapons => "weapons",
            Good::Armor => "armor",
            Good::Jewelry => "jewelry",
            Good::Furniture => "furniture",
        }
    }
}

impl std::fmt::Display for Good {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
#[serde(rename_all = "snake_case")]
pub enum GoodCategory {
    Textiles,
    Forestry,
    Farming,
    Alcohol,
    Fishing,
    Ranching,
    Mining,
    ManufacturedItems,
}

// ============================================================================
// Regions
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub enum Region {
    EnglishChannel,
    NorthSea,
    SouthBaltic,
    NorthBaltic,
}

// ============================================================================
// Market Levels - Shifts applied to a good's demand or supply curve
// ============================================================================

/// Ordered from scarcest to most plentiful. The multiplier scales a curve's mean.
macro_rules! market_level {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            Copy,
            Default,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            Serialize,
            Deserialize,
            Tsify,
        )]
        #[tsify(into_wasm_abi, from_wasm_abi)]
        pub enum $name {
            Absent,
            Low,
            Reduced,
            #[default]
            Normal,
            Elevated,
            High,
            Extreme,
        }

        impl $name {
            pub fn multiplier(&self) -> f64 {
                match self {
                    Self::Absent => 0.25,
                    Self::Low => 0.5,
                    Self::Reduced => 0.75,
                    Self::Normal => 1.0,
                    Self::Elevated => 1.25,
                    Self::High => 1.5,
                    Self::Extreme => 2.0,
                }
            }

            /// One notch higher; saturates at `Extreme`
            pub fn step_up(self) -> Self {
                match self {
                    Self::Absent => Self::Low,
                    Self::Low => Self::Reduced,
                    Self::Reduced => Self::Normal,
                    Self::Normal => Self::Elevated,
                    Self::Elevated => Self::High,
                    Self::High | Self::Extreme => Self::Extreme,
                }
            }

            /// One notch lower; saturates at `Absent`
            pub fn step_down(self) -> Self {
                match self {
                    Self::Absent | Self::Low => Self::Absent,
                    Self::Reduced => Self::Low,
                    Self::Normal => Self::Reduced,
                    Self::Elevated => Self::Normal,
                    Self::High => Self::Elevated,
                    Self::Extreme => Self::High,
                }
            }
        }
    };
}

market_level!(DemandLevel);
market_level!(SupplyLevel);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_goods_are_distinct_and_named() {
        let names: std::collections::HashSet<&str> = Good::all().map(|g| g.name()).collect();
        assert_eq!(names.len(), 29);
    }

    #[test]
    fn serde_name_matches_display() {
        for good in Good::all() {
            let json = serde_json::to_string(&good).unwrap();
            assert_eq!(json, format!("\"{}\"", good));
        }
    }

    #[test]
    fn levels_saturate_at_the_ends() {
        assert_eq!(DemandLevel::Extreme.step_up(), DemandLevel::Extreme);
        assert_eq!(SupplyLevel::Absent.step_down(), SupplyLevel::Absent);
        assert_eq!(DemandLevel::Normal.step_up().step_down(), DemandLevel::Normal);
        assert!(SupplyLevel::Low < SupplyLevel::High);
        assert_eq!(DemandLevel::default().multiplier(), 1.0);
    }
}
