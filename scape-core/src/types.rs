use std::fmt;
use std::ops::{Index, IndexMut};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use slotmap::new_key_type;
use tsify_next::Tsify;

use crate::error::ScapeError;

// ============================================================================
// IDs - Using slotmap for generational indices
// ============================================================================

new_key_type! {
    pub struct AgentId;
}

/// Trait for converting SlotMap keys to u64 for the WASM boundary and event logs
pub trait KeyToU64 {
    fn to_u64(self) -> u64;
}

impl KeyToU64 for AgentId {
    fn to_u64(self) -> u64 {
        self.0.as_ffi()
    }
}

// ============================================================================
// Commodities - The two renewable resources
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
#[serde(rename_all = "snake_case")]
pub enum Commodity {
    Sugar,
    Spice,
}

impl Commodity {
    pub const ALL: [Commodity; 2] = [Commodity::Sugar, Commodity::Spice];

    /// The commodity used to pay for this one in a trade
    pub fn counterpart(self) -> Commodity {
        match self {
            Commodity::Sugar => Commodity::Spice,
            Commodity::Spice => Commodity::Sugar,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Commodity::Sugar => "sugar",
            Commodity::Spice => "spice",
        }
    }
}

impl fmt::Display for Commodity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Commodity {
    type Err = ScapeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sugar" => Ok(Commodity::Sugar),
            "spice" => Ok(Commodity::Spice),
            other => Err(ScapeError::UnknownCommodity(other.to_string())),
        }
    }
}

/// A value held once per commodity (reserves, prices, metabolism, ...)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PerCommodity<T> {
    pub sugar: T,
    pub spice: T,
}

impl<T> PerCommodity<T> {
    pub fn new(sugar: T, spice: T) -> Self {
        Self { sugar, spice }
    }

    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> PerCommodity<U> {
        PerCommodity {
            sugar: f(self.sugar),
            spice: f(self.spice),
        }
    }
}

impl<T: Copy> PerCommodity<T> {
    pub fn splat(value: T) -> Self {
        Self {
            sugar: value,
            spice: value,
        }
    }
}

impl<T> Index<Commodity> for PerCommodity<T> {
    type Output = T;

    fn index(&self, commodity: Commodity) -> &T {
        match commodity {
            Commodity::Sugar => &self.sugar,
            Commodity::Spice => &self.spice,
        }
    }
}

impl<T> IndexMut<Commodity> for PerCommodity<T> {
    fn index_mut(&mut self, commodity: Commodity) -> &mut T {
        match commodity {
            Commodity::Sugar => &mut self.sugar,
            Commodity::Spice => &mut self.spice,
        }
    }
}

// ============================================================================
// Stances - Behavioral mode an agent declares for the turn
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
#[serde(rename_all = "snake_case")]
pub enum Stance {
    Offence,
    Defence,
    HarvestSugar,
    HarvestSpice,
    SellSugar,
    SellSpice,
    BuySugar,
    BuySpice,
    MateMale,
    MateFemale,
    ConsumeSugar,
    ConsumeSpice,
}

impl Stance {
    /// Fixed stance order; also the order of stance layers in an observation
    pub const ALL: [Stance; 12] = [
        Stance::Offence,
        Stance::Defence,
        Stance::HarvestSugar,
        Stance::HarvestSpice,
        Stance::SellSugar,
        Stance::SellSpice,
        Stance::BuySugar,
        Stance::BuySpice,
        Stance::MateMale,
        Stance::MateFemale,
        Stance::ConsumeSugar,
        Stance::ConsumeSpice,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Stance::Offence => "offence",
            Stance::Defence => "defence",
            Stance::HarvestSugar => "harvest_sugar",
            Stance::HarvestSpice => "harvest_spice",
            Stance::SellSugar => "sell_sugar",
            Stance::SellSpice => "sell_spice",
            Stance::BuySugar => "buy_sugar",
            Stance::BuySpice => "buy_spice",
            Stance::MateMale => "mate_male",
            Stance::MateFemale => "mate_female",
            Stance::ConsumeSugar => "consume_sugar",
            Stance::ConsumeSpice => "consume_spice",
        }
    }

    pub fn harvest(commodity: Commodity) -> Stance {
        match commodity {
            Commodity::Sugar => Stance::HarvestSugar,
            Commodity::Spice => Stance::HarvestSpice,
        }
    }

    pub fn sell(commodity: Commodity) -> Stance {
        match commodity {
            Commodity::Sugar => Stance::SellSugar,
            Commodity::Spice => Stance::SellSpice,
        }
    }

    pub fn buy(commodity: Commodity) -> Stance {
        match commodity {
            Commodity::Sugar => Stance::BuySugar,
            Commodity::Spice => Stance::BuySpice,
        }
    }

    pub fn consume(commodity: Commodity) -> Stance {
        match commodity {
            Commodity::Sugar => Stance::ConsumeSugar,
            Commodity::Spice => Stance::ConsumeSpice,
        }
    }
}

impl fmt::Display for Stance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stance {
    type Err = ScapeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Stance::ALL
            .into_iter()
            .find(|stance| stance.as_str() == s)
            .ok_or_else(|| ScapeError::UnknownStance(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Female,
    Male,
}

// ============================================================================
// Geometry
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Cell {
    pub x: usize,
    pub y: usize,
}

impl Cell {
    pub fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }

    /// Chebyshev distance: both coordinate deltas count
    pub fn chebyshev(self, other: Cell) -> usize {
        self.x.abs_diff(other.x).max(self.y.abs_diff(other.y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stance_names_round_trip_and_are_distinct() {
        for stance in Stance::ALL {
            assert_eq!(stance.as_str().parse::<Stance>().unwrap(), stance);
        }
        // "buy_spice" and "mate_male" must stay two separate stances
        assert_eq!("buy_spice".parse::<Stance>().unwrap(), Stance::BuySpice);
        assert_eq!("mate_male".parse::<Stance>().unwrap(), Stance::MateMale);
        assert!("buy_spicemate_male".parse::<Stance>().is_err());
    }

    #[test]
    fn test_stance_index_matches_all_order() {
        for (i, stance) in Stance::ALL.into_iter().enumerate() {
            assert_eq!(stance.index(), i);
        }
    }

    #[test]
    fn test_unknown_names_rejected() {
        assert!(matches!(
            "salt".parse::<Commodity>(),
            Err(ScapeError::UnknownCommodity(name)) if name == "salt"
        ));
        assert!(matches!(
            "forage".parse::<Stance>(),
            Err(ScapeError::UnknownStance(name)) if name == "forage"
        ));
    }

    #[test]
    fn test_per_commodity_indexing() {
        let mut held = PerCommodity::new(1.0, 2.0);
        held[Commodity::Spice] += 3.0;
        assert_eq!(held[Commodity::Sugar], 1.0);
        assert_eq!(held.spice, 5.0);
        assert_eq!(Commodity::Sugar.counterpart(), Commodity::Spice);
    }

    #[test]
    fn test_chebyshev_uses_both_axes() {
        let a = Cell::new(5, 5);
        assert_eq!(a.chebyshev(Cell::new(6, 6)), 1);
        assert_eq!(a.chebyshev(Cell::new(6, 9)), 4);
        assert_eq!(a.chebyshev(Cell::new(2, 5)), 3);
        assert_eq!(a.chebyshev(a), 0);
    }
}
