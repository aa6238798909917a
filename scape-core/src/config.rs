use serde::{Deserialize, Serialize};

use crate::types::PerCommodity;

/// Share of the mother's reserve handed to a newborn.
pub const BIRTH_ENDOWMENT_SHARE: f64 = 0.3;

/// Quantity moved in one trade execution unless an agent says otherwise.
pub const DEFAULT_SELL_UNIT: f64 = 1.0;

/// Quantity moved from reserve into the metabolism pool per consume stance.
pub const DEFAULT_CONSUMPTION_UNIT: f64 = 1.0;

/// Posted price of a fresh agent.
pub const DEFAULT_PRICE: f64 = 1.0;

/// Environment-level knobs for a scape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScapeConfig {
    /// Per-turn regrowth of sugar toward capacity.
    pub sugar_growth: f64,
    /// Per-turn regrowth of spice toward capacity.
    pub spice_growth: f64,
    /// Cell sugar capacities are drawn uniformly from `[0, max]`.
    pub max_sugar_capacity: f64,
    pub max_spice_capacity: f64,
    /// Utility reported for a turn in which the agent mated.
    pub mating_bonus: f64,
}

impl Default for ScapeConfig {
    fn default() -> Self {
        Self {
            sugar_growth: 1.0,
            spice_growth: 1.0,
            max_sugar_capacity: 4.0,
            max_spice_capacity: 4.0,
            mating_bonus: 1.0,
        }
    }
}

impl ScapeConfig {
    pub fn growth(&self) -> PerCommodity<f64> {
        PerCommodity::new(self.sugar_growth, self.spice_growth)
    }

    pub fn max_capacity(&self) -> PerCommodity<f64> {
        PerCommodity::new(self.max_sugar_capacity, self.max_spice_capacity)
    }
}

/// Closed ranges for drawing a random initial population.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraitRanges {
    pub vision: (u32, u32),
    pub speed: (u32, u32),
    pub power: (f64, f64),
    pub metabolism: (f64, f64),
    pub capacity: (f64, f64),
    pub price_move: (f64, f64),
    pub lifespan: (u32, u32),
    /// Initial endowment per commodity.
    pub endowment: (f64, f64),
}

impl Default for TraitRanges {
    fn default() -> Self {
        Self {
            vision: (1, 6),
            speed: (1, 2),
            power: (0.5, 2.0),
            metabolism: (0.5, 2.0),
            capacity: (10.0, 40.0),
            price_move: (0.1, 1.0),
            lifespan: (60, 100),
            endowment: (5.0, 25.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_fills_defaults() {
        let cfg: ScapeConfig = serde_json::from_str(r#"{ "sugar_growth": 2.5 }"#).unwrap();
        assert_eq!(cfg.sugar_growth, 2.5);
        assert_eq!(cfg.spice_growth, ScapeConfig::default().spice_growth);
        assert_eq!(cfg.growth().sugar, 2.5);
    }

    #[test]
    fn test_trait_ranges_are_ordered() {
        let r = TraitRanges::default();
        assert!(r.vision.0 <= r.vision.1);
        assert!(r.speed.0 <= r.speed.1);
        assert!(r.lifespan.0 <= r.lifespan.1);
        assert!(r.endowment.0 <= r.endowment.1);
    }
}
