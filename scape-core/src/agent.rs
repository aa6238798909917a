use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::{DEFAULT_CONSUMPTION_UNIT, DEFAULT_PRICE, DEFAULT_SELL_UNIT, TraitRanges};
use crate::types::{Cell, Commodity, Gender, PerCommodity, Stance};

// === TRAITS ===

/// Heritable attributes of an agent. Offspring draw each one between the
/// parents' values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Traits {
    pub vision: u32,
    /// Max cells moved per axis per turn.
    pub speed: u32,
    /// Amount stolen from each undefended neighbor per offence.
    pub power: f64,
    /// Per-turn draw on the metabolism pool.
    pub metabolism: PerCommodity<f64>,
    pub capacity: PerCommodity<f64>,
    pub gender: Gender,
    /// Largest price adjustment the agent makes in one turn.
    pub price_move: f64,
    pub lifespan: u32,
}

impl Traits {
    /// Draw a fresh set of traits from closed ranges.
    pub fn random<R: Rng + ?Sized>(rng: &mut R, ranges: &TraitRanges) -> Self {
        let mut uniform = |(lo, hi): (f64, f64)| sample_between(rng, lo, hi);
        let power = uniform(ranges.power);
        let metabolism = PerCommodity::new(uniform(ranges.metabolism), uniform(ranges.metabolism));
        let capacity = PerCommodity::new(uniform(ranges.capacity), uniform(ranges.capacity));
        let price_move = uniform(ranges.price_move);

        Self {
            vision: sample_between_u32(rng, ranges.vision.0, ranges.vision.1),
            speed: sample_between_u32(rng, ranges.speed.0, ranges.speed.1),
            power,
            metabolism,
            capacity,
            gender: if rng.random_bool(0.5) {
                Gender::Female
            } else {
                Gender::Male
            },
            price_move,
            lifespan: sample_between_u32(rng, ranges.lifespan.0, ranges.lifespan.1),
        }
    }

    pub fn with_gender(mut self, gender: Gender) -> Self {
        self.gender = gender;
        self
    }

    pub fn with_power(mut self, power: f64) -> Self {
        self.power = power;
        self
    }

    pub fn with_metabolism(mut self, sugar: f64, spice: f64) -> Self {
        self.metabolism = PerCommodity::new(sugar, spice);
        self
    }

    pub fn with_lifespan(mut self, lifespan: u32) -> Self {
        self.lifespan = lifespan;
        self
    }

    pub fn with_speed(mut self, speed: u32) -> Self {
        self.speed = speed;
        self
    }
}

impl Default for Traits {
    fn default() -> Self {
        Self {
            vision: 4,
            speed: 1,
            power: 1.0,
            metabolism: PerCommodity::splat(1.0),
            capacity: PerCommodity::splat(20.0),
            gender: Gender::Female,
            price_move: 1.0,
            lifespan: 100,
        }
    }
}

/// Uniform draw over the closed range spanned by two values (in either order).
pub fn sample_between<R: Rng + ?Sized>(rng: &mut R, a: f64, b: f64) -> f64 {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    if lo == hi {
        return lo;
    }
    rng.random_range(lo..=hi)
}

pub fn sample_between_u32<R: Rng + ?Sized>(rng: &mut R, a: u32, b: u32) -> u32 {
    rng.random_range(a.min(b)..=a.max(b))
}

// === AGENT ===

/// Why an agent stopped taking turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeathCause {
    Starvation,
    OldAge,
}

impl DeathCause {
    pub fn as_str(self) -> &'static str {
        match self {
            DeathCause::Starvation => "starvation",
            DeathCause::OldAge => "old_age",
        }
    }
}

/// A mobile harvester/trader on the scape.
///
/// Resources live in two places: the reserve (held, tradable, stealable)
/// and the pool (moved out of reserve, burned by metabolism).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub traits: Traits,
    pub location: Cell,
    pub alive: bool,
    pub death: Option<DeathCause>,
    pub age: u32,
    pub stance: Stance,
    pub reserve: PerCommodity<f64>,
    pub pool: PerCommodity<f64>,
    pub price: PerCommodity<f64>,
    pub sell_unit: PerCommodity<f64>,
    pub consumption_unit: PerCommodity<f64>,
    /// Matings over the agent's whole life.
    pub matings: u32,
    /// Children this agent has given birth to.
    pub births: u32,
    /// Matings since the last `step`; cleared every turn.
    mated_this_turn: u32,
}

impl Agent {
    /// New agent holding `endowment` both in reserve and in the metabolism
    /// pool. Location is assigned when the agent is placed on a scape.
    pub fn new(traits: Traits, endowment: PerCommodity<f64>) -> Self {
        let endowment = endowment.map(|v| v.max(0.0));
        Self {
            traits,
            location: Cell::new(0, 0),
            alive: true,
            death: None,
            age: 0,
            stance: Stance::Defence,
            reserve: endowment,
            pool: endowment,
            price: PerCommodity::splat(DEFAULT_PRICE),
            sell_unit: PerCommodity::splat(DEFAULT_SELL_UNIT),
            consumption_unit: PerCommodity::splat(DEFAULT_CONSUMPTION_UNIT),
            matings: 0,
            births: 0,
            mated_this_turn: 0,
        }
    }

    pub fn random<R: Rng + ?Sized>(rng: &mut R, ranges: &TraitRanges) -> Self {
        let traits = Traits::random(rng, ranges);
        let endowment = PerCommodity::new(
            sample_between(rng, ranges.endowment.0, ranges.endowment.1),
            sample_between(rng, ranges.endowment.0, ranges.endowment.1),
        );
        Self::new(traits, endowment)
    }

    pub fn with_reserve(mut self, sugar: f64, spice: f64) -> Self {
        self.reserve = PerCommodity::new(sugar.max(0.0), spice.max(0.0));
        self
    }

    pub fn with_pool(mut self, sugar: f64, spice: f64) -> Self {
        self.pool = PerCommodity::new(sugar.max(0.0), spice.max(0.0));
        self
    }

    pub fn with_price(mut self, sugar: f64, spice: f64) -> Self {
        self.price = PerCommodity::new(sugar.max(0.0), spice.max(0.0));
        self
    }

    pub fn with_stance(mut self, stance: Stance) -> Self {
        self.stance = stance;
        self
    }

    // === RESOURCE OPERATIONS ===
    //
    // Every debit is clamped to what is actually there and the clamped
    // amount is what gets returned.

    /// Add `amount` to the reserve (harvest, loot, trade proceeds).
    pub fn harvest(&mut self, commodity: Commodity, amount: f64) -> f64 {
        let amount = amount.max(0.0);
        self.reserve[commodity] += amount;
        amount
    }

    /// Remove up to `amount` from the reserve; returns what was removed.
    pub fn lose(&mut self, commodity: Commodity, amount: f64) -> f64 {
        let removed = amount.max(0.0).min(self.reserve[commodity]);
        self.reserve[commodity] -= removed;
        removed
    }

    /// Move up to `amount` from reserve into the metabolism pool.
    pub fn consume(&mut self, commodity: Commodity, amount: f64) -> f64 {
        let moved = self.lose(commodity, amount);
        self.pool[commodity] += moved;
        moved
    }

    /// Shift the posted price; prices never go below zero.
    pub fn update_price(&mut self, commodity: Commodity, change: f64) -> f64 {
        let price = (self.price[commodity] + change).max(0.0);
        self.price[commodity] = price;
        price
    }

    // === MATING ===

    pub fn mate_male(&mut self) {
        self.matings += 1;
        self.mated_this_turn += 1;
    }

    pub fn mate_female(&mut self) {
        self.matings += 1;
        self.mated_this_turn += 1;
    }

    // === LIFECYCLE ===

    pub fn is_starved(&self) -> bool {
        Commodity::ALL.into_iter().any(|c| self.pool[c] <= 0.0)
    }

    pub fn is_old(&self) -> bool {
        self.age >= self.traits.lifespan
    }

    /// Cobb-Douglas welfare of total holdings, weighted by metabolism.
    pub fn welfare(&self) -> f64 {
        let m = self.traits.metabolism;
        let total_m = m.sugar + m.spice;
        if total_m <= 0.0 {
            return 0.0;
        }
        let held = |c: Commodity| self.reserve[c] + self.pool[c];
        held(Commodity::Sugar).powf(m.sugar / total_m) * held(Commodity::Spice).powf(m.spice / total_m)
    }

    /// End-of-turn update: metabolism, aging, death check, reward.
    ///
    /// Returns 0 if the agent died this turn.
    pub fn step(&mut self, mating_bonus: f64) -> f64 {
        if !self.alive {
            return 0.0;
        }

        for commodity in Commodity::ALL {
            let burn = self.traits.metabolism[commodity].max(0.0);
            self.pool[commodity] = (self.pool[commodity] - burn).max(0.0);
        }
        self.age += 1;

        let mated = std::mem::take(&mut self.mated_this_turn);

        if self.is_starved() {
            self.die(DeathCause::Starvation);
            return 0.0;
        }
        if self.is_old() {
            self.die(DeathCause::OldAge);
            return 0.0;
        }

        self.welfare() + mating_bonus * mated as f64
    }

    fn die(&mut self, cause: DeathCause) {
        self.alive = false;
        self.death = Some(cause);
    }
}
