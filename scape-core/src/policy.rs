// Decision policies: observation in, action out.

use rand::seq::IndexedRandom;
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

use crate::agent::Agent;
use crate::observation::Observation;
use crate::types::{Commodity, PerCommodity, Stance};

/// One agent's intent for a turn. Not persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    /// Requested (dx, dy); the scape clamps it to the agent's speed.
    pub movement: (i64, i64),
    pub price_change: PerCommodity<Option<f64>>,
    pub stance: Stance,
}

impl Action {
    /// Stay put, keep prices, adopt `stance`.
    pub fn hold(stance: Stance) -> Self {
        Self {
            movement: (0, 0),
            price_change: PerCommodity::splat(None),
            stance,
        }
    }

    pub fn moving(mut self, dx: i64, dy: i64) -> Self {
        self.movement = (dx, dy);
        self
    }

    pub fn pricing(mut self, commodity: Commodity, change: f64) -> Self {
        self.price_change[commodity] = Some(change);
        self
    }
}

/// Experience handed to `Policy::learn` after every step.
#[derive(Debug)]
pub struct Transition<'a> {
    pub observation: &'a Observation,
    pub action: &'a Action,
    pub reward: f64,
    pub next_observation: &'a Observation,
    pub turn: u64,
    pub done: bool,
}

/// A pluggable decision strategy, one instance per agent.
pub trait Policy {
    /// Choose an action. Must not touch world state.
    fn act(&mut self, observation: &Observation, agent: &Agent, rng: &mut dyn RngCore) -> Action;

    fn learn(&mut self, _transition: &Transition<'_>) {}

    /// Policy given to a child of the agent holding this one.
    fn offspring(&self) -> Box<dyn Policy>;
}

/// Uniform random movement, price moves and stance.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomPolicy;

impl Policy for RandomPolicy {
    fn act(&mut self, _observation: &Observation, agent: &Agent, rng: &mut dyn RngCore) -> Action {
        let speed = agent.traits.speed as i64;
        let step = agent.traits.price_move.max(0.0);
        let mut price_change = PerCommodity::splat(None);
        for commodity in Commodity::ALL {
            price_change[commodity] = Some(if step > 0.0 { rng.random_range(-step..=step) } else { 0.0 });
        }

        Action {
            movement: (rng.random_range(-speed..=speed), rng.random_range(-speed..=speed)),
            price_change,
            stance: *Stance::ALL.choose(rng).unwrap_or(&Stance::Defence),
        }
    }

    fn offspring(&self) -> Box<dyn Policy> {
        Box::new(RandomPolicy)
    }
}

/// Always returns the same action.
#[derive(Debug, Clone)]
pub struct FixedPolicy {
    action: Action,
}

impl FixedPolicy {
    pub fn new(action: Action) -> Self {
        Self { action }
    }

    pub fn hold(stance: Stance) -> Self {
        Self::new(Action::hold(stance))
    }
}

impl Policy for FixedPolicy {
    fn act(&mut self, _observation: &Observation, _agent: &Agent, _rng: &mut dyn RngCore) -> Action {
        self.action.clone()
    }

    fn offspring(&self) -> Box<dyn Policy> {
        Box::new(self.clone())
    }
}
