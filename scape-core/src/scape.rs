// The turn engine: owns the world and advances it one agent at a time.

use rand::RngCore;
use serde::{Deserialize, Serialize};
use slotmap::SecondaryMap;

use crate::agent::Agent;
#[cfg(feature = "instrument")]
use crate::agent::DeathCause;
use crate::config::ScapeConfig;
use crate::error::ScapeError;
use crate::field::ResourceField;
use crate::grid::Dimensions;
use crate::maps::{PriceMap, StanceMap};
use crate::observation::Observation;
use crate::occupancy::OccupancyIndex;
use crate::policy::{Action, Policy, Transition};
use crate::population::Population;
use crate::resolve;
use crate::types::{AgentId, Cell, Commodity};
#[cfg(feature = "instrument")]
use crate::types::KeyToU64;

/// Result of one agent's step.
#[derive(Debug, Clone)]
pub struct StepOutcome {
    pub observation: Observation,
    pub reward: f64,
    /// Always false; extinction is detected by the driver.
    pub done: bool,
}

/// Per-turn record appended to the scape's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnSummary {
    pub turn: u64,
    pub living: usize,
    pub births: u32,
    pub deaths: u32,
    pub trades: u32,
    pub raids: u32,
    pub sugar: f64,
    pub spice: f64,
}

/// Event counts accumulated during the current turn.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Tally {
    pub births: u32,
    pub deaths: u32,
    pub trades: u32,
    pub raids: u32,
}

/// The grid world and its population.
///
/// The agents' own `location`, `stance` and `price` fields are the source
/// of truth; occupancy and the stance/price maps are kept in step with
/// them on every change.
pub struct Scape {
    pub(crate) config: ScapeConfig,
    pub(crate) field: ResourceField,
    pub(crate) occupancy: OccupancyIndex,
    pub(crate) stances: StanceMap,
    pub(crate) prices: PriceMap,
    pub(crate) population: Population,
    pub(crate) policies: SecondaryMap<AgentId, Box<dyn Policy>>,
    pub(crate) turn: u64,
    pub(crate) tally: Tally,
    history: Vec<TurnSummary>,
}

impl Scape {
    /// Random field, agents placed uniformly on distinct cells.
    pub fn new(
        dims: Dimensions,
        config: ScapeConfig,
        agents: Vec<(Agent, Box<dyn Policy>)>,
        rng: &mut dyn RngCore,
    ) -> Result<Self, ScapeError> {
        let field = ResourceField::random(dims, &config, rng);
        Self::with_field(field, config, agents, rng)
    }

    /// Like `new`, over a prepared field.
    pub fn with_field(
        field: ResourceField,
        config: ScapeConfig,
        agents: Vec<(Agent, Box<dyn Policy>)>,
        rng: &mut dyn RngCore,
    ) -> Result<Self, ScapeError> {
        let cells = field.dims().cell_count();
        if agents.len() > cells {
            return Err(ScapeError::GridFull {
                agents: agents.len(),
                cells,
            });
        }

        let mut scape = Self::empty(field, config);
        let dims = scape.dims();
        let spots = rand::seq::index::sample(rng, cells, agents.len());
        for ((agent, policy), index) in agents.into_iter().zip(spots.into_iter()) {
            scape.place(agent, dims.cell_at(index), policy)?;
        }
        Ok(scape)
    }

    /// A scape with no agents.
    pub fn empty(field: ResourceField, config: ScapeConfig) -> Self {
        let dims = field.dims();
        Self {
            config,
            field,
            occupancy: OccupancyIndex::new(dims),
            stances: StanceMap::new(dims),
            prices: PriceMap::new(dims),
            population: Population::new(),
            policies: SecondaryMap::new(),
            turn: 0,
            tally: Tally::default(),
            history: Vec::new(),
        }
    }

    /// Register a living agent at a free cell.
    pub fn place(
        &mut self,
        mut agent: Agent,
        cell: Cell,
        policy: Box<dyn Policy>,
    ) -> Result<AgentId, ScapeError> {
        if !self.dims().contains(cell) || !self.occupancy.is_free(cell) {
            return Err(ScapeError::CellUnavailable { x: cell.x, y: cell.y });
        }
        agent.location = cell;
        Ok(self.admit(agent, policy))
    }

    /// Register an agent whose location is already known to be free.
    pub(crate) fn admit(&mut self, agent: Agent, policy: Box<dyn Policy>) -> AgentId {
        let cell = agent.location;
        let stance = agent.stance;
        let price = agent.price;
        let alive = agent.alive;

        let id = self.population.register(agent);
        self.policies.insert(id, policy);
        if alive {
            self.occupancy.place(id, cell);
            self.stances.set(stance, cell);
            self.prices.post(cell, price);
        }
        id
    }

    // === ACCESSORS ===

    pub fn dims(&self) -> Dimensions {
        self.field.dims()
    }

    pub fn config(&self) -> &ScapeConfig {
        &self.config
    }

    pub fn field(&self) -> &ResourceField {
        &self.field
    }

    pub fn field_mut(&mut self) -> &mut ResourceField {
        &mut self.field
    }

    pub fn occupancy(&self) -> &OccupancyIndex {
        &self.occupancy
    }

    pub fn stances(&self) -> &StanceMap {
        &self.stances
    }

    pub fn prices(&self) -> &PriceMap {
        &self.prices
    }

    pub fn population(&self) -> &Population {
        &self.population
    }

    pub fn agent(&self, id: AgentId) -> Option<&Agent> {
        self.population.get(id)
    }

    pub fn turn(&self) -> u64 {
        self.turn
    }

    pub fn history(&self) -> &[TurnSummary] {
        &self.history
    }

    pub fn living_count(&self) -> usize {
        self.population.alive_count()
    }

    /// Snapshot the observation stack.
    pub fn get_state(&self) -> Observation {
        Observation::capture(&self.field, &self.occupancy, &self.stances, &self.prices)
    }

    // === SPATIAL QUERIES ===

    /// Living agents in the Moore neighborhood of `id`, in registration order.
    pub fn neighbors(&self, id: AgentId) -> Vec<AgentId> {
        let Some(agent) = self.population.get(id) else {
            return Vec::new();
        };
        let mut near: Vec<AgentId> = self
            .occupancy
            .occupants_near(agent.location)
            .filter(|&other| other != id)
            .collect();
        near.sort_by_key(|&other| self.population.serial(other));
        near
    }

    pub fn free_cells_near(&self, id: AgentId) -> Vec<Cell> {
        self.population
            .get(id)
            .map(|agent| self.occupancy.free_cells_near(agent.location))
            .unwrap_or_default()
    }

    // === TURN ENGINE ===

    /// Advance one agent: move, reprice, change stance, resolve the stance,
    /// then run the agent's own end-of-turn update.
    pub fn step(
        &mut self,
        id: AgentId,
        action: &Action,
        rng: &mut dyn RngCore,
    ) -> Result<StepOutcome, ScapeError> {
        let dims = self.dims();
        let agent = self.population.get_mut(id).ok_or(ScapeError::UnknownAgent)?;
        if !agent.alive {
            return Err(ScapeError::AgentNotAlive);
        }

        // Movement, bounded by speed per axis
        let speed = agent.traits.speed as i64;
        let (dx, dy) = action.movement;
        let from = agent.location;
        let to = dims.offset_clamped(from, dx.clamp(-speed, speed), dy.clamp(-speed, speed));
        if to != from && self.occupancy.move_agent(id, from, to) {
            self.stances.relocate(agent.stance, from, to);
            self.prices.relocate(from, to, agent.price);
            agent.location = to;
        }

        // Pricing
        let mut repriced = false;
        for commodity in Commodity::ALL {
            if let Some(change) = action.price_change[commodity] {
                agent.update_price(commodity, change);
                repriced = true;
            }
        }
        if repriced {
            self.prices.post(agent.location, agent.price);
        }

        // Stance
        if agent.stance != action.stance {
            self.stances.transition(agent.location, agent.stance, action.stance);
            agent.stance = action.stance;
        }

        resolve::resolve(self, id, rng);

        let mating_bonus = self.config.mating_bonus;
        let agent = self.population.get_mut(id).ok_or(ScapeError::UnknownAgent)?;
        let reward = agent.step(mating_bonus);
        if !agent.alive {
            let (cell, stance) = (agent.location, agent.stance);
            #[cfg(feature = "instrument")]
            tracing::info!(
                target: "death",
                turn = self.turn,
                agent_id = id.to_u64(),
                age = agent.age,
                cause = agent.death.map_or("unknown", DeathCause::as_str),
            );
            self.occupancy.vacate(cell);
            self.stances.clear(stance, cell);
            self.prices.clear(cell);
            self.tally.deaths += 1;
        }

        Ok(StepOutcome {
            observation: self.get_state(),
            reward,
            done: false,
        })
    }

    /// Run `turns` full turns over the population.
    ///
    /// Agents act in registration order; each sees the effects of those
    /// before it. Newborns first act on the turn after their birth.
    pub fn simulate(&mut self, turns: u64, rng: &mut dyn RngCore) -> Result<(), ScapeError> {
        for _ in 0..turns {
            self.run_turn(rng)?;
        }
        Ok(())
    }

    pub fn run_turn(&mut self, rng: &mut dyn RngCore) -> Result<TurnSummary, ScapeError> {
        let order = self.population.order().to_vec();
        // World after the previous step; nothing changes it before the next act
        let mut latest: Option<Observation> = None;

        for id in order {
            let Some(agent) = self.population.get(id) else {
                continue;
            };
            if !agent.alive {
                continue;
            }

            let observation = match latest.take() {
                Some(observation) => observation,
                None => self.get_state(),
            };
            let policy = self.policies.get_mut(id).ok_or(ScapeError::UnknownAgent)?;
            let action = policy.act(&observation, agent, rng);

            let outcome = self.step(id, &action, rng)?;

            if let Some(policy) = self.policies.get_mut(id) {
                policy.learn(&Transition {
                    observation: &observation,
                    action: &action,
                    reward: outcome.reward,
                    next_observation: &outcome.observation,
                    turn: self.turn,
                    done: outcome.done,
                });
            }
            latest = Some(outcome.observation);
        }

        self.field.grow();
        Ok(self.record())
    }

    fn record(&mut self) -> TurnSummary {
        let tally = std::mem::take(&mut self.tally);
        let summary = TurnSummary {
            turn: self.turn,
            living: self.population.alive_count(),
            births: tally.births,
            deaths: tally.deaths,
            trades: tally.trades,
            raids: tally.raids,
            sugar: self.field.total(Commodity::Sugar),
            spice: self.field.total(Commodity::Spice),
        };

        #[cfg(feature = "instrument")]
        tracing::info!(
            target: "turn",
            turn = summary.turn,
            living = summary.living as u64,
            births = summary.births,
            deaths = summary.deaths,
            trades = summary.trades,
            raids = summary.raids,
            sugar = summary.sugar,
            spice = summary.spice,
        );

        self.history.push(summary.clone());
        self.turn += 1;
        summary
    }

    /// Remove dead agents and their policies.
    pub fn prune_dead(&mut self) -> usize {
        let dead = self.population.prune_dead();
        for id in &dead {
            self.policies.remove(*id);
        }
        dead.len()
    }
}
