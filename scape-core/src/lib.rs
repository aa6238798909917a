use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use wasm_bindgen::prelude::*;

pub mod agent;
pub mod audit;
pub mod config;
pub mod error;
pub mod field;
pub mod grid;
pub mod maps;
pub mod observation;
pub mod occupancy;
pub mod policy;
pub mod population;
pub mod reproduction;
pub mod resolve;
pub mod scape;
pub mod snapshot;
pub mod types;

#[cfg(feature = "instrument")]
pub use instrument;

pub use agent::{Agent, DeathCause, Traits};
pub use config::{ScapeConfig, TraitRanges};
pub use error::ScapeError;
pub use field::ResourceField;
pub use grid::{Dimensions, Layer};
pub use observation::{Channel, Observation};
pub use policy::{Action, FixedPolicy, Policy, RandomPolicy, Transition};
pub use scape::{Scape, StepOutcome, TurnSummary};
pub use snapshot::{AgentSnapshot, ScapeSnapshot};
pub use types::*;

// ============================================================================
// WASM API - Simulation
// ============================================================================

/// Everything needed to set up a seeded run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Grid extents, read by `Dimensions::from_slice`: `[side]` or `[width, height]`.
    pub dims: Vec<usize>,
    pub agents: usize,
    pub seed: u64,
    pub scape: ScapeConfig,
    pub traits: TraitRanges,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            dims: vec![50, 50],
            agents: 250,
            seed: 0,
            scape: ScapeConfig::default(),
            traits: TraitRanges::default(),
        }
    }
}

/// A scape of random agents driven by `RandomPolicy`, with its own RNG.
#[wasm_bindgen]
pub struct Simulation {
    scape: Scape,
    rng: StdRng,
}

impl Simulation {
    pub fn from_config(config: &SimulationConfig) -> Result<Self, ScapeError> {
        let dims = Dimensions::from_slice(&config.dims)?;
        let mut rng = StdRng::seed_from_u64(config.seed);
        let agents: Vec<(Agent, Box<dyn Policy>)> = (0..config.agents)
            .map(|_| {
                (
                    Agent::random(&mut rng, &config.traits),
                    Box::new(RandomPolicy) as Box<dyn Policy>,
                )
            })
            .collect();
        let scape = Scape::new(dims, config.scape.clone(), agents, &mut rng)?;
        Ok(Self { scape, rng })
    }

    pub fn scape(&self) -> &Scape {
        &self.scape
    }

    /// Run `turns` turns, stopping early once everyone is dead.
    /// The dead are dropped after every turn.
    pub fn run(&mut self, turns: u64) -> Result<(), ScapeError> {
        for _ in 0..turns {
            if self.scape.living_count() == 0 {
                break;
            }
            self.scape.run_turn(&mut self.rng)?;
            self.scape.prune_dead();
        }
        Ok(())
    }
}

#[wasm_bindgen]
impl Simulation {
    #[wasm_bindgen(constructor)]
    pub fn new(width: usize, height: usize, agents: usize, seed: u64) -> Result<Simulation, JsError> {
        // Better panic messages in browser console
        console_error_panic_hook::set_once();

        let config = SimulationConfig {
            dims: vec![width, height],
            agents,
            seed,
            ..SimulationConfig::default()
        };
        Ok(Self::from_config(&config)?)
    }

    /// Build from a partial `SimulationConfig` object; missing keys take defaults.
    #[wasm_bindgen]
    pub fn with_config(config: JsValue) -> Result<Simulation, JsError> {
        console_error_panic_hook::set_once();
        let config: SimulationConfig = serde_wasm_bindgen::from_value(config)?;
        Ok(Self::from_config(&config)?)
    }

    /// Advance the simulation by one turn
    #[wasm_bindgen]
    pub fn advance_turn(&mut self) -> Result<(), JsError> {
        Ok(self.run(1)?)
    }

    #[wasm_bindgen]
    pub fn advance(&mut self, turns: u64) -> Result<(), JsError> {
        Ok(self.run(turns)?)
    }

    #[wasm_bindgen]
    pub fn get_turn(&self) -> u64 {
        self.scape.turn()
    }

    #[wasm_bindgen]
    pub fn living(&self) -> usize {
        self.scape.living_count()
    }

    /// Get a snapshot of the current state for rendering
    #[wasm_bindgen]
    pub fn get_state_snapshot(&self) -> ScapeSnapshot {
        ScapeSnapshot::capture(&self.scape)
    }

    /// Observation stack flattened to `[channel][y][x]`.
    #[wasm_bindgen]
    pub fn observation(&self) -> js_sys::Float64Array {
        js_sys::Float64Array::from(self.scape.get_state().to_stacked().as_slice())
    }

    #[wasm_bindgen]
    pub fn history_json(&self) -> Result<String, JsError> {
        Ok(serde_json::to_string(self.scape.history())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_places_population() {
        let config = SimulationConfig {
            dims: vec![10, 8],
            agents: 20,
            seed: 3,
            ..SimulationConfig::default()
        };
        let sim = Simulation::from_config(&config).unwrap();
        assert_eq!(sim.scape().dims(), Dimensions::new(10, 8).unwrap());
        assert_eq!(sim.scape().living_count(), 20);
        assert_eq!(sim.get_turn(), 0);
        assert_eq!(sim.get_state_snapshot().agents.len(), 20);
    }

    #[test]
    fn test_bad_config_rejected() {
        let zero = SimulationConfig {
            dims: vec![0, 50],
            ..SimulationConfig::default()
        };
        assert!(matches!(
            Simulation::from_config(&zero),
            Err(ScapeError::ZeroDimension { .. })
        ));

        let crowded = SimulationConfig {
            dims: vec![3],
            agents: 10,
            ..SimulationConfig::default()
        };
        assert!(matches!(
            Simulation::from_config(&crowded),
            Err(ScapeError::GridFull { agents: 10, cells: 9 })
        ));
    }

    #[test]
    fn test_partial_config_from_json() {
        let config: SimulationConfig =
            serde_json::from_str(r#"{ "agents": 12, "scape": { "mating_bonus": 0.0 } }"#).unwrap();
        assert_eq!(config.agents, 12);
        assert_eq!(config.dims, vec![50, 50]);
        assert_eq!(config.scape.mating_bonus, 0.0);
        assert_eq!(config.scape.sugar_growth, 1.0);
    }

    #[test]
    fn test_run_records_history() {
        let config = SimulationConfig {
            dims: vec![12, 12],
            agents: 30,
            seed: 8,
            ..SimulationConfig::default()
        };
        let mut sim = Simulation::from_config(&config).unwrap();
        sim.run(5).unwrap();
        let turns = sim.get_turn() as usize;
        assert!(turns >= 1 && turns <= 5);
        assert_eq!(sim.scape().history().len(), turns);
    }

    #[test]
    fn test_dims_list_follows_dimension_rules() {
        let square = SimulationConfig {
            dims: vec![6],
            agents: 4,
            ..SimulationConfig::default()
        };
        let sim = Simulation::from_config(&square).unwrap();
        assert_eq!(sim.scape().dims(), Dimensions::new(6, 6).unwrap());

        let long = SimulationConfig {
            dims: vec![5, 4, 9],
            agents: 4,
            ..SimulationConfig::default()
        };
        let sim = Simulation::from_config(&long).unwrap();
        assert_eq!(sim.scape().dims(), Dimensions::new(5, 4).unwrap());

        let empty = SimulationConfig {
            dims: Vec::new(),
            ..SimulationConfig::default()
        };
        assert!(matches!(
            Simulation::from_config(&empty),
            Err(ScapeError::EmptyDimensions)
        ));

        let json: SimulationConfig = serde_json::from_str(r#"{ "dims": [7], "agents": 3 }"#).unwrap();
        let sim = Simulation::from_config(&json).unwrap();
        assert_eq!(sim.scape().dims(), Dimensions::new(7, 7).unwrap());
    }

    #[test]
    fn test_run_drops_the_dead() {
        let config = SimulationConfig {
            dims: vec![10, 10],
            agents: 40,
            seed: 12,
            traits: TraitRanges {
                lifespan: (3, 5),
                ..TraitRanges::default()
            },
            ..SimulationConfig::default()
        };
        let mut sim = Simulation::from_config(&config).unwrap();

        sim.run(4).unwrap();
        assert_eq!(sim.scape().population().len(), sim.living());

        sim.run(200).unwrap();
        let deaths: u32 = sim.scape().history().iter().map(|t| t.deaths).sum();
        assert!(deaths > 0);
        assert_eq!(sim.living(), 0);
        assert!(sim.scape().population().is_empty());
    }
}
