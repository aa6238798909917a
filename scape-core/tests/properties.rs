//! Invariants checked turn by turn over many seeded random runs.

use rand::SeedableRng;
use rand::rngs::StdRng;
use scape_core::audit;
use scape_core::{Agent, Dimensions, Policy, RandomPolicy, Scape, ScapeConfig, TraitRanges};

const SEEDS: u64 = 12;
const TURNS: usize = 40;

fn random_scape(seed: u64, width: usize, height: usize, agents: usize) -> (Scape, StdRng) {
    let mut rng = StdRng::seed_from_u64(seed);
    let ranges = TraitRanges::default();
    let population: Vec<(Agent, Box<dyn Policy>)> = (0..agents)
        .map(|_| {
            (
                Agent::random(&mut rng, &ranges),
                Box::new(RandomPolicy) as Box<dyn Policy>,
            )
        })
        .collect();
    let dims = Dimensions::new(width, height).unwrap();
    let scape = Scape::new(dims, ScapeConfig::default(), population, &mut rng).unwrap();
    (scape, rng)
}

#[test]
fn world_stays_consistent_every_turn() {
    for seed in 0..SEEDS {
        let (mut scape, mut rng) = random_scape(seed, 14, 14, 70);
        audit::verify(&scape).unwrap();

        for turn in 0..TURNS {
            if scape.living_count() == 0 {
                break;
            }
            scape.run_turn(&mut rng).unwrap();
            if let Err(e) = audit::verify(&scape) {
                panic!("seed {seed} turn {turn}: {e}");
            }
        }
    }
}

#[test]
fn survivors_that_acted_still_have_both_pools() {
    for seed in 0..SEEDS {
        let (mut scape, mut rng) = random_scape(seed, 12, 12, 50);
        for _ in 0..TURNS {
            scape.run_turn(&mut rng).unwrap();
            for (_, agent) in scape.population().living() {
                if agent.age > 0 {
                    assert!(agent.pool.sugar > 0.0 && agent.pool.spice > 0.0, "seed {seed}");
                    assert!(agent.age < agent.traits.lifespan, "seed {seed}");
                }
            }
        }
    }
}

#[test]
fn neighborhoods_are_symmetric_and_exclude_self() {
    for seed in 0..SEEDS {
        let (mut scape, mut rng) = random_scape(seed, 10, 10, 60);
        for _ in 0..10 {
            scape.run_turn(&mut rng).unwrap();

            for (id, agent) in scape.population().living() {
                let near = scape.neighbors(id);
                assert!(!near.contains(&id));
                for other in near {
                    let other_agent = scape.agent(other).unwrap();
                    assert!(other_agent.alive);
                    assert_eq!(agent.location.chebyshev(other_agent.location), 1);
                    assert!(scape.neighbors(other).contains(&id), "seed {seed}");
                }
            }
        }
    }
}

#[test]
fn same_seed_same_history() {
    for seed in [0, 7, 31] {
        let (mut a, mut rng_a) = random_scape(seed, 15, 15, 80);
        let (mut b, mut rng_b) = random_scape(seed, 15, 15, 80);
        a.simulate(30, &mut rng_a).unwrap();
        b.simulate(30, &mut rng_b).unwrap();

        assert_eq!(a.history(), b.history());
        assert_eq!(a.get_state(), b.get_state());
    }
}

#[test]
fn pruning_keeps_the_world_intact() {
    let (mut scape, mut rng) = random_scape(4, 12, 12, 60);
    scape.simulate(30, &mut rng).unwrap();

    let living = scape.living_count();
    let dead = scape.population().len() - living;
    assert_eq!(scape.prune_dead(), dead);
    assert_eq!(scape.population().len(), living);
    audit::verify(&scape).unwrap();

    scape.simulate(5, &mut rng).unwrap();
    audit::verify(&scape).unwrap();
}
