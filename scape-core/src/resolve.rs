// Stance effects, applied against the acting agent's current neighborhood.

use rand::RngCore;
use rand::seq::IndexedRandom;

use crate::policy::RandomPolicy;
use crate::reproduction::reproduce;
use crate::scape::Scape;
use crate::types::{AgentId, Commodity, Gender, PerCommodity, Stance};
#[cfg(feature = "instrument")]
use crate::types::KeyToU64;

pub type Handler = fn(&mut Scape, AgentId, &mut dyn RngCore);

/// Handler table, one entry per stance.
pub fn handler(stance: Stance) -> Handler {
    match stance {
        Stance::Offence => offence,
        Stance::Defence => no_effect,
        Stance::HarvestSugar => harvest_sugar,
        Stance::HarvestSpice => harvest_spice,
        Stance::SellSugar | Stance::SellSpice => no_effect,
        Stance::BuySugar => buy_sugar,
        Stance::BuySpice => buy_spice,
        Stance::MateMale => no_effect,
        Stance::MateFemale => mate_female,
        Stance::ConsumeSugar => consume_sugar,
        Stance::ConsumeSpice => consume_spice,
    }
}

/// Apply the effect of the agent's current stance.
pub fn resolve(scape: &mut Scape, id: AgentId, rng: &mut dyn RngCore) {
    let Some(agent) = scape.population.get(id) else {
        return;
    };
    if !agent.alive {
        return;
    }
    handler(agent.stance)(scape, id, rng);
}

fn no_effect(_scape: &mut Scape, _id: AgentId, _rng: &mut dyn RngCore) {}

fn harvest_sugar(scape: &mut Scape, id: AgentId, _rng: &mut dyn RngCore) {
    harvest(scape, id, Commodity::Sugar);
}

fn harvest_spice(scape: &mut Scape, id: AgentId, _rng: &mut dyn RngCore) {
    harvest(scape, id, Commodity::Spice);
}

fn buy_sugar(scape: &mut Scape, id: AgentId, _rng: &mut dyn RngCore) {
    buy(scape, id, Commodity::Sugar);
}

fn buy_spice(scape: &mut Scape, id: AgentId, _rng: &mut dyn RngCore) {
    buy(scape, id, Commodity::Spice);
}

fn consume_sugar(scape: &mut Scape, id: AgentId, _rng: &mut dyn RngCore) {
    consume(scape, id, Commodity::Sugar);
}

fn consume_spice(scape: &mut Scape, id: AgentId, _rng: &mut dyn RngCore) {
    consume(scape, id, Commodity::Spice);
}

/// Steal `power` of each commodity from every undefended neighbor.
fn offence(scape: &mut Scape, id: AgentId, _rng: &mut dyn RngCore) {
    let Some(power) = scape.population.get(id).map(|a| a.traits.power) else {
        return;
    };

    for victim in scape.neighbors(id) {
        let Some([thief, mark]) = scape.population.pair_mut(id, victim) else {
            continue;
        };
        if mark.stance == Stance::Defence {
            continue;
        }

        let mut stolen = PerCommodity::splat(0.0);
        for commodity in Commodity::ALL {
            let taken = mark.lose(commodity, power);
            thief.harvest(commodity, taken);
            stolen[commodity] = taken;
        }
        scape.tally.raids += 1;

        #[cfg(feature = "instrument")]
        tracing::info!(
            target: "raid",
            turn = scape.turn,
            attacker_id = id.to_u64(),
            victim_id = victim.to_u64(),
            power = power,
            sugar = stolen.sugar,
            spice = stolen.spice,
        );
        let _ = stolen; // Suppress unused warnings
    }
}

/// Take the whole stock of `commodity` at the agent's cell.
fn harvest(scape: &mut Scape, id: AgentId, commodity: Commodity) {
    let Some(agent) = scape.population.get_mut(id) else {
        return;
    };
    let cell = agent.location;
    let amount = scape.field.harvest(cell, commodity);
    agent.harvest(commodity, amount);

    #[cfg(feature = "instrument")]
    tracing::info!(
        target: "harvest",
        turn = scape.turn,
        agent_id = id.to_u64(),
        commodity = commodity.as_str(),
        x = cell.x as u64,
        y = cell.y as u64,
        amount = amount,
    );
}

/// Buy one sell-unit of `commodity` from every neighbor selling it.
///
/// A trade goes through only when the buyer can pay the seller's posted
/// price in the counterpart commodity and the seller holds a full unit.
fn buy(scape: &mut Scape, id: AgentId, commodity: Commodity) {
    let pay = commodity.counterpart();
    let selling = Stance::sell(commodity);

    for seller_id in scape.neighbors(id) {
        let Some([buyer, seller]) = scape.population.pair_mut(id, seller_id) else {
            continue;
        };
        if seller.stance != selling {
            continue;
        }

        let price = seller.price[commodity];
        let unit = seller.sell_unit[commodity];
        if buyer.reserve[pay] < price || seller.reserve[commodity] < unit {
            continue;
        }

        let paid = buyer.lose(pay, price);
        seller.harvest(pay, paid);
        let sold = seller.lose(commodity, unit);
        buyer.harvest(commodity, sold);
        scape.tally.trades += 1;

        #[cfg(feature = "instrument")]
        tracing::info!(
            target: "trade",
            turn = scape.turn,
            buyer_id = id.to_u64(),
            seller_id = seller_id.to_u64(),
            commodity = commodity.as_str(),
            quantity = sold,
            price = price,
        );
    }
}

/// Pick a male neighbor in `mate_male` at random and, space permitting,
/// give birth on a random free neighboring cell.
fn mate_female(scape: &mut Scape, id: AgentId, rng: &mut dyn RngCore) {
    let Some(mother) = scape.population.get(id) else {
        return;
    };
    if mother.traits.gender != Gender::Female {
        return;
    }

    let suitors: Vec<AgentId> = scape
        .neighbors(id)
        .into_iter()
        .filter(|&other| {
            scape
                .population
                .get(other)
                .is_some_and(|a| a.stance == Stance::MateMale && a.traits.gender == Gender::Male)
        })
        .collect();
    let Some(&father_id) = suitors.choose(rng) else {
        return;
    };

    let Some([mother, father]) = scape.population.pair_mut(id, father_id) else {
        return;
    };
    mother.mate_female();
    father.mate_male();
    let father_traits = father.traits.clone();

    let free = scape.occupancy.free_cells_near(mother.location);
    let Some(&cell) = free.choose(rng) else {
        return;
    };

    let mut child = reproduce(rng, mother, &father_traits);
    child.location = cell;

    let policy = scape
        .policies
        .get(id)
        .map(|p| p.offspring())
        .unwrap_or_else(|| Box::new(RandomPolicy));
    let child_id = scape.admit(child, policy);
    scape.tally.births += 1;

    #[cfg(feature = "instrument")]
    tracing::info!(
        target: "birth",
        turn = scape.turn,
        mother_id = id.to_u64(),
        father_id = father_id.to_u64(),
        child_id = child_id.to_u64(),
        x = cell.x as u64,
        y = cell.y as u64,
    );
    let _ = child_id;
}

/// Move one consumption unit from reserve into the metabolism pool.
fn consume(scape: &mut Scape, id: AgentId, commodity: Commodity) {
    let Some(agent) = scape.population.get_mut(id) else {
        return;
    };
    let unit = agent.consumption_unit[commodity];
    let moved = agent.consume(commodity, unit);

    #[cfg(feature = "instrument")]
    tracing::info!(
        target: "consume",
        turn = scape.turn,
        agent_id = id.to_u64(),
        commodity = commodity.as_str(),
        amount = moved,
        pool = agent.pool[commodity],
    );
    let _ = moved;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{Agent, Traits};
    use crate::config::ScapeConfig;
    use crate::field::ResourceField;
    use crate::grid::Dimensions;
    use crate::policy::{FixedPolicy, Policy};
    use crate::types::Cell;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn scape() -> Scape {
        let dims = Dimensions::new(5, 5).unwrap();
        let field = ResourceField::uniform(dims, PerCommodity::new(3.0, 2.0), PerCommodity::splat(1.0));
        Scape::empty(field, ScapeConfig::default())
    }

    fn hold(stance: Stance) -> Box<dyn Policy> {
        Box::new(FixedPolicy::hold(stance))
    }

    fn agent(stance: Stance, gender: Gender, sugar: f64, spice: f64) -> Agent {
        Agent::new(Traits::default().with_gender(gender), PerCommodity::splat(10.0))
            .with_reserve(sugar, spice)
            .with_stance(stance)
    }

    #[test]
    fn test_every_stance_has_a_handler() {
        let mut rng = StdRng::seed_from_u64(0);
        for stance in Stance::ALL {
            let mut s = scape();
            let id = s
                .place(agent(stance, Gender::Female, 5.0, 5.0), Cell::new(2, 2), hold(stance))
                .unwrap();
            handler(stance)(&mut s, id, &mut rng);
        }
    }

    #[test]
    fn test_harvest_moves_cell_stock_into_reserve() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut s = scape();
        let id = s
            .place(agent(Stance::HarvestSugar, Gender::Male, 1.0, 0.0), Cell::new(0, 0), hold(Stance::HarvestSugar))
            .unwrap();
        resolve(&mut s, id, &mut rng);
        assert_eq!(s.agent(id).unwrap().reserve.sugar, 4.0);
        assert_eq!(s.field().stock(Cell::new(0, 0), Commodity::Sugar), 0.0);
        assert_eq!(s.field().stock(Cell::new(0, 0), Commodity::Spice), 2.0);
    }

    #[test]
    fn test_defence_blocks_offence() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut s = scape();
        let thief = s
            .place(agent(Stance::Offence, Gender::Male, 0.0, 0.0), Cell::new(2, 2), hold(Stance::Offence))
            .unwrap();
        let guarded = s
            .place(agent(Stance::Defence, Gender::Male, 4.0, 4.0), Cell::new(1, 1), hold(Stance::Defence))
            .unwrap();
        let open = s
            .place(agent(Stance::SellSpice, Gender::Male, 4.0, 0.5), Cell::new(3, 2), hold(Stance::SellSpice))
            .unwrap();

        resolve(&mut s, thief, &mut rng);
        assert_eq!(s.agent(guarded).unwrap().reserve, PerCommodity::new(4.0, 4.0));
        assert_eq!(s.agent(open).unwrap().reserve, PerCommodity::new(3.0, 0.0));
        assert_eq!(s.agent(thief).unwrap().reserve, PerCommodity::new(1.0, 0.5));
    }

    #[test]
    fn test_trade_needs_both_conditions() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut s = scape();
        // Buyer cannot afford seller A's price; seller B is out of stock.
        let buyer = s
            .place(agent(Stance::BuySugar, Gender::Male, 0.0, 2.0), Cell::new(2, 2), hold(Stance::BuySugar))
            .unwrap();
        let pricey = s
            .place(
                agent(Stance::SellSugar, Gender::Male, 5.0, 0.0).with_price(3.0, 1.0),
                Cell::new(1, 2),
                hold(Stance::SellSugar),
            )
            .unwrap();
        let empty = s
            .place(
                agent(Stance::SellSugar, Gender::Male, 0.5, 0.0).with_price(1.0, 1.0),
                Cell::new(3, 2),
                hold(Stance::SellSugar),
            )
            .unwrap();

        resolve(&mut s, buyer, &mut rng);
        assert_eq!(s.agent(buyer).unwrap().reserve, PerCommodity::new(0.0, 2.0));
        assert_eq!(s.agent(pricey).unwrap().reserve, PerCommodity::new(5.0, 0.0));
        assert_eq!(s.agent(empty).unwrap().reserve, PerCommodity::new(0.5, 0.0));
    }

    #[test]
    fn test_buy_from_every_eligible_seller() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut s = scape();
        let buyer = s
            .place(agent(Stance::BuySpice, Gender::Male, 10.0, 0.0), Cell::new(2, 2), hold(Stance::BuySpice))
            .unwrap();
        for x in [1, 3] {
            s.place(
                agent(Stance::SellSpice, Gender::Male, 0.0, 4.0).with_price(1.0, 2.0),
                Cell::new(x, 1),
                hold(Stance::SellSpice),
            )
            .unwrap();
        }
        resolve(&mut s, buyer, &mut rng);
        assert_eq!(s.agent(buyer).unwrap().reserve, PerCommodity::new(6.0, 2.0));
    }

    #[test]
    fn test_mating_places_child_next_to_mother() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut s = scape();
        let mother = s
            .place(agent(Stance::MateFemale, Gender::Female, 10.0, 10.0), Cell::new(0, 0), hold(Stance::MateFemale))
            .unwrap();
        let father = s
            .place(agent(Stance::MateMale, Gender::Male, 10.0, 10.0), Cell::new(1, 0), hold(Stance::MateMale))
            .unwrap();

        resolve(&mut s, mother, &mut rng);
        assert_eq!(s.population().len(), 3);
        let child = s.population().order()[2];
        let child_agent = s.agent(child).unwrap();
        assert_eq!(child_agent.reserve, PerCommodity::new(3.0, 3.0));
        assert!(child_agent.location.chebyshev(Cell::new(0, 0)) == 1);
        assert_ne!(child_agent.location, Cell::new(1, 0));
        assert_eq!(s.occupancy().agent_at(child_agent.location), Some(child));
        assert!(s.stances().is_set(Stance::Defence, child_agent.location));

        assert_eq!(s.agent(mother).unwrap().reserve, PerCommodity::new(7.0, 7.0));
        assert_eq!(s.agent(father).unwrap().reserve, PerCommodity::new(10.0, 10.0));
        assert_eq!(s.agent(father).unwrap().matings, 1);
    }

    #[test]
    fn test_no_birth_without_room_or_mate() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut s = scape();
        let lonely = s
            .place(agent(Stance::MateFemale, Gender::Female, 10.0, 10.0), Cell::new(4, 4), hold(Stance::MateFemale))
            .unwrap();
        // A male not in mate_male stance is not a suitor
        s.place(agent(Stance::Defence, Gender::Male, 1.0, 1.0), Cell::new(3, 3), hold(Stance::Defence))
            .unwrap();
        resolve(&mut s, lonely, &mut rng);
        assert_eq!(s.population().len(), 2);

        // Corner mother boxed in by a suitor and two others
        let mut s = scape();
        let mother = s
            .place(agent(Stance::MateFemale, Gender::Female, 10.0, 10.0), Cell::new(0, 0), hold(Stance::MateFemale))
            .unwrap();
        s.place(agent(Stance::MateMale, Gender::Male, 1.0, 1.0), Cell::new(1, 0), hold(Stance::MateMale))
            .unwrap();
        s.place(agent(Stance::Defence, Gender::Male, 1.0, 1.0), Cell::new(0, 1), hold(Stance::Defence))
            .unwrap();
        s.place(agent(Stance::Defence, Gender::Male, 1.0, 1.0), Cell::new(1, 1), hold(Stance::Defence))
            .unwrap();
        resolve(&mut s, mother, &mut rng);
        assert_eq!(s.population().len(), 4);
        assert_eq!(s.agent(mother).unwrap().reserve, PerCommodity::new(10.0, 10.0));
        assert_eq!(s.agent(mother).unwrap().matings, 1);
    }

    #[test]
    fn test_consume_is_capped_by_reserve() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut s = scape();
        let id = s
            .place(
                agent(Stance::ConsumeSpice, Gender::Male, 0.0, 0.25).with_pool(2.0, 2.0),
                Cell::new(2, 2),
                hold(Stance::ConsumeSpice),
            )
            .unwrap();
        resolve(&mut s, id, &mut rng);
        let a = s.agent(id).unwrap();
        assert_eq!(a.reserve.spice, 0.0);
        assert_eq!(a.pool.spice, 2.25);
    }
}
