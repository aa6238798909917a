// Offspring from two parents.
//
// Each heritable trait is drawn uniformly between the parents' values. The
// newborn is funded entirely by the mother.

use rand::Rng;

use crate::agent::{Agent, Traits, sample_between, sample_between_u32};
use crate::config::BIRTH_ENDOWMENT_SHARE;
use crate::types::{Commodity, Gender, PerCommodity};

/// Blend two parents' traits.
pub fn inherit<R: Rng + ?Sized>(rng: &mut R, mother: &Traits, father: &Traits) -> Traits {
    let mut between = |a: f64, b: f64| sample_between(rng, a, b);
    let power = between(mother.power, father.power);
    let metabolism = PerCommodity::new(
        between(mother.metabolism.sugar, father.metabolism.sugar),
        between(mother.metabolism.spice, father.metabolism.spice),
    );
    let capacity = PerCommodity::new(
        between(mother.capacity.sugar, father.capacity.sugar),
        between(mother.capacity.spice, father.capacity.spice),
    );
    let price_move = between(mother.price_move, father.price_move);

    let gender = if mother.gender == father.gender {
        mother.gender
    } else if rng.random_bool(0.5) {
        Gender::Female
    } else {
        Gender::Male
    };

    Traits {
        vision: sample_between_u32(rng, mother.vision, father.vision),
        speed: sample_between_u32(rng, mother.speed, father.speed),
        power,
        metabolism,
        capacity,
        gender,
        price_move,
        lifespan: sample_between_u32(rng, mother.lifespan, father.lifespan),
    }
}

/// Produce a child of `mother` and `father`.
///
/// The child starts with `BIRTH_ENDOWMENT_SHARE` of the mother's reserve,
/// in both reserve and pool; the mother keeps the rest. The child inherits
/// the mother's posted prices. Its location is left for the caller to set.
pub fn reproduce<R: Rng + ?Sized>(rng: &mut R, mother: &mut Agent, father: &Traits) -> Agent {
    let traits = inherit(rng, &mother.traits, father);

    let mut endowment = PerCommodity::splat(0.0);
    for commodity in Commodity::ALL {
        let share = mother.reserve[commodity] * BIRTH_ENDOWMENT_SHARE;
        mother.reserve[commodity] -= share;
        endowment[commodity] = share;
    }
    mother.births += 1;

    let mut child = Agent::new(traits, endowment);
    child.price = mother.price;
    child
}
