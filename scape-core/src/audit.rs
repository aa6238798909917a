// Consistency checks over a whole scape.
//
// Used by tests after every turn; cheap enough to call from a debug build
// of a driver too.

use crate::error::ScapeError;
use crate::scape::Scape;
use crate::types::{Commodity, PerCommodity, Stance};

/// World-wide resource holdings at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ResourceTotals {
    pub field: PerCommodity<f64>,
    pub reserves: PerCommodity<f64>,
    pub pools: PerCommodity<f64>,
}

impl ResourceTotals {
    /// Sum stock, living agents' reserves and pools.
    pub fn capture(scape: &Scape) -> Self {
        let mut totals = Self::default();
        for commodity in Commodity::ALL {
            totals.field[commodity] = scape.field().total(commodity);
        }
        for (_, agent) in scape.population().living() {
            for commodity in Commodity::ALL {
                totals.reserves[commodity] += agent.reserve[commodity];
                totals.pools[commodity] += agent.pool[commodity];
            }
        }
        totals
    }

    pub fn held(&self, commodity: Commodity) -> f64 {
        self.reserves[commodity] + self.pools[commodity]
    }
}

fn violation(msg: impl Into<String>) -> ScapeError {
    ScapeError::InvariantViolation(msg.into())
}

/// Check occupancy, the derived maps, field bounds and non-negativity.
pub fn verify(scape: &Scape) -> Result<(), ScapeError> {
    let dims = scape.dims();
    let occupancy = scape.occupancy();

    // Every living agent stands alone on its recorded cell.
    let mut living = 0;
    for (id, agent) in scape.population().living() {
        living += 1;
        if !dims.contains(agent.location) {
            return Err(violation(format!("agent at {:?} is off the grid", agent.location)));
        }
        if occupancy.agent_at(agent.location) != Some(id) {
            return Err(violation(format!(
                "agent at {:?} is not indexed at its cell",
                agent.location
            )));
        }
        for stance in Stance::ALL {
            if scape.stances().is_set(stance, agent.location) != (stance == agent.stance) {
                return Err(violation(format!(
                    "stance map disagrees with agent at {:?} on {stance}",
                    agent.location
                )));
            }
        }
        for commodity in Commodity::ALL {
            if scape.prices().get(agent.location, commodity) != agent.price[commodity] {
                return Err(violation(format!(
                    "{commodity} price map disagrees with agent at {:?}",
                    agent.location
                )));
            }
            if agent.reserve[commodity] < 0.0 || agent.pool[commodity] < 0.0 {
                return Err(violation(format!("negative {commodity} holding at {:?}", agent.location)));
            }
        }
    }

    // And nothing else is indexed.
    if occupancy.occupied_count() != living {
        return Err(violation(format!(
            "{} occupied cells for {living} living agents",
            occupancy.occupied_count()
        )));
    }

    for cell in dims.cells() {
        if occupancy.is_free(cell) {
            if scape.stances().stances_at(cell).next().is_some() {
                return Err(violation(format!("stance bit set on empty cell {cell:?}")));
            }
            for commodity in Commodity::ALL {
                if scape.prices().get(cell, commodity) != 0.0 {
                    return Err(violation(format!("{commodity} price posted on empty cell {cell:?}")));
                }
            }
        }
        for commodity in Commodity::ALL {
            let stock = scape.field().stock(cell, commodity);
            let cap = scape.field().capacity(cell, commodity);
            if stock < 0.0 || stock > cap {
                return Err(violation(format!(
                    "{commodity} stock {stock} outside [0, {cap}] at {cell:?}"
                )));
            }
        }
    }

    Ok(())
}
