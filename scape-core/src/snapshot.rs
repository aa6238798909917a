// ============================================================================
// Serializable state snapshot for JS
// ============================================================================

use serde::{Deserialize, Serialize};
use tsify_next::Tsify;

use crate::scape::Scape;
use crate::types::{Commodity, Gender, KeyToU64, Stance};

#[derive(Debug, Clone, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi)]
pub struct ScapeSnapshot {
    pub turn: u64,
    pub width: usize,
    pub height: usize,
    /// Row-major stock per cell.
    pub sugar: Vec<f64>,
    pub spice: Vec<f64>,
    pub agents: Vec<AgentSnapshot>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi)]
pub struct AgentSnapshot {
    pub id: u64,
    pub x: usize,
    pub y: usize,
    pub age: u32,
    pub gender: Gender,
    pub stance: Stance,
    pub sugar: f64,
    pub spice: f64,
    pub sugar_pool: f64,
    pub spice_pool: f64,
    pub sugar_price: f64,
    pub spice_price: f64,
}

impl ScapeSnapshot {
    /// Living agents only, in registration order.
    pub fn capture(scape: &Scape) -> Self {
        let dims = scape.dims();
        let field = scape.field();
        Self {
            turn: scape.turn(),
            width: dims.width,
            height: dims.height,
            sugar: field.stock_layer(Commodity::Sugar).values().to_vec(),
            spice: field.stock_layer(Commodity::Spice).values().to_vec(),
            agents: scape
                .population()
                .living()
                .map(|(id, a)| AgentSnapshot {
                    id: id.to_u64(),
                    x: a.location.x,
                    y: a.location.y,
                    age: a.age,
                    gender: a.traits.gender,
                    stance: a.stance,
                    sugar: a.reserve.sugar,
                    spice: a.reserve.spice,
                    sugar_pool: a.pool.sugar,
                    spice_pool: a.pool.spice,
                    sugar_price: a.price.sugar,
                    spice_price: a.price.spice,
                })
                .collect(),
        }
    }
}
