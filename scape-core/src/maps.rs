// Derived per-cell projections of agent state.
//
// These are caches: the agent's own `location`, `stance` and `price` fields
// are the source of truth. The scape keeps them in sync incrementally.

use crate::grid::{Dimensions, Layer};
use crate::types::{Cell, Commodity, PerCommodity, Stance};

/// One boolean layer per stance.
#[derive(Debug, Clone)]
pub struct StanceMap {
    layers: Vec<Layer<bool>>,
}

impl StanceMap {
    pub fn new(dims: Dimensions) -> Self {
        Self {
            layers: Stance::ALL.iter().map(|_| Layer::filled(dims, false)).collect(),
        }
    }

    pub fn layer(&self, stance: Stance) -> &Layer<bool> {
        &self.layers[stance.index()]
    }

    pub fn is_set(&self, stance: Stance, cell: Cell) -> bool {
        *self.layers[stance.index()].get(cell)
    }

    pub fn set(&mut self, stance: Stance, cell: Cell) {
        self.layers[stance.index()].set(cell, true);
    }

    pub fn clear(&mut self, stance: Stance, cell: Cell) {
        self.layers[stance.index()].set(cell, false);
    }

    /// Move a stance bit from one cell to another (vacate before occupy).
    pub fn relocate(&mut self, stance: Stance, from: Cell, to: Cell) {
        self.clear(stance, from);
        self.set(stance, to);
    }

    /// Replace `old` with `new` at `cell`.
    pub fn transition(&mut self, cell: Cell, old: Stance, new: Stance) {
        self.clear(old, cell);
        self.set(new, cell);
    }

    /// Stances whose bit is set at `cell`.
    pub fn stances_at(&self, cell: Cell) -> impl Iterator<Item = Stance> + '_ {
        Stance::ALL.into_iter().filter(move |s| self.is_set(*s, cell))
    }
}

/// Posted sugar/spice price at each occupied cell, zero elsewhere.
#[derive(Debug, Clone)]
pub struct PriceMap {
    layers: PerCommodity<Layer<f64>>,
}

impl PriceMap {
    pub fn new(dims: Dimensions) -> Self {
        Self {
            layers: PerCommodity::new(Layer::filled(dims, 0.0), Layer::filled(dims, 0.0)),
        }
    }

    pub fn layer(&self, commodity: Commodity) -> &Layer<f64> {
        &self.layers[commodity]
    }

    pub fn get(&self, cell: Cell, commodity: Commodity) -> f64 {
        *self.layers[commodity].get(cell)
    }

    /// Overwrite both prices at `cell`.
    pub fn post(&mut self, cell: Cell, prices: PerCommodity<f64>) {
        for commodity in Commodity::ALL {
            self.layers[commodity].set(cell, prices[commodity]);
        }
    }

    pub fn clear(&mut self, cell: Cell) {
        self.post(cell, PerCommodity::splat(0.0));
    }

    pub fn relocate(&mut self, from: Cell, to: Cell, prices: PerCommodity<f64>) {
        self.clear(from);
        self.post(to, prices);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stance_transition_and_relocate() {
        let dims = Dimensions::new(3, 3).unwrap();
        let mut map = StanceMap::new(dims);
        let a = Cell::new(0, 0);
        let b = Cell::new(1, 1);

        map.set(Stance::Defence, a);
        map.relocate(Stance::Defence, a, b);
        assert!(!map.is_set(Stance::Defence, a));
        assert!(map.is_set(Stance::Defence, b));

        map.transition(b, Stance::Defence, Stance::SellSugar);
        let here: Vec<Stance> = map.stances_at(b).collect();
        assert_eq!(here, vec![Stance::SellSugar]);
        assert_eq!(map.stances_at(a).count(), 0);
    }

    #[test]
    fn test_price_post_and_clear() {
        let dims = Dimensions::new(2, 2).unwrap();
        let mut map = PriceMap::new(dims);
        let a = Cell::new(1, 0);
        map.post(a, PerCommodity::new(2.0, 3.5));
        assert_eq!(map.get(a, Commodity::Sugar), 2.0);
        assert_eq!(map.get(a, Commodity::Spice), 3.5);

        map.relocate(a, Cell::new(0, 1), PerCommodity::new(2.0, 3.5));
        assert_eq!(map.get(a, Commodity::Spice), 0.0);
        assert_eq!(map.get(Cell::new(0, 1), Commodity::Sugar), 2.0);
    }
}
