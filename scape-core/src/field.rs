// Per-cell sugar and spice stock with regrowth toward capacity

use rand::Rng;

use crate::config::ScapeConfig;
use crate::grid::{Dimensions, Layer};
use crate::types::{Cell, Commodity, PerCommodity};

/// Renewable resource stock over the grid.
///
/// Invariant: `0 <= stock <= capacity` for every cell and commodity.
#[derive(Debug, Clone)]
pub struct ResourceField {
    stock: PerCommodity<Layer<f64>>,
    capacity: PerCommodity<Layer<f64>>,
    growth: PerCommodity<f64>,
}

impl ResourceField {
    /// Draw per-cell capacities uniformly from `[0, max]` and start every cell full.
    pub fn random<R: Rng + ?Sized>(dims: Dimensions, config: &ScapeConfig, rng: &mut R) -> Self {
        let max = config.max_capacity();
        let mut draw = |max: f64| -> Layer<f64> {
            Layer::from_fn(dims, |_| if max > 0.0 { rng.random_range(0.0..=max) } else { 0.0 })
        };
        let capacity = PerCommodity::new(draw(max.sugar), draw(max.spice));
        Self::full(capacity, config.growth())
    }

    /// Field with uniform capacity everywhere, starting full.
    pub fn uniform(dims: Dimensions, capacity: PerCommodity<f64>, growth: PerCommodity<f64>) -> Self {
        let capacity = capacity.map(|c| Layer::filled(dims, c.max(0.0)));
        Self::full(capacity, growth)
    }

    fn full(capacity: PerCommodity<Layer<f64>>, growth: PerCommodity<f64>) -> Self {
        Self {
            stock: capacity.clone(),
            capacity,
            growth,
        }
    }

    pub fn dims(&self) -> Dimensions {
        self.stock.sugar.dims()
    }

    pub fn stock(&self, cell: Cell, commodity: Commodity) -> f64 {
        *self.stock[commodity].get(cell)
    }

    pub fn capacity(&self, cell: Cell, commodity: Commodity) -> f64 {
        *self.capacity[commodity].get(cell)
    }

    pub fn stock_layer(&self, commodity: Commodity) -> &Layer<f64> {
        &self.stock[commodity]
    }

    /// Set a cell's stock directly, clamped into `[0, capacity]`.
    pub fn set_stock(&mut self, cell: Cell, commodity: Commodity, amount: f64) {
        let cap = self.capacity(cell, commodity);
        self.stock[commodity].set(cell, amount.clamp(0.0, cap));
    }

    /// Set a cell's capacity; stock is trimmed if it now exceeds it.
    pub fn set_capacity(&mut self, cell: Cell, commodity: Commodity, capacity: f64) {
        let capacity = capacity.max(0.0);
        self.capacity[commodity].set(cell, capacity);
        let stock = self.stock[commodity].get_mut(cell);
        *stock = stock.min(capacity);
    }

    /// Move every cell's stock toward capacity by the growth increment.
    pub fn grow(&mut self) {
        for commodity in Commodity::ALL {
            let growth = self.growth[commodity];
            let caps = self.capacity[commodity].values();
            for (stock, cap) in self.stock[commodity].values_mut().iter_mut().zip(caps) {
                *stock = (*stock + growth).clamp(0.0, *cap);
            }
        }
    }

    /// Remove and return the entire stock of a commodity at a cell.
    pub fn harvest(&mut self, cell: Cell, commodity: Commodity) -> f64 {
        std::mem::take(self.stock[commodity].get_mut(cell))
    }

    pub fn total(&self, commodity: Commodity) -> f64 {
        self.stock[commodity].values().iter().sum()
    }
}
