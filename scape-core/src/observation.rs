// What a policy sees: a stack of equal-shaped grids.

use crate::field::ResourceField;
use crate::grid::{Dimensions, Layer};
use crate::maps::{PriceMap, StanceMap};
use crate::occupancy::OccupancyIndex;
use crate::types::{Cell, Commodity, Stance};

/// One grid in the observation stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Occupancy,
    Stock(Commodity),
    Stance(Stance),
    Price(Commodity),
}

impl Channel {
    pub const COUNT: usize = 1 + 2 + Stance::ALL.len() + 2;

    /// Stack order: occupancy, sugar, spice, the stances in `Stance::ALL`
    /// order, sugar price, spice price.
    pub fn index(self) -> usize {
        match self {
            Channel::Occupancy => 0,
            Channel::Stock(c) => 1 + c as usize,
            Channel::Stance(s) => 3 + s.index(),
            Channel::Price(c) => 3 + Stance::ALL.len() + c as usize,
        }
    }

    pub fn all() -> impl Iterator<Item = Channel> {
        std::iter::once(Channel::Occupancy)
            .chain(Commodity::ALL.into_iter().map(Channel::Stock))
            .chain(Stance::ALL.into_iter().map(Channel::Stance))
            .chain(Commodity::ALL.into_iter().map(Channel::Price))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    dims: Dimensions,
    layers: Vec<Layer<f64>>,
}

impl Observation {
    pub(crate) fn capture(
        field: &ResourceField,
        occupancy: &OccupancyIndex,
        stances: &StanceMap,
        prices: &PriceMap,
    ) -> Self {
        let dims = field.dims();
        let as_float = |b: bool| if b { 1.0 } else { 0.0 };

        let layers = Channel::all()
            .map(|channel| match channel {
                Channel::Occupancy => Layer::from_fn(dims, |cell| as_float(!occupancy.is_free(cell))),
                Channel::Stock(c) => field.stock_layer(c).clone(),
                Channel::Stance(s) => Layer::from_fn(dims, |cell| as_float(stances.is_set(s, cell))),
                Channel::Price(c) => prices.layer(c).clone(),
            })
            .collect();

        Self { dims, layers }
    }

    pub fn dims(&self) -> Dimensions {
        self.dims
    }

    pub fn layer(&self, channel: Channel) -> &Layer<f64> {
        &self.layers[channel.index()]
    }

    pub fn at(&self, channel: Channel, cell: Cell) -> f64 {
        *self.layer(channel).get(cell)
    }

    /// Flatten to `[channel][y][x]`.
    pub fn to_stacked(&self) -> Vec<f64> {
        let mut out = Vec::with_capacity(Channel::COUNT * self.dims.cell_count());
        for layer in &self.layers {
            out.extend_from_slice(layer.values());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AgentId, PerCommodity};
    use slotmap::SlotMap;

    #[test]
    fn test_channel_indices_cover_stack() {
        let indices: Vec<usize> = Channel::all().map(Channel::index).collect();
        assert_eq!(indices, (0..Channel::COUNT).collect::<Vec<_>>());
        assert_eq!(Channel::COUNT, 17);
    }

    #[test]
    fn test_capture_reflects_world() {
        let dims = Dimensions::new(3, 2).unwrap();
        let field = ResourceField::uniform(dims, PerCommodity::new(2.0, 3.0), PerCommodity::splat(1.0));
        let mut occupancy = OccupancyIndex::new(dims);
        let mut stances = StanceMap::new(dims);
        let mut prices = PriceMap::new(dims);

        let mut keys: SlotMap<AgentId, ()> = SlotMap::with_key();
        let cell = Cell::new(2, 1);
        occupancy.place(keys.insert(()), cell);
        stances.set(Stance::SellSpice, cell);
        prices.post(cell, PerCommodity::new(1.5, 4.0));

        let obs = Observation::capture(&field, &occupancy, &stances, &prices);
        assert_eq!(obs.at(Channel::Occupancy, cell), 1.0);
        assert_eq!(obs.at(Channel::Occupancy, Cell::new(0, 0)), 0.0);
        assert_eq!(obs.at(Channel::Stock(Commodity::Spice), cell), 3.0);
        assert_eq!(obs.at(Channel::Stance(Stance::SellSpice), cell), 1.0);
        assert_eq!(obs.at(Channel::Stance(Stance::Defence), cell), 0.0);
        assert_eq!(obs.at(Channel::Price(Commodity::Spice), cell), 4.0);

        let flat = obs.to_stacked();
        assert_eq!(flat.len(), 17 * 6);
        // occupancy layer, row 1, column 2
        assert_eq!(flat[dims.index(cell)], 1.0);
    }
}
