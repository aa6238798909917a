// Cell -> agent occupancy: at most one agent per cell

use crate::grid::{Dimensions, Layer};
use crate::types::{AgentId, Cell};

/// Which agent (if any) stands on each cell.
///
/// Only living agents are indexed; the scape vacates a cell when its
/// occupant dies.
#[derive(Debug, Clone)]
pub struct OccupancyIndex {
    cells: Layer<Option<AgentId>>,
}

impl OccupancyIndex {
    pub fn new(dims: Dimensions) -> Self {
        Self {
            cells: Layer::filled(dims, None),
        }
    }

    pub fn dims(&self) -> Dimensions {
        self.cells.dims()
    }

    pub fn is_free(&self, cell: Cell) -> bool {
        self.cells.get(cell).is_none()
    }

    pub fn agent_at(&self, cell: Cell) -> Option<AgentId> {
        *self.cells.get(cell)
    }

    /// Occupy a free cell. Returns false (and changes nothing) if it is taken.
    pub fn place(&mut self, agent: AgentId, cell: Cell) -> bool {
        let slot = self.cells.get_mut(cell);
        if slot.is_some() {
            return false;
        }
        *slot = Some(agent);
        true
    }

    /// Free a cell, returning its previous occupant.
    pub fn vacate(&mut self, cell: Cell) -> Option<AgentId> {
        self.cells.get_mut(cell).take()
    }

    /// Move `agent` from `from` to `to`.
    ///
    /// Rejected (returns false, nothing changes) if `to` is occupied or
    /// `from` is not held by `agent`.
    pub fn move_agent(&mut self, agent: AgentId, from: Cell, to: Cell) -> bool {
        if from == to {
            return self.agent_at(from) == Some(agent);
        }
        if self.agent_at(from) != Some(agent) || !self.is_free(to) {
            return false;
        }
        self.cells.set(from, None);
        self.cells.set(to, Some(agent));
        true
    }

    /// Occupants of the Moore neighborhood of `cell`, excluding the cell itself.
    pub fn occupants_near(&self, cell: Cell) -> impl Iterator<Item = AgentId> + '_ {
        self.dims()
            .moore(cell)
            .filter_map(move |c| self.agent_at(c))
    }

    /// Unoccupied cells in the Moore neighborhood of `cell`.
    pub fn free_cells_near(&self, cell: Cell) -> Vec<Cell> {
        self.dims()
            .moore(cell)
            .filter(|c| self.is_free(*c))
            .collect()
    }

    pub fn occupied(&self) -> impl Iterator<Item = (Cell, AgentId)> + '_ {
        let dims = self.dims();
        self.cells
            .values()
            .iter()
            .enumerate()
            .filter_map(move |(i, slot)| slot.map(|id| (dims.cell_at(i), id)))
    }

    pub fn occupied_count(&self) -> usize {
        self.cells.values().iter().filter(|slot| slot.is_some()).count()
    }
}
