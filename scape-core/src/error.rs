use thiserror::Error;

/// Errors emitted by the scape and its resource operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ScapeError {
    #[error("dimensions cannot be 0-length")]
    EmptyDimensions,

    #[error("grid dimensions must be non-zero, got {width}x{height}")]
    ZeroDimension { width: usize, height: usize },

    #[error("cannot place {agents} agents on a grid with {cells} cells")]
    GridFull { agents: usize, cells: usize },

    #[error("cell ({x}, {y}) is outside the grid or already occupied")]
    CellUnavailable { x: usize, y: usize },

    #[error("unknown commodity: {0:?}")]
    UnknownCommodity(String),

    #[error("unknown stance: {0:?}")]
    UnknownStance(String),

    #[error("agent is not registered with this scape")]
    UnknownAgent,

    #[error("agent is dead and takes no further turns")]
    AgentNotAlive,

    #[error("invariant violated: {0}")]
    InvariantViolation(String),
}
