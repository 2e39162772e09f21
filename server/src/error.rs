use shared::AreaId;
use thiserror::Error;

/// Configuration problems discovered while ticking. They abort the current
/// tick; the loop carries on with the next one.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SimulationError {
    #[error("area {0} does not exist")]
    AreaNotFound(AreaId),
    #[error("area {0} has no walkable tiles")]
    NoWalkableTiles(AreaId),
}
