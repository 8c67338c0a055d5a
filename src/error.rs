//! Construction-boundary errors (§3 [ADDED], §7). Everything past
//! construction follows §7's fatal/recoverable/logged-and-continue split,
//! not this type.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EnvError {
    #[error("numDrones must be in 2..=4, got {0}")]
    InvalidDroneCount(usize),

    #[error("numAgents must be in 1..=numDrones, got {num_agents} with numDrones={num_drones}")]
    InvalidAgentCount { num_agents: usize, num_drones: usize },

    #[error("buffer too small: expected at least {expected} elements, got {actual}")]
    BufferTooSmall { expected: usize, actual: usize },
}
