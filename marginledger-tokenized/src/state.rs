use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a tokenized position.
///
/// `Uninitialized` → `Open` once, on receiving its position.
/// `Open` → `Closed` once the position is fully closed or force-recovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum TokenizedPositionState {
    #[default]
    Uninitialized,
    Open,
    Closed,
}

impl fmt::Display for TokenizedPositionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenizedPositionState::Uninitialized => write!(f, "UNINITIALIZED"),
            TokenizedPositionState::Open => write!(f, "OPEN"),
            TokenizedPositionState::Closed => write!(f, "CLOSED"),
        }
    }
}
