//! Domain types for the margin ledger

pub mod ids;
pub mod offering;
pub mod position;

pub use ids::{Address, AssetId, LoanHash, PositionId};
pub use offering::{LoanOffering, LoanRates};
pub use position::{MarginCall, Position};
