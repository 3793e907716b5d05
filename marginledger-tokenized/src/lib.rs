//! MarginLedger Tokenized — fractional shares over a single ledger position.
//!
//! This crate contains:
//! - `TokenizedPosition`: a contract owner that mints shares for its position,
//!   proxies closes and increases for share holders, and pays out recovered
//!   collateral after close
//! - `TrustedRecipientSet`: the immutable allowlist of payout venues
//! - `WithdrawalDistributor`: the pro-rata payout algorithm
//! - `TokenizedRegistry`: the owner directory handed to the ledger

pub mod distributor;
pub mod metadata;
pub mod position_token;
pub mod registry;
pub mod state;
pub mod trusted;

pub use distributor::WithdrawalDistributor;
pub use metadata::TokenMetadata;
pub use position_token::TokenizedPosition;
pub use registry::TokenizedRegistry;
pub use state::TokenizedPositionState;
pub use trusted::TrustedRecipientSet;
