//! MarginLedger Core — loan offerings, leveraged positions and their lifecycle.
//!
//! This crate contains the accounting core of the margin ledger:
//! - Domain types (addresses, assets, loan offerings, positions)
//! - Loan offering hashing and signature validation
//! - `LedgerCore`: open, increase, close, margin call, force recovery, transfers
//! - Contract owner callbacks for positions owned by code
//! - External collaborator traits (token ledger, signatures, sell orders, clock)
//! - Interest and pro-rata math, configuration and logging setup

pub mod config;
pub mod domain;
pub mod external;
pub mod interest;
pub mod ledger;
pub mod logging;
pub mod math;

pub use config::{ConfigError, LedgerConfig};
pub use ledger::{CloseOutcome, Env, LedgerCore, LedgerError, LedgerEvent};
