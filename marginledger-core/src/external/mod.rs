//! External collaborators: token ledger, signature oracle, sell-order executor, clock.
//!
//! Each is a trait the ledger consumes by reference, plus an in-memory
//! reference implementation.

pub mod clock;
pub mod executor;
pub mod signature;
pub mod token;

pub use clock::{Clock, ManualClock, SystemClock};
pub use executor::{ExecutorError, FixedRateExecutor, SellOrder, SellOrderExecutor};
pub use signature::{KeyedHashOracle, Signature, SignatureOracle, SigningKey};
pub use token::{BalanceSheet, InMemoryTokenLedger, TokenError, TokenLedger};
