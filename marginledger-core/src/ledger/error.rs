use crate::external::{ExecutorError, TokenError};
use crate::math::MathError;
use thiserror::Error;

/// Errors from ledger and position-owner operations.
///
/// Every operation checks all of these before it mutates anything, so an
/// `Err` always means no state changed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("invalid loan offering: {0}")]
    InvalidOffering(String),

    #[error("insufficient funds: {0}")]
    InsufficientFunds(TokenError),

    #[error("collateral {provided} below required {required}")]
    InsufficientCollateral { provided: u128, required: u128 },

    #[error("position is margin-called")]
    PositionMarginCalled,

    #[error("position is closed")]
    PositionClosed,

    #[error("position is already closed")]
    AlreadyClosed,

    #[error("position is not margin-called")]
    NotCalled,

    #[error("caller is not authorized")]
    NotAuthorized,

    #[error("already initialized")]
    AlreadyInitialized,

    #[error("wrong position")]
    WrongPosition,

    #[error("unknown position")]
    UnknownPosition,

    #[error("amount must be non-zero")]
    ZeroAmount,

    #[error("not initialized")]
    Uninitialized,

    #[error("position is not closed")]
    NotClosed,

    #[error("position already exists")]
    PositionExists,

    #[error("order unfillable: {0}")]
    OrderUnfillable(String),

    #[error("arithmetic overflow")]
    ArithmeticOverflow,

    #[error("token error: {0}")]
    Token(#[from] TokenError),
}

impl From<MathError> for LedgerError {
    fn from(_: MathError) -> Self {
        LedgerError::ArithmeticOverflow
    }
}

impl From<ExecutorError> for LedgerError {
    fn from(err: ExecutorError) -> Self {
        match err {
            ExecutorError::OrderUnfillable(reason) => LedgerError::OrderUnfillable(reason),
            ExecutorError::Token(token) => LedgerError::InsufficientFunds(token),
            ExecutorError::Math(_) => LedgerError::ArithmeticOverflow,
        }
    }
}
