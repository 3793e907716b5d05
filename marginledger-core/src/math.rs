//! Integer proportion helpers.
//!
//! Every proportional amount in the ledger goes through one of these two
//! functions so the rounding direction is always explicit at the call site.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MathError {
    #[error("arithmetic overflow")]
    Overflow,
    #[error("division by zero")]
    DivisionByZero,
}

/// `floor(numerator * target / denominator)`.
pub fn partial_amount(numerator: u128, denominator: u128, target: u128) -> Result<u128, MathError> {
    if denominator == 0 {
        return Err(MathError::DivisionByZero);
    }
    let product = numerator.checked_mul(target).ok_or(MathError::Overflow)?;
    Ok(product / denominator)
}

/// `ceil(numerator * target / denominator)`.
pub fn partial_amount_rounded_up(
    numerator: u128,
    denominator: u128,
    target: u128,
) -> Result<u128, MathError> {
    if denominator == 0 {
        return Err(MathError::DivisionByZero);
    }
    let product = numerator.checked_mul(target).ok_or(MathError::Overflow)?;
    let quotient = product / denominator;
    if product % denominator == 0 {
        Ok(quotient)
    } else {
        Ok(quotient + 1)
    }
}
