//! Interest owed on borrowed principal.
//!
//! Simple interest at an annual nominal rate, with elapsed time rounded up to
//! whole interest periods. Both roundings favour the lender.

use crate::math::{partial_amount_rounded_up, MathError};

/// Rate units per 100%. A rate of 3_650_000 is 3.65% a year.
pub const RATE_DENOMINATOR: u128 = 100_000_000;

/// Default seconds per interest year.
pub const SECONDS_PER_YEAR: u64 = 365 * 24 * 60 * 60;

/// Elapsed seconds rounded up to a whole number of interest periods.
pub fn effective_elapsed(elapsed: u64, interest_period: u64) -> u64 {
    if interest_period <= 1 || elapsed == 0 {
        return elapsed;
    }
    elapsed.div_ceil(interest_period).saturating_mul(interest_period)
}

/// Interest owed on `principal` after `elapsed` seconds.
pub fn interest_owed(
    principal: u128,
    interest_rate: u32,
    interest_period: u64,
    elapsed: u64,
    seconds_per_year: u64,
) -> Result<u128, MathError> {
    let seconds = effective_elapsed(elapsed, interest_period) as u128;
    if principal == 0 || interest_rate == 0 || seconds == 0 {
        return Ok(0);
    }
    let rate_time = (interest_rate as u128)
        .checked_mul(seconds)
        .ok_or(MathError::Overflow)?;
    let denominator = RATE_DENOMINATOR
        .checked_mul(seconds_per_year as u128)
        .ok_or(MathError::Overflow)?;
    partial_amount_rounded_up(principal, denominator, rate_time)
}
