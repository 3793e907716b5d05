//! Loan offering checks shared by open and increase.

use super::error::LedgerError;
use super::plan::TransferPlan;
use crate::domain::{Address, LoanHash, LoanOffering};
use crate::external::SignatureOracle;
use crate::math::partial_amount;

/// An offering that may fund `principal` right now, with its scaled terms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ApprovedLoan {
    pub hash: LoanHash,
    pub lender: Address,
    pub lender_fee: u128,
    pub taker_fee: u128,
    pub min_collateral: u128,
}

fn invalid(reason: impl Into<String>) -> LedgerError {
    LedgerError::InvalidOffering(reason.into())
}

/// Check `offering` can fund `principal` for `trader` at `now`, given
/// `remaining` unfilled and uncancelled principal.
pub(crate) fn approve_offering(
    offering: &LoanOffering,
    oracle: &dyn SignatureOracle,
    principal: u128,
    trader: &Address,
    now: u64,
    remaining: u128,
) -> Result<ApprovedLoan, LedgerError> {
    let hash = offering.loan_hash();
    let signature = offering
        .signature
        .as_ref()
        .ok_or_else(|| invalid("offering is unsigned"))?;
    if offering.payer.is_zero() || oracle.verify(&hash, signature) != Some(offering.payer) {
        return Err(invalid("signature does not verify against the payer"));
    }
    if offering.owed_token == offering.held_token {
        return Err(invalid("owed and held assets are the same"));
    }
    if offering.expiration_timestamp <= now {
        return Err(invalid(format!(
            "expired at {}, now {}",
            offering.expiration_timestamp, now
        )));
    }
    if !offering.taker.is_zero() && offering.taker != *trader {
        return Err(invalid("offering is restricted to another taker"));
    }

    let rates = &offering.rates;
    if rates.max_amount == 0 {
        return Err(invalid("max amount is zero"));
    }
    if principal < rates.min_amount {
        return Err(invalid(format!(
            "principal {} below minimum {}",
            principal, rates.min_amount
        )));
    }
    if principal > remaining {
        return Err(invalid(format!(
            "principal {} exceeds remaining {}",
            principal, remaining
        )));
    }

    let (lender_fee, taker_fee) = if offering.fee_recipient.is_zero() {
        (0, 0)
    } else {
        (
            partial_amount(principal, rates.max_amount, rates.lender_fee)?,
            partial_amount(principal, rates.max_amount, rates.taker_fee)?,
        )
    };

    Ok(ApprovedLoan {
        hash,
        lender: offering.lender_of_record(),
        lender_fee,
        taker_fee,
        min_collateral: partial_amount(principal, rates.max_amount, rates.min_held_token)?,
    })
}

impl ApprovedLoan {
    /// Fees to the fee recipient, then principal from payer to trader.
    pub fn add_funding(
        &self,
        plan: &mut TransferPlan,
        offering: &LoanOffering,
        principal: u128,
        trader: Address,
    ) {
        plan.pull(
            &offering.lender_fee_token,
            offering.payer,
            offering.fee_recipient,
            self.lender_fee,
        );
        plan.pull(
            &offering.taker_fee_token,
            trader,
            offering.fee_recipient,
            self.taker_fee,
        );
        plan.pull(&offering.owed_token, offering.payer, trader, principal);
    }
}
