use super::error::LedgerError;
use super::events::LedgerEvent;
use super::owner::OwnershipGrant;
use super::{Env, LedgerCore};
use crate::domain::{Address, LoanOffering, PositionId};
use crate::external::TokenError;
use tracing::{info, warn};

impl LedgerCore {
    /// Hand the position to `new_owner`.
    ///
    /// A contract receiving ownership is asked first; if it refuses, the
    /// position stays with its current owner.
    pub fn transfer_position(
        &mut self,
        env: &mut Env<'_>,
        id: &PositionId,
        caller: Address,
        new_owner: Address,
    ) -> Result<(), LedgerError> {
        let position = self.get(id)?;
        if position.closed {
            return Err(LedgerError::PositionClosed);
        }
        if position.owner != caller {
            warn!(position = %id, %caller, "position transfer by non-owner refused");
            return Err(LedgerError::NotAuthorized);
        }
        if new_owner.is_zero() {
            return Err(TokenError::ZeroAddress.into());
        }

        if let Some(contract) = env.owners.owner_mut(&new_owner) {
            let grant = OwnershipGrant::new(caller, position.clone());
            let supply = contract.receive_position_ownership(&grant)?;
            info!(position = %id, contract = %new_owner, supply, "contract accepted position");
        }

        let now = env.clock.now();
        self.get_mut(id)?.owner = new_owner;
        self.record(
            now,
            LedgerEvent::PositionTransferred {
                id: *id,
                from: caller,
                to: new_owner,
            },
        );
        info!(position = %id, from = %caller, to = %new_owner, "position transferred");
        Ok(())
    }

    /// Hand the lender's side (repayments, calls, recovery) to `new_lender`.
    pub fn transfer_loan(
        &mut self,
        env: &mut Env<'_>,
        id: &PositionId,
        caller: Address,
        new_lender: Address,
    ) -> Result<(), LedgerError> {
        let position = self.get(id)?;
        if position.closed {
            return Err(LedgerError::PositionClosed);
        }
        if position.lender != caller {
            warn!(position = %id, %caller, "loan transfer by non-lender refused");
            return Err(LedgerError::NotAuthorized);
        }
        if new_lender.is_zero() {
            return Err(TokenError::ZeroAddress.into());
        }

        let now = env.clock.now();
        self.get_mut(id)?.lender = new_lender;
        self.record(
            now,
            LedgerEvent::LoanTransferred {
                id: *id,
                from: caller,
                to: new_lender,
            },
        );
        info!(position = %id, from = %caller, to = %new_lender, "loan transferred");
        Ok(())
    }

    /// Withdraw up to `amount` of an offering's unfilled principal.
    /// Returns the amount actually cancelled.
    pub fn cancel_loan_offering(
        &mut self,
        env: &mut Env<'_>,
        offering: &LoanOffering,
        caller: Address,
        amount: u128,
    ) -> Result<u128, LedgerError> {
        if amount == 0 {
            return Err(LedgerError::ZeroAmount);
        }
        if offering.payer != caller {
            return Err(LedgerError::NotAuthorized);
        }
        let hash = offering.loan_hash();
        let cancelled = amount.min(self.remaining_for(&hash, offering));
        if cancelled == 0 {
            return Ok(0);
        }

        let usage = self.loans.entry(hash).or_default();
        usage.cancelled = usage.cancelled.saturating_add(cancelled);
        self.record(
            env.clock.now(),
            LedgerEvent::LoanOfferingCanceled {
                loan_hash: hash,
                payer: caller,
                cancelled,
            },
        );
        info!(loan = %hash, cancelled, "loan offering canceled");
        Ok(cancelled)
    }
}
