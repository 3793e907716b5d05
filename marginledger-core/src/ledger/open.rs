use super::error::LedgerError;
use super::events::LedgerEvent;
use super::owner::IncreaseReceipt;
use super::plan::TransferPlan;
use super::validate::approve_offering;
use super::{Env, LedgerCore};
use crate::domain::{Address, LoanOffering, Position, PositionId};
use crate::math::partial_amount_rounded_up;
use tracing::{debug, info, warn};

impl LedgerCore {
    /// Open a position for `trader`, funded by `offering`.
    ///
    /// The payer's principal goes to the trader and the trader's collateral
    /// to the vault. Fees, when the offering names a fee recipient, are
    /// scaled by `principal / max_amount`.
    pub fn open(
        &mut self,
        env: &mut Env<'_>,
        offering: &LoanOffering,
        principal: u128,
        collateral: u128,
        trader: Address,
    ) -> Result<PositionId, LedgerError> {
        if principal == 0 {
            return Err(LedgerError::ZeroAmount);
        }
        let now = env.clock.now();
        let hash = offering.loan_hash();
        let loan = approve_offering(
            offering,
            env.oracle,
            principal,
            &trader,
            now,
            self.remaining_for(&hash, offering),
        )?;
        if collateral == 0 || collateral < loan.min_collateral {
            return Err(LedgerError::InsufficientCollateral {
                provided: collateral,
                required: loan.min_collateral.max(1),
            });
        }

        let id = PositionId::derive(&hash, &trader, offering.salt);
        if self.positions.contains_key(&id) {
            return Err(LedgerError::PositionExists);
        }

        let mut plan = TransferPlan::new(self.vault);
        loan.add_funding(&mut plan, offering, principal, trader);
        plan.pull(&offering.held_token, trader, self.vault, collateral);
        plan.check(&*env.tokens)?;
        debug!(
            lender_fee = loan.lender_fee,
            taker_fee = loan.taker_fee,
            min_collateral = loan.min_collateral,
            "offering approved"
        );

        plan.execute(env.tokens)?;
        self.add_fill(hash, principal);
        self.positions.insert(
            id,
            Position {
                id,
                owed_token: offering.owed_token.clone(),
                held_token: offering.held_token.clone(),
                owner: trader,
                lender: loan.lender,
                principal,
                balance: collateral,
                loan_hash: hash,
                interest_rate: offering.rates.interest_rate,
                interest_period: offering.rates.interest_period,
                call_time_limit: offering.call_time_limit,
                max_duration: offering.max_duration,
                start_timestamp: now,
                margin_call: None,
                closed: false,
            },
        );
        self.record(
            now,
            LedgerEvent::PositionOpened {
                id,
                trader,
                lender: loan.lender,
                loan_hash: hash,
                principal,
                collateral,
            },
        );
        info!(position = %id, %trader, principal, collateral, "position opened");
        Ok(id)
    }

    /// Add `principal` to a position from another offering of the same lender.
    ///
    /// The trader posts collateral in the position's current ratio, rounded up.
    /// Returns the collateral added.
    pub fn increase(
        &mut self,
        env: &mut Env<'_>,
        id: &PositionId,
        offering: &LoanOffering,
        principal: u128,
        trader: Address,
    ) -> Result<u128, LedgerError> {
        if principal == 0 {
            return Err(LedgerError::ZeroAmount);
        }
        let position = self.get(id)?;
        if position.is_called() {
            return Err(LedgerError::PositionMarginCalled);
        }
        if position.closed {
            return Err(LedgerError::PositionClosed);
        }

        let now = env.clock.now();
        let hash = offering.loan_hash();
        let loan = approve_offering(
            offering,
            env.oracle,
            principal,
            &trader,
            now,
            self.remaining_for(&hash, offering),
        )?;
        if offering.owed_token != position.owed_token
            || offering.held_token != position.held_token
            || loan.lender != position.lender
        {
            return Err(LedgerError::InvalidOffering(
                "offering does not match the position's assets and lender".into(),
            ));
        }

        let added_collateral =
            partial_amount_rounded_up(principal, position.principal, position.balance)?;
        if added_collateral < loan.min_collateral {
            return Err(LedgerError::InsufficientCollateral {
                provided: added_collateral,
                required: loan.min_collateral,
            });
        }
        let new_principal = position
            .principal
            .checked_add(principal)
            .ok_or(LedgerError::ArithmeticOverflow)?;
        let new_balance = position
            .balance
            .checked_add(added_collateral)
            .ok_or(LedgerError::ArithmeticOverflow)?;

        let allowance = if position.owner == trader {
            None
        } else if let Some(contract) = env.owners.owner(&position.owner) {
            Some(contract.increase_position_on_behalf_of(
                &trader,
                position,
                principal,
                added_collateral,
            )?)
        } else {
            warn!(position = %id, %trader, "increase by non-owner refused");
            return Err(LedgerError::NotAuthorized);
        };

        let mut plan = TransferPlan::new(self.vault);
        loan.add_funding(&mut plan, offering, principal, trader);
        plan.pull(&position.held_token, trader, self.vault, added_collateral);
        plan.check(&*env.tokens)?;

        if let Some(allowance) = allowance {
            let owner = position.owner;
            let receipt =
                IncreaseReceipt::new(*id, trader, principal, added_collateral, allowance.claims);
            if let Some(contract) = env.owners.owner_mut(&owner) {
                contract.settle_increase(&receipt)?;
            }
        }

        plan.execute(env.tokens)?;
        self.add_fill(hash, principal);
        let position = self.get_mut(id)?;
        position.principal = new_principal;
        position.balance = new_balance;
        self.record(
            now,
            LedgerEvent::PositionIncreased {
                id: *id,
                trader,
                loan_hash: hash,
                added_principal: principal,
                added_collateral,
            },
        );
        info!(position = %id, %trader, principal, added_collateral, "position increased");
        Ok(added_collateral)
    }
}
