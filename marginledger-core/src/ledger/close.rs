use super::error::LedgerError;
use super::events::LedgerEvent;
use super::owner::{CloseAllowance, CloseReceipt};
use super::plan::TransferPlan;
use super::{Env, LedgerCore};
use crate::domain::{Address, Position, PositionId};
use crate::external::{SellOrder, SellOrderExecutor, TokenError};
use crate::math::partial_amount;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Result of a (partial) close.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloseOutcome {
    pub closed_amount: u128,
    /// Collateral released for the closed principal.
    pub held_token_payout: u128,
    /// Principal plus interest paid to the lender.
    pub owed_repaid: u128,
    /// Owed-asset proceeds left over after repayment (order closes only).
    pub owed_surplus: u128,
}

/// A close that passed every check and only needs committing.
struct PreparedClose {
    position: Position,
    closed_amount: u128,
    payout: u128,
    repayment: u128,
    allowance: Option<CloseAllowance>,
    now: u64,
}

impl LedgerCore {
    /// Close up to `requested` principal.
    ///
    /// The closer repays the closed principal plus interest to the lender and
    /// `payout_recipient` receives the collateral released for it. The amount
    /// closed is capped at the outstanding principal and, for positions owned
    /// by a contract, at what the contract allows the closer.
    pub fn close(
        &mut self,
        env: &mut Env<'_>,
        id: &PositionId,
        closer: Address,
        requested: u128,
        payout_recipient: Address,
    ) -> Result<CloseOutcome, LedgerError> {
        let prepared = self.prepare_close(env, id, closer, requested, payout_recipient)?;

        let mut plan = TransferPlan::new(self.vault);
        plan.pull(
            &prepared.position.owed_token,
            closer,
            prepared.position.lender,
            prepared.repayment,
        );
        plan.release(&prepared.position.held_token, payout_recipient, prepared.payout);
        self.check_owner(env, &prepared, closer, payout_recipient)?;
        plan.check(&*env.tokens)?;

        self.settle_owner(env, &prepared, closer, payout_recipient)?;
        plan.execute(env.tokens)?;

        let outcome = CloseOutcome {
            closed_amount: prepared.closed_amount,
            held_token_payout: prepared.payout,
            owed_repaid: prepared.repayment,
            owed_surplus: 0,
        };
        self.commit_close(env, &prepared, closer, payout_recipient, outcome)?;
        Ok(outcome)
    }

    /// Close by selling the released collateral through `executor`.
    ///
    /// The sale must raise at least the repayment; the lender is repaid out
    /// of the proceeds and the rest goes to `payout_recipient`. The closer
    /// pays nothing out of pocket.
    pub fn close_with_order(
        &mut self,
        env: &mut Env<'_>,
        executor: &mut dyn SellOrderExecutor,
        id: &PositionId,
        closer: Address,
        requested: u128,
        payout_recipient: Address,
    ) -> Result<CloseOutcome, LedgerError> {
        let prepared = self.prepare_close(env, id, closer, requested, payout_recipient)?;
        if payout_recipient.is_zero() {
            return Err(TokenError::ZeroAddress.into());
        }
        // the sale cannot be undone, so the owner must agree to settle first
        self.check_owner(env, &prepared, closer, payout_recipient)?;

        let order = SellOrder {
            sell_asset: prepared.position.held_token.clone(),
            buy_asset: prepared.position.owed_token.clone(),
            min_proceeds: prepared.repayment,
        };
        let proceeds = executor.execute(env.tokens, &self.vault, &order, prepared.payout)?;
        let surplus = proceeds.saturating_sub(prepared.repayment);
        debug!(position = %id, proceeds, surplus, "collateral sold");

        self.settle_owner(env, &prepared, closer, payout_recipient)?;
        let mut plan = TransferPlan::new(self.vault);
        plan.release(
            &prepared.position.owed_token,
            prepared.position.lender,
            prepared.repayment,
        );
        plan.release(&prepared.position.owed_token, payout_recipient, surplus);
        plan.execute(env.tokens)?;

        let outcome = CloseOutcome {
            closed_amount: prepared.closed_amount,
            held_token_payout: prepared.payout,
            owed_repaid: prepared.repayment,
            owed_surplus: surplus,
        };
        self.commit_close(env, &prepared, closer, payout_recipient, outcome)?;
        Ok(outcome)
    }

    fn prepare_close(
        &self,
        env: &Env<'_>,
        id: &PositionId,
        closer: Address,
        requested: u128,
        payout_recipient: Address,
    ) -> Result<PreparedClose, LedgerError> {
        if requested == 0 {
            return Err(LedgerError::ZeroAmount);
        }
        let position = self.get(id)?;
        if position.closed {
            return Err(LedgerError::PositionClosed);
        }

        let mut closed_amount = requested.min(position.principal);
        let allowance = if closer == position.owner {
            None
        } else if let Some(contract) = env.owners.owner(&position.owner) {
            let allowance =
                contract.close_on_behalf_of(&closer, &payout_recipient, position, closed_amount)?;
            closed_amount = closed_amount.min(allowance.amount);
            Some(allowance)
        } else {
            warn!(position = %id, %closer, "close by non-owner refused");
            return Err(LedgerError::NotAuthorized);
        };
        if closed_amount == 0 {
            return Err(LedgerError::NotAuthorized);
        }

        let now = env.clock.now();
        let payout = partial_amount(closed_amount, position.principal, position.balance)?;
        let interest = self.interest_on(position, closed_amount, now)?;
        let repayment = closed_amount
            .checked_add(interest)
            .ok_or(LedgerError::ArithmeticOverflow)?;
        debug!(position = %id, closed_amount, payout, interest, "close priced");

        Ok(PreparedClose {
            position: position.clone(),
            closed_amount,
            payout,
            repayment,
            allowance,
            now,
        })
    }

    fn close_receipt(
        prepared: &PreparedClose,
        closer: Address,
        payout_recipient: Address,
    ) -> Option<CloseReceipt> {
        prepared.allowance.map(|allowance| {
            CloseReceipt::new(
                prepared.position.id,
                closer,
                payout_recipient,
                prepared.closed_amount,
                allowance.claims,
            )
        })
    }

    fn check_owner(
        &self,
        env: &Env<'_>,
        prepared: &PreparedClose,
        closer: Address,
        payout_recipient: Address,
    ) -> Result<(), LedgerError> {
        let Some(receipt) = Self::close_receipt(prepared, closer, payout_recipient) else {
            return Ok(());
        };
        match env.owners.owner(&prepared.position.owner) {
            Some(contract) => contract.check_close(&receipt),
            None => Ok(()),
        }
    }

    fn settle_owner(
        &self,
        env: &mut Env<'_>,
        prepared: &PreparedClose,
        closer: Address,
        payout_recipient: Address,
    ) -> Result<(), LedgerError> {
        let Some(receipt) = Self::close_receipt(prepared, closer, payout_recipient) else {
            return Ok(());
        };
        match env.owners.owner_mut(&prepared.position.owner) {
            Some(contract) => contract.settle_close(&receipt),
            None => Ok(()),
        }
    }

    fn commit_close(
        &mut self,
        env: &mut Env<'_>,
        prepared: &PreparedClose,
        closer: Address,
        payout_recipient: Address,
        outcome: CloseOutcome,
    ) -> Result<(), LedgerError> {
        let id = prepared.position.id;
        let position = self.get_mut(&id)?;
        position.principal -= outcome.closed_amount;
        position.balance -= outcome.held_token_payout;
        let remaining_principal = position.principal;
        let fully_closed = remaining_principal == 0;
        if fully_closed {
            position.closed = true;
            position.margin_call = None;
        }

        self.record(
            prepared.now,
            LedgerEvent::PositionClosed {
                id,
                closer,
                payout_recipient,
                closed_amount: outcome.closed_amount,
                held_token_payout: outcome.held_token_payout,
                owed_repaid: outcome.owed_repaid,
                remaining_principal,
            },
        );
        info!(
            position = %id,
            %closer,
            closed = outcome.closed_amount,
            payout = outcome.held_token_payout,
            remaining_principal,
            "position closed"
        );
        if fully_closed {
            self.notify_closed(env.owners, &id);
        }
        Ok(())
    }
}
