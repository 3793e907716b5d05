use super::error::LedgerError;
use super::events::LedgerEvent;
use super::plan::TransferPlan;
use super::{Env, LedgerCore};
use crate::domain::{Address, MarginCall, PositionId};
use tracing::{info, warn};

impl LedgerCore {
    /// Start the call clock. After `call_time_limit` the lender may
    /// force-recover unless the owner closes or tops up first.
    pub fn margin_call(
        &mut self,
        env: &mut Env<'_>,
        id: &PositionId,
        lender: Address,
        required_deposit: u128,
    ) -> Result<(), LedgerError> {
        let position = self.get(id)?;
        if position.closed {
            return Err(LedgerError::PositionClosed);
        }
        if position.lender != lender {
            warn!(position = %id, caller = %lender, "margin call by non-lender refused");
            return Err(LedgerError::NotAuthorized);
        }
        if position.is_called() {
            return Err(LedgerError::PositionMarginCalled);
        }

        let now = env.clock.now();
        self.get_mut(id)?.margin_call = Some(MarginCall {
            called_at: now,
            required_deposit,
        });
        self.record(
            now,
            LedgerEvent::MarginCallInitiated {
                id: *id,
                lender,
                required_deposit,
            },
        );
        info!(position = %id, required_deposit, "margin call initiated");
        Ok(())
    }

    pub fn cancel_margin_call(
        &mut self,
        env: &mut Env<'_>,
        id: &PositionId,
        lender: Address,
    ) -> Result<(), LedgerError> {
        let position = self.get(id)?;
        if position.closed {
            return Err(LedgerError::PositionClosed);
        }
        if position.lender != lender {
            warn!(position = %id, caller = %lender, "margin call cancel by non-lender refused");
            return Err(LedgerError::NotAuthorized);
        }
        if !position.is_called() {
            return Err(LedgerError::NotCalled);
        }

        let now = env.clock.now();
        self.get_mut(id)?.margin_call = None;
        self.record(
            now,
            LedgerEvent::MarginCallCanceled {
                id: *id,
                lender,
                deposit: 0,
            },
        );
        info!(position = %id, "margin call canceled");
        Ok(())
    }

    /// Owner top-up. A single deposit of at least the call's required
    /// deposit cancels an outstanding margin call.
    pub fn deposit_collateral(
        &mut self,
        env: &mut Env<'_>,
        id: &PositionId,
        depositor: Address,
        amount: u128,
    ) -> Result<(), LedgerError> {
        if amount == 0 {
            return Err(LedgerError::ZeroAmount);
        }
        let position = self.get(id)?;
        if position.closed {
            return Err(LedgerError::PositionClosed);
        }
        if position.owner != depositor {
            return Err(LedgerError::NotAuthorized);
        }
        let new_balance = position
            .balance
            .checked_add(amount)
            .ok_or(LedgerError::ArithmeticOverflow)?;
        let cancels_call = position
            .margin_call
            .is_some_and(|call| amount >= call.required_deposit);
        let lender = position.lender;

        let mut plan = TransferPlan::new(self.vault);
        plan.pull(&position.held_token, depositor, self.vault, amount);
        plan.check(&*env.tokens)?;
        plan.execute(env.tokens)?;

        let now = env.clock.now();
        let position = self.get_mut(id)?;
        position.balance = new_balance;
        if cancels_call {
            position.margin_call = None;
        }
        self.record(
            now,
            LedgerEvent::CollateralDeposited {
                id: *id,
                depositor,
                amount,
            },
        );
        if cancels_call {
            self.record(
                now,
                LedgerEvent::MarginCallCanceled {
                    id: *id,
                    lender,
                    deposit: amount,
                },
            );
            info!(position = %id, amount, "margin call satisfied by deposit");
        }
        Ok(())
    }

    /// Pay all remaining collateral to the position owner and close the
    /// position, once a call has run out of time or the position has matured.
    ///
    /// Returns the collateral paid out.
    pub fn force_recover_collateral(
        &mut self,
        env: &mut Env<'_>,
        id: &PositionId,
        lender: Address,
    ) -> Result<u128, LedgerError> {
        let position = self.get(id)?;
        if position.closed {
            return Err(LedgerError::AlreadyClosed);
        }
        if position.lender != lender {
            warn!(position = %id, caller = %lender, "force recover by non-lender refused");
            return Err(LedgerError::NotAuthorized);
        }
        let now = env.clock.now();
        if !position.is_recoverable(now) {
            return Err(LedgerError::NotCalled);
        }

        let amount = position.balance;
        let recipient = position.owner;
        let mut plan = TransferPlan::new(self.vault);
        plan.release(&position.held_token, recipient, amount);
        plan.check(&*env.tokens)?;
        plan.execute(env.tokens)?;

        let position = self.get_mut(id)?;
        position.balance = 0;
        position.closed = true;
        self.record(
            now,
            LedgerEvent::CollateralForceRecovered {
                id: *id,
                recipient,
                amount,
            },
        );
        info!(position = %id, %recipient, amount, "collateral force-recovered");
        self.notify_closed(env.owners, id);
        Ok(amount)
    }
}
