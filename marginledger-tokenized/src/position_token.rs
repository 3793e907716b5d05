//! TokenizedPosition — a contract owner that splits one position into shares.
//!
//! On receiving its position the contract mints one share per unit of
//! collateral to the initial holder. From then on:
//! - holders close their own slice of the position, burning shares,
//! - trusted recipients (liquidity venues) may be paid out by anyone,
//!   without a burn; paying one on someone else's behalf permanently
//!   blocks further increases,
//! - increases mint shares to the trader without diluting existing holders,
//! - after the position closes, holders withdraw the recovered collateral
//!   pro rata.

use crate::distributor::WithdrawalDistributor;
use crate::metadata::TokenMetadata;
use crate::state::TokenizedPositionState;
use crate::trusted::TrustedRecipientSet;
use marginledger_core::domain::{Address, AssetId, Position, PositionId};
use marginledger_core::external::{BalanceSheet, TokenLedger};
use marginledger_core::ledger::{
    CloseAllowance, CloseReceipt, IncreaseAllowance, IncreaseReceipt, OwnershipGrant,
    PositionOwner,
};
use marginledger_core::math::{partial_amount, partial_amount_rounded_up};
use marginledger_core::{LedgerCore, LedgerError};
use std::collections::BTreeMap;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct TokenizedPosition {
    address: Address,
    position_id: PositionId,
    initial_holder: Address,
    trusted: TrustedRecipientSet,
    shares: BalanceSheet,
    state: TokenizedPositionState,
    held_token: Option<AssetId>,
    closed_using_trusted_recipient: bool,
    metadata: TokenMetadata,
}

impl TokenizedPosition {
    pub fn new(
        address: Address,
        position_id: PositionId,
        initial_holder: Address,
        trusted: TrustedRecipientSet,
        metadata: TokenMetadata,
    ) -> Self {
        Self {
            address,
            position_id,
            initial_holder,
            trusted,
            shares: BalanceSheet::new(),
            state: TokenizedPositionState::Uninitialized,
            held_token: None,
            closed_using_trusted_recipient: false,
            metadata,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn position_id(&self) -> &PositionId {
        &self.position_id
    }

    pub fn initial_holder(&self) -> Address {
        self.initial_holder
    }

    pub fn state(&self) -> TokenizedPositionState {
        self.state
    }

    /// Held asset of the position, known once the position is received.
    pub fn held_token(&self) -> Option<&AssetId> {
        self.held_token.as_ref()
    }

    pub fn trusted_recipients(&self) -> &TrustedRecipientSet {
        &self.trusted
    }

    /// Whether any close ever paid out to a trusted recipient.
    pub fn closed_using_trusted_recipient(&self) -> bool {
        self.closed_using_trusted_recipient
    }

    // ── Display metadata ───────────────────────────────────────────────

    pub fn name(&self) -> String {
        let mut name = format!("{} {}", self.metadata.name_prefix, self.position_id);
        if self.state == TokenizedPositionState::Uninitialized {
            name.push_str(" [UNINITIALIZED]");
        }
        name
    }

    pub fn symbol(&self) -> &str {
        &self.metadata.symbol
    }

    /// Shares carry the held asset's decimals.
    pub fn decimals(&self, tokens: &dyn TokenLedger) -> Result<u8, LedgerError> {
        let held = self.held_token.as_ref().ok_or(LedgerError::Uninitialized)?;
        Ok(tokens.decimals(held)?)
    }

    // ── Share ledger ───────────────────────────────────────────────────

    pub fn balance_of(&self, holder: &Address) -> u128 {
        self.shares.balance_of(holder)
    }

    pub fn total_supply(&self) -> u128 {
        self.shares.total_supply()
    }

    pub fn allowance(&self, owner: &Address, spender: &Address) -> u128 {
        self.shares.allowance(owner, spender)
    }

    pub fn holders(&self) -> impl Iterator<Item = (&Address, &u128)> {
        self.shares.holders()
    }

    pub fn transfer(&mut self, from: &Address, to: &Address, amount: u128) -> Result<(), LedgerError> {
        Ok(self.shares.transfer(from, to, amount)?)
    }

    pub fn approve(&mut self, owner: &Address, spender: &Address, amount: u128) {
        self.shares.approve(owner, spender, amount);
    }

    pub fn transfer_from(
        &mut self,
        spender: &Address,
        from: &Address,
        to: &Address,
        amount: u128,
    ) -> Result<(), LedgerError> {
        Ok(self.shares.transfer_from(spender, from, to, amount)?)
    }

    // ── Withdrawal ─────────────────────────────────────────────────────

    /// Pay `holder` their share of the collateral held by this contract and
    /// burn their shares. Anyone may trigger it; a holder without shares
    /// gets 0.
    pub fn withdraw(
        &mut self,
        ledger: &LedgerCore,
        tokens: &mut dyn TokenLedger,
        holder: Address,
        caller: Address,
    ) -> Result<u128, LedgerError> {
        let mut paid = self.withdraw_multiple(ledger, tokens, &[holder], caller)?;
        Ok(paid.pop().unwrap_or(0))
    }

    /// Withdraw for each holder in turn. Repeated holders get 0 after their
    /// first entry. Returns the payout per entry.
    pub fn withdraw_multiple(
        &mut self,
        ledger: &LedgerCore,
        tokens: &mut dyn TokenLedger,
        holders: &[Address],
        caller: Address,
    ) -> Result<Vec<u128>, LedgerError> {
        self.sync_closed(ledger);
        if self.state != TokenizedPositionState::Closed {
            return Err(LedgerError::NotClosed);
        }
        let held = self.held_token.clone().ok_or(LedgerError::Uninitialized)?;

        // price every entry before paying anyone
        let mut distributor =
            WithdrawalDistributor::new(tokens.balance_of(&held, &self.address), self.total_supply());
        let mut unredeemed: BTreeMap<Address, u128> = BTreeMap::new();
        let mut entries = Vec::with_capacity(holders.len());
        for holder in holders {
            let shares = unredeemed
                .entry(*holder)
                .or_insert_with(|| self.shares.balance_of(holder));
            let redeemed = std::mem::take(shares);
            entries.push((*holder, redeemed, distributor.redeem(redeemed)?));
        }

        for &(holder, shares, payout) in &entries {
            if shares == 0 {
                continue;
            }
            if payout > 0 {
                tokens.transfer(&held, &self.address, &holder, payout)?;
            }
            self.shares.burn(&holder, shares)?;
            info!(%holder, %caller, shares, payout, "withdrawal paid");
        }
        Ok(entries.into_iter().map(|(_, _, payout)| payout).collect())
    }

    fn sync_closed(&mut self, ledger: &LedgerCore) {
        if self.state == TokenizedPositionState::Open && ledger.is_closed(&self.position_id) {
            self.state = TokenizedPositionState::Closed;
        }
    }

    // ── Internals ──────────────────────────────────────────────────────

    fn ensure_open(&self, position: &Position) -> Result<(), LedgerError> {
        match self.state {
            TokenizedPositionState::Uninitialized => return Err(LedgerError::Uninitialized),
            TokenizedPositionState::Closed => return Err(LedgerError::PositionClosed),
            TokenizedPositionState::Open => {}
        }
        if position.id != self.position_id {
            return Err(LedgerError::WrongPosition);
        }
        Ok(())
    }

    fn is_trusted_close(&self, payout_recipient: &Address) -> bool {
        self.trusted.contains(payout_recipient)
    }
}

/// Principal a holder of `shares` may close and the shares it costs.
///
/// Shares are priced against the position's collateral. A request worth more
/// shares than the holder owns is cut down to what those shares cover.
pub fn close_amounts(
    shares: u128,
    principal: u128,
    balance: u128,
    requested: u128,
) -> Result<(u128, u128), LedgerError> {
    let requested = requested.min(principal);
    let wanted = partial_amount(requested, principal, balance)?;
    if wanted <= shares {
        return Ok((requested, wanted));
    }
    let allowed = partial_amount(shares, balance, principal)?;
    let burned = partial_amount(allowed, principal, balance)?;
    Ok((allowed, burned))
}

impl PositionOwner for TokenizedPosition {
    fn receive_position_ownership(&mut self, grant: &OwnershipGrant) -> Result<u128, LedgerError> {
        if self.state != TokenizedPositionState::Uninitialized {
            return Err(LedgerError::AlreadyInitialized);
        }
        let position = grant.position();
        if position.id != self.position_id {
            return Err(LedgerError::WrongPosition);
        }

        let supply = position.balance;
        self.shares.mint(&self.initial_holder, supply)?;
        self.state = TokenizedPositionState::Open;
        self.held_token = Some(position.held_token.clone());
        info!(
            contract = %self.address,
            position = %self.position_id,
            from = %grant.from(),
            supply,
            "position tokenized"
        );
        Ok(supply)
    }

    fn close_on_behalf_of(
        &self,
        closer: &Address,
        payout_recipient: &Address,
        position: &Position,
        requested: u128,
    ) -> Result<CloseAllowance, LedgerError> {
        self.ensure_open(position)?;
        if self.is_trusted_close(payout_recipient) {
            return Ok(CloseAllowance {
                amount: requested,
                claims: 0,
            });
        }

        let shares = self.balance_of(closer);
        if shares == 0 {
            warn!(contract = %self.address, %closer, "close by non-holder refused");
            return Err(LedgerError::NotAuthorized);
        }
        let (amount, claims) = close_amounts(shares, position.principal, position.balance, requested)?;
        Ok(CloseAllowance { amount, claims })
    }

    fn check_close(&self, receipt: &CloseReceipt) -> Result<(), LedgerError> {
        if self.is_trusted_close(&receipt.payout_recipient()) {
            return Ok(());
        }
        Ok(self.shares.ensure_balance(&receipt.closer(), receipt.claims())?)
    }

    fn settle_close(&mut self, receipt: &CloseReceipt) -> Result<(), LedgerError> {
        let closer = receipt.closer();
        let recipient = receipt.payout_recipient();
        if self.is_trusted_close(&recipient) {
            // a venue paying itself leaves increases open
            if recipient != closer {
                self.closed_using_trusted_recipient = true;
            }
            info!(
                contract = %self.address,
                recipient = %receipt.payout_recipient(),
                closed = receipt.closed_amount(),
                "closed by trusted recipient"
            );
            return Ok(());
        }
        self.shares.burn(&closer, receipt.claims())?;
        Ok(())
    }

    fn increase_position_on_behalf_of(
        &self,
        _trader: &Address,
        position: &Position,
        added_principal: u128,
        _added_collateral: u128,
    ) -> Result<IncreaseAllowance, LedgerError> {
        self.ensure_open(position)?;
        if position.is_called() || self.closed_using_trusted_recipient {
            return Err(LedgerError::PositionMarginCalled);
        }
        let claims =
            partial_amount_rounded_up(added_principal, position.principal, self.total_supply())?;
        Ok(IncreaseAllowance { claims })
    }

    fn settle_increase(&mut self, receipt: &IncreaseReceipt) -> Result<(), LedgerError> {
        self.shares.mint(&receipt.trader(), receipt.claims())?;
        Ok(())
    }

    fn position_deed_holder(&self, position_id: &PositionId) -> Result<Address, LedgerError> {
        if *position_id != self.position_id {
            return Err(LedgerError::UnknownPosition);
        }
        Ok(self.address)
    }

    fn position_closed(&mut self, position: &Position) {
        if position.id == self.position_id && self.state == TokenizedPositionState::Open {
            self.state = TokenizedPositionState::Closed;
            info!(contract = %self.address, position = %self.position_id, "tokenized position closed");
        }
    }
}
