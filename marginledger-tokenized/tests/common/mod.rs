//! Shared harness: a funded market with one ledger and a registry of
//! tokenized positions acting as its owner directory.

#![allow(dead_code)]

use marginledger_core::domain::{Address, AssetId, LoanOffering, LoanRates, PositionId};
use marginledger_core::external::{
    InMemoryTokenLedger, KeyedHashOracle, ManualClock, SigningKey, TokenLedger,
};
use marginledger_core::{Env, LedgerCore, LedgerError};
use marginledger_tokenized::{TokenizedPosition, TokenizedRegistry};

pub const T0: u64 = 1_600_000_000;
pub const CALL_TIME_LIMIT: u64 = 3_600;

pub struct World {
    pub ledger: LedgerCore,
    pub tokens: InMemoryTokenLedger,
    pub oracle: KeyedHashOracle,
    pub registry: TokenizedRegistry,
    pub clock: ManualClock,
    pub payer: SigningKey,
    pub trader: Address,
    pub owed: AssetId,
    pub held: AssetId,
    salt: u64,
}

impl World {
    pub fn new() -> Self {
        let ledger = LedgerCore::default();
        let mut tokens = InMemoryTokenLedger::new();
        let owed = AssetId::new("DAI");
        let held = AssetId::new("WETH");
        tokens.register_asset(owed.clone(), 18);
        tokens.register_asset(held.clone(), 9);
        let mut oracle = KeyedHashOracle::new();
        let payer = oracle.key_from_seed("lender");
        let trader = Address::from_label("trader");

        let mut world = Self {
            ledger,
            tokens,
            oracle,
            registry: TokenizedRegistry::new(),
            clock: ManualClock::new(T0),
            payer,
            trader,
            owed,
            held,
            salt: 0,
        };
        let payer = world.payer.address();
        world.fund(payer, 1_000_000_000);
        world.fund(trader, 1_000_000_000);
        world
    }

    /// Give `account` both assets and approve the vault for them.
    pub fn fund(&mut self, account: Address, amount: u128) {
        let vault = self.ledger.vault();
        for asset in [self.owed.clone(), self.held.clone()] {
            self.tokens.issue(&asset, &account, amount).unwrap();
            self.tokens.approve(&asset, &account, &vault, u128::MAX);
        }
    }

    pub fn offering(&mut self) -> LoanOffering {
        self.salt += 1;
        LoanOffering {
            owed_token: self.owed.clone(),
            held_token: self.held.clone(),
            payer: self.payer.address(),
            owner: Address::ZERO,
            taker: Address::ZERO,
            fee_recipient: Address::ZERO,
            lender_fee_token: self.owed.clone(),
            taker_fee_token: self.owed.clone(),
            rates: LoanRates {
                max_amount: 1_000_000,
                min_amount: 1,
                min_held_token: 0,
                lender_fee: 0,
                taker_fee: 0,
                interest_rate: 0,
                interest_period: 0,
            },
            expiration_timestamp: T0 + 86_400,
            call_time_limit: CALL_TIME_LIMIT,
            max_duration: 365 * 86_400,
            salt: self.salt,
            signature: None,
        }
        .signed_with(&self.oracle, &self.payer)
    }

    pub fn run<T>(
        &mut self,
        op: impl FnOnce(&mut LedgerCore, &mut Env<'_>) -> Result<T, LedgerError>,
    ) -> Result<T, LedgerError> {
        let mut env = Env::new(&mut self.tokens, &self.oracle, &mut self.registry, &self.clock);
        op(&mut self.ledger, &mut env)
    }

    pub fn open(&mut self, principal: u128, collateral: u128) -> PositionId {
        let offering = self.offering();
        let trader = self.trader;
        self.run(|ledger, env| ledger.open(env, &offering, principal, collateral, trader))
            .unwrap()
    }

    /// Open a position and tokenize it with `holder` as initial holder.
    pub fn tokenize(
        &mut self,
        principal: u128,
        collateral: u128,
        holder: Address,
        trusted: &[Address],
    ) -> (PositionId, Address) {
        let id = self.open(principal, collateral);
        let contract = self.registry.create(id, holder, trusted.iter().copied());
        let trader = self.trader;
        self.run(|ledger, env| ledger.transfer_position(env, &id, trader, contract))
            .unwrap();
        (id, contract)
    }

    pub fn token(&self, contract: &Address) -> &TokenizedPosition {
        self.registry.get(contract).unwrap()
    }

    pub fn token_mut(&mut self, contract: &Address) -> &mut TokenizedPosition {
        self.registry.get_mut(contract).unwrap()
    }

    pub fn close(
        &mut self,
        id: &PositionId,
        closer: Address,
        amount: u128,
        recipient: Address,
    ) -> Result<marginledger_core::CloseOutcome, LedgerError> {
        self.run(|ledger, env| ledger.close(env, id, closer, amount, recipient))
    }

    pub fn call_and_recover(&mut self, id: &PositionId) -> u128 {
        let lender = self.payer.address();
        self.run(|ledger, env| ledger.margin_call(env, id, lender, 0))
            .unwrap();
        self.clock.advance(CALL_TIME_LIMIT);
        self.run(|ledger, env| ledger.force_recover_collateral(env, id, lender))
            .unwrap()
    }

    pub fn withdraw(&mut self, contract: &Address, holder: Address) -> Result<u128, LedgerError> {
        let token = self.registry.get_mut(contract).unwrap();
        token.withdraw(&self.ledger, &mut self.tokens, holder, holder)
    }

    pub fn held_balance(&self, account: &Address) -> u128 {
        self.tokens.balance_of(&self.held, account)
    }
}
