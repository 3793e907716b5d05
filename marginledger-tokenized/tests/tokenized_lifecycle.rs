//! Integration tests for tokenized positions.
//!
//! Tests:
//! 1. Tokenization: supply equals collateral, one-time initialization
//! 2. Holder closes: bounded by principal and by the holder's shares
//! 3. Trusted recipients: any caller, no burn, permanent flag
//! 4. Increases: proportional minting, blocked by calls and trusted closes
//! 5. Withdrawals: pro-rata payout after close, idempotent, batched
//! 6. Metadata and deed holder

mod common;

use common::World;
use marginledger_core::domain::Address;
use marginledger_core::LedgerError;
use marginledger_tokenized::TokenizedPositionState;

fn holder() -> Address {
    Address::from_label("holder")
}

fn venue() -> Address {
    Address::from_label("venue")
}

// ── 1. Tokenization ──────────────────────────────────────────────────

#[test]
fn tokenizing_mints_collateral_to_the_initial_holder() {
    let mut world = World::new();
    let (id, contract) = world.tokenize(1_000, 1_100, holder(), &[venue()]);

    let token = world.token(&contract);
    assert_eq!(token.state(), TokenizedPositionState::Open);
    assert_eq!(token.total_supply(), 1_100);
    assert_eq!(token.balance_of(&holder()), 1_100);
    assert_eq!(token.held_token(), Some(&world.held));
    assert_eq!(world.ledger.position(&id).unwrap().owner, contract);
}

#[test]
fn a_tokenized_position_accepts_only_one_position() {
    let mut world = World::new();
    let (_, contract) = world.tokenize(1_000, 1_100, holder(), &[]);
    let second = world.open(2_000, 2_000);
    let trader = world.trader;

    let err = world
        .run(|ledger, env| ledger.transfer_position(env, &second, trader, contract))
        .unwrap_err();
    assert_eq!(err, LedgerError::AlreadyInitialized);
    assert_eq!(world.ledger.position(&second).unwrap().owner, trader);
    assert_eq!(world.token(&contract).total_supply(), 1_100);
}

#[test]
fn a_tokenized_position_rejects_the_wrong_position() {
    let mut world = World::new();
    let intended = world.open(1_000, 1_100);
    let other = world.open(1_000, 1_100);
    let contract = world.registry.create(intended, holder(), []);
    let trader = world.trader;

    let err = world
        .run(|ledger, env| ledger.transfer_position(env, &other, trader, contract))
        .unwrap_err();
    assert_eq!(err, LedgerError::WrongPosition);
    assert_eq!(
        world.token(&contract).state(),
        TokenizedPositionState::Uninitialized
    );
    assert_eq!(world.ledger.position(&other).unwrap().owner, trader);
}

// ── 2. Holder closes ─────────────────────────────────────────────────

#[test]
fn close_is_bounded_by_the_closers_shares() {
    let mut world = World::new();
    let keeper = Address::from_label("keeper");
    world.fund(holder(), 1_000_000);
    let (id, contract) = world.tokenize(1_000, 1_100, holder(), &[]);
    world
        .token_mut(&contract)
        .transfer(&holder(), &keeper, 550)
        .unwrap();

    let outcome = world.close(&id, holder(), 500, holder()).unwrap();
    assert_eq!(outcome.closed_amount, 500);
    assert_eq!(outcome.held_token_payout, 550);

    let token = world.token(&contract);
    assert_eq!(token.balance_of(&holder()), 0);
    assert_eq!(token.balance_of(&keeper), 550);
    assert_eq!(token.total_supply(), 550);
}

#[test]
fn over_close_is_capped_at_principal() {
    let mut world = World::new();
    world.fund(holder(), 1_000_000);
    let (id, contract) = world.tokenize(1_000, 1_100, holder(), &[]);

    let outcome = world.close(&id, holder(), 1_001, holder()).unwrap();
    assert_eq!(outcome.closed_amount, 1_000);
    assert_eq!(world.token(&contract).total_supply(), 0);
    assert_eq!(
        world.token(&contract).state(),
        TokenizedPositionState::Closed
    );
}

#[test]
fn close_pays_out_at_most_the_shares_owned() {
    let mut world = World::new();
    world.fund(holder(), 1_000_000);
    let (id, contract) = world.tokenize(1_000, 1_100, holder(), &[]);
    let given = 1_100 / 2;
    world
        .token_mut(&contract)
        .transfer(&holder(), &Address::from_label("rando"), given)
        .unwrap();

    let outcome = world.close(&id, holder(), 1_000, holder()).unwrap();
    assert_eq!(outcome.held_token_payout, 1_100 - given);
}

#[test]
fn non_holder_without_trusted_recipient_is_refused() {
    let mut world = World::new();
    let rando = Address::from_label("rando");
    world.fund(rando, 1_000_000);
    let (id, contract) = world.tokenize(1_000, 1_100, holder(), &[venue()]);

    let err = world.close(&id, rando, 1_000, rando).unwrap_err();
    assert_eq!(err, LedgerError::NotAuthorized);
    assert_eq!(world.token(&contract).balance_of(&holder()), 1_100);
    assert_eq!(world.ledger.position(&id).unwrap().principal, 1_000);
}

#[test]
fn zero_close_is_rejected() {
    let mut world = World::new();
    let (id, _) = world.tokenize(1_000, 1_100, holder(), &[]);
    assert_eq!(
        world.close(&id, holder(), 0, holder()).unwrap_err(),
        LedgerError::ZeroAmount
    );
}

// ── 3. Trusted recipients ────────────────────────────────────────────

#[test]
fn anyone_may_close_to_a_trusted_recipient() {
    let mut world = World::new();
    let rando = Address::from_label("rando");
    world.fund(rando, 1_000_000);
    let (id, contract) = world.tokenize(1_000, 1_100, holder(), &[venue()]);
    assert!(!world.token(&contract).closed_using_trusted_recipient());

    let outcome = world.close(&id, rando, 1_000, venue()).unwrap();
    assert_eq!(outcome.closed_amount, 1_000);
    assert_eq!(world.held_balance(&venue()), 1_100);

    let token = world.token(&contract);
    assert!(token.closed_using_trusted_recipient());
    assert_eq!(token.total_supply(), 1_100);
    assert_eq!(token.state(), TokenizedPositionState::Closed);
}

#[test]
fn trusted_flag_survives_repeated_partial_closes() {
    let mut world = World::new();
    let rando = Address::from_label("rando");
    world.fund(rando, 1_000_000);
    let (id, contract) = world.tokenize(1_000, 1_100, holder(), &[venue()]);

    world.close(&id, rando, 500, venue()).unwrap();
    assert!(world.token(&contract).closed_using_trusted_recipient());
    world.close(&id, rando, 500, venue()).unwrap();
    assert!(world.token(&contract).closed_using_trusted_recipient());
    assert!(world.ledger.is_closed(&id));
}

#[test]
fn holder_may_still_close_after_a_trusted_close() {
    let mut world = World::new();
    let rando = Address::from_label("rando");
    world.fund(rando, 1_000_000);
    world.fund(holder(), 1_000_000);
    let (id, contract) = world.tokenize(1_000, 1_100, holder(), &[venue()]);

    world.close(&id, rando, 500, venue()).unwrap();
    let balance = world.token(&contract).balance_of(&holder());
    world
        .token_mut(&contract)
        .transfer(&holder(), &Address::from_label("one"), balance * 3 / 4)
        .unwrap();

    let outcome = world.close(&id, holder(), 1_000, holder()).unwrap();
    assert!(outcome.closed_amount <= 500);
    assert!(outcome.held_token_payout <= balance - balance * 3 / 4);
}

#[test]
fn a_trusted_venue_may_close_to_itself_without_shares() {
    let mut world = World::new();
    world.fund(venue(), 1_000_000);
    let venue_held = world.held_balance(&venue());
    let (id, contract) = world.tokenize(1_000, 1_100, holder(), &[venue()]);

    let outcome = world.close(&id, venue(), 500, venue()).unwrap();
    assert_eq!(outcome.closed_amount, 500);
    assert_eq!(world.held_balance(&venue()) - venue_held, 550);

    let token = world.token(&contract);
    assert_eq!(token.total_supply(), 1_100);
    assert!(!token.closed_using_trusted_recipient());

    // the flag stays clear, so the trader may still increase
    let offering = world.offering();
    let trader = world.trader;
    world
        .run(|ledger, env| ledger.increase(env, &id, &offering, 100, trader))
        .unwrap();
}

// ── 4. Increases ─────────────────────────────────────────────────────

#[test]
fn increase_mints_shares_to_the_trader() {
    let mut world = World::new();
    let (id, contract) = world.tokenize(1_000, 1_100, holder(), &[]);
    let offering = world.offering();
    let trader = world.trader;

    let added = world
        .run(|ledger, env| ledger.increase(env, &id, &offering, 500, trader))
        .unwrap();
    assert_eq!(added, 550);

    let token = world.token(&contract);
    assert_eq!(token.balance_of(&trader), 550);
    assert_eq!(token.balance_of(&holder()), 1_100);
    assert_eq!(token.total_supply(), 1_650);
}

#[test]
fn increase_rounds_minted_shares_up() {
    let mut world = World::new();
    let (id, contract) = world.tokenize(3, 10, holder(), &[]);
    let offering = world.offering();
    let trader = world.trader;
    world
        .run(|ledger, env| ledger.increase(env, &id, &offering, 1, trader))
        .unwrap();
    // ceil(1 * 10 / 3) = 4
    assert_eq!(world.token(&contract).balance_of(&trader), 4);
}

#[test]
fn increase_enforces_the_offerings_minimum_collateral() {
    let mut world = World::new();
    let (id, contract) = world.tokenize(1_000, 1_100, holder(), &[]);
    let mut offering = world.offering();
    // 2 held per principal: 500 more principal needs 1000, the ratio gives 550
    offering.rates.min_held_token = 2_000_000;
    let offering = offering.signed_with(&world.oracle, &world.payer);
    let trader = world.trader;

    let err = world
        .run(|ledger, env| ledger.increase(env, &id, &offering, 500, trader))
        .unwrap_err();
    assert_eq!(
        err,
        LedgerError::InsufficientCollateral {
            provided: 550,
            required: 1_000
        }
    );
    assert_eq!(world.token(&contract).total_supply(), 1_100);
    assert_eq!(world.token(&contract).balance_of(&trader), 0);
    assert_eq!(world.ledger.position(&id).unwrap().principal, 1_000);
}

#[test]
fn increase_fails_while_margin_called() {
    let mut world = World::new();
    let (id, contract) = world.tokenize(1_000, 1_100, holder(), &[]);
    let lender = world.payer.address();
    let trader = world.trader;
    world
        .run(|ledger, env| ledger.margin_call(env, &id, lender, 0))
        .unwrap();

    let offering = world.offering();
    let err = world
        .run(|ledger, env| ledger.increase(env, &id, &offering, 500, trader))
        .unwrap_err();
    assert_eq!(err, LedgerError::PositionMarginCalled);
    assert_eq!(world.token(&contract).total_supply(), 1_100);
}

#[test]
fn increase_stays_blocked_after_a_trusted_close() {
    let mut world = World::new();
    let rando = Address::from_label("rando");
    world.fund(rando, 1_000_000);
    let (id, _) = world.tokenize(1_000, 1_100, holder(), &[venue()]);
    let lender = world.payer.address();
    let trader = world.trader;

    world.close(&id, rando, 500, venue()).unwrap();
    world
        .run(|ledger, env| ledger.margin_call(env, &id, lender, 0))
        .unwrap();
    world
        .run(|ledger, env| ledger.cancel_margin_call(env, &id, lender))
        .unwrap();

    let offering = world.offering();
    let err = world
        .run(|ledger, env| ledger.increase(env, &id, &offering, 100, trader))
        .unwrap_err();
    assert_eq!(err, LedgerError::PositionMarginCalled);
}

// ── 5. Withdrawals ───────────────────────────────────────────────────

#[test]
fn force_recovery_closes_and_fixes_the_pool() {
    let mut world = World::new();
    let (id, contract) = world.tokenize(1_000, 1_100, holder(), &[]);

    let recovered = world.call_and_recover(&id);
    assert_eq!(recovered, 1_100);
    assert_eq!(
        world.token(&contract).state(),
        TokenizedPositionState::Closed
    );
    assert_eq!(world.held_balance(&contract), 1_100);

    let offering = world.offering();
    let trader = world.trader;
    let err = world
        .run(|ledger, env| ledger.increase(env, &id, &offering, 100, trader))
        .unwrap_err();
    assert_eq!(err, LedgerError::PositionMarginCalled);

    assert_eq!(world.withdraw(&contract, holder()), Ok(1_100));
    assert_eq!(world.held_balance(&holder()), 1_100);
}

#[test]
fn withdraw_fails_while_open() {
    let mut world = World::new();
    world.fund(holder(), 1_000_000);
    let (id, contract) = world.tokenize(1_000, 1_100, holder(), &[]);
    world.close(&id, holder(), 500, holder()).unwrap();

    assert_eq!(world.withdraw(&contract, holder()), Err(LedgerError::NotClosed));
    assert_eq!(world.token(&contract).balance_of(&holder()), 550);
}

#[test]
fn withdraw_is_idempotent() {
    let mut world = World::new();
    let (id, contract) = world.tokenize(1_000, 1_100, holder(), &[]);
    world.call_and_recover(&id);

    assert_eq!(world.withdraw(&contract, holder()), Ok(1_100));
    assert_eq!(world.withdraw(&contract, holder()), Ok(0));
    assert_eq!(world.withdraw(&contract, Address::from_label("never")), Ok(0));
    assert_eq!(world.held_balance(&holder()), 1_100);
}

#[test]
fn withdraw_after_full_holder_close_pays_nothing() {
    let mut world = World::new();
    world.fund(holder(), 1_000_000);
    let (id, contract) = world.tokenize(1_000, 1_100, holder(), &[]);
    world.close(&id, holder(), 1_000, holder()).unwrap();
    let lender = world.payer.address();

    let err = world
        .run(|ledger, env| ledger.force_recover_collateral(env, &id, lender))
        .unwrap_err();
    assert_eq!(err, LedgerError::AlreadyClosed);
    assert_eq!(world.withdraw(&contract, holder()), Ok(0));
}

#[test]
fn withdraw_multiple_pays_each_holder_once() {
    let mut world = World::new();
    let trader = world.trader;
    let half_holder = Address::from_label("half holder");
    let no_holder = Address::from_label("no holder");
    let rando = Address::from_label("rando");
    let (id, contract) = world.tokenize(1_000, 1_100, trader, &[]);
    world.call_and_recover(&id);
    world
        .token_mut(&contract)
        .transfer(&trader, &half_holder, 550)
        .unwrap();

    let trader_before = world.held_balance(&trader);
    let token = world.registry.get_mut(&contract).unwrap();
    let paid = token
        .withdraw_multiple(
            &world.ledger,
            &mut world.tokens,
            &[trader, no_holder, trader, half_holder],
            rando,
        )
        .unwrap();

    assert_eq!(paid, vec![550, 0, 0, 550]);
    assert_eq!(world.held_balance(&trader) - trader_before, 550);
    assert_eq!(world.held_balance(&half_holder), 550);
    assert_eq!(world.held_balance(&no_holder), 0);
    assert_eq!(world.token(&contract).total_supply(), 0);
}

#[test]
fn withdraw_multiple_fails_while_open() {
    let mut world = World::new();
    let trader = world.trader;
    let (_, contract) = world.tokenize(1_000, 1_100, trader, &[]);
    let token = world.registry.get_mut(&contract).unwrap();
    let err = token
        .withdraw_multiple(&world.ledger, &mut world.tokens, &[trader], trader)
        .unwrap_err();
    assert_eq!(err, LedgerError::NotClosed);
}

#[test]
fn matured_positions_can_be_recovered_without_a_call() {
    let mut world = World::new();
    let (id, contract) = world.tokenize(1_000, 1_100, holder(), &[]);
    let lender = world.payer.address();
    world.clock.advance(365 * 86_400);
    world
        .run(|ledger, env| ledger.force_recover_collateral(env, &id, lender))
        .unwrap();
    assert_eq!(world.withdraw(&contract, holder()), Ok(1_100));
}

// ── 6. Metadata and deed holder ──────────────────────────────────────

#[test]
fn metadata_follows_the_held_asset() {
    let mut world = World::new();
    let (id, contract) = world.tokenize(1_000, 1_100, holder(), &[]);
    let token = world.token(&contract);
    assert_eq!(token.decimals(&world.tokens), Ok(9));
    assert_eq!(token.name(), format!("Leveraged Long Token {id}"));
    assert_eq!(token.symbol(), "LL");
}

#[test]
fn deed_holder_resolves_to_the_contract() {
    let mut world = World::new();
    let (id, contract) = world.tokenize(1_000, 1_100, holder(), &[]);
    assert_eq!(
        world.ledger.position_deed_holder(&world.registry, &id),
        Ok(contract)
    );
}
