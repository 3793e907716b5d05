//! Loan offerings: signed, immutable terms under which a lender funds positions.
//!
//! The loan hash is derived on demand from every field except the signature,
//! so it can never drift from the terms it describes.

use super::ids::{Address, AssetId, LoanHash};
use crate::external::signature::{Signature, SignatureOracle, SigningKey};
use serde::{Deserialize, Serialize};

/// Numeric terms of a loan offering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanRates {
    /// Maximum principal fundable from this offering, across all positions.
    pub max_amount: u128,
    /// Minimum principal per funding event.
    pub min_amount: u128,
    /// Minimum collateral when funding `max_amount`; scaled linearly.
    pub min_held_token: u128,
    /// Fee paid by the payer when funding `max_amount`; scaled linearly.
    pub lender_fee: u128,
    /// Fee paid by the trader when funding `max_amount`; scaled linearly.
    pub taker_fee: u128,
    /// Annual nominal rate in units of 1e-8 (3_650_000 == 3.65%).
    pub interest_rate: u32,
    /// Interest accrues in whole periods of this many seconds (0 = per second).
    pub interest_period: u64,
}

/// A lender's standing offer to fund positions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanOffering {
    pub owed_token: AssetId,
    pub held_token: AssetId,
    /// Account the principal is drawn from; must sign the loan hash.
    pub payer: Address,
    /// Lender of record. Zero means the payer.
    pub owner: Address,
    /// Only this account may take the offering. Zero means anyone.
    pub taker: Address,
    /// Receives lender and taker fees. Zero disables fees.
    pub fee_recipient: Address,
    pub lender_fee_token: AssetId,
    pub taker_fee_token: AssetId,
    pub rates: LoanRates,
    pub expiration_timestamp: u64,
    pub call_time_limit: u64,
    pub max_duration: u64,
    pub salt: u64,
    pub signature: Option<Signature>,
}

impl LoanOffering {
    /// Deterministic digest of every term (the signature is excluded).
    ///
    /// Two-level like the on-wire format: the numeric terms are hashed first,
    /// then the parties and assets are hashed together with that digest.
    pub fn loan_hash(&self) -> LoanHash {
        let mut values = blake3::Hasher::new();
        values.update(&self.rates.max_amount.to_le_bytes());
        values.update(&self.rates.min_amount.to_le_bytes());
        values.update(&self.rates.min_held_token.to_le_bytes());
        values.update(&self.rates.lender_fee.to_le_bytes());
        values.update(&self.rates.taker_fee.to_le_bytes());
        values.update(&self.expiration_timestamp.to_le_bytes());
        values.update(&self.salt.to_le_bytes());
        values.update(&self.call_time_limit.to_le_bytes());
        values.update(&self.max_duration.to_le_bytes());
        values.update(&self.rates.interest_rate.to_le_bytes());
        values.update(&self.rates.interest_period.to_le_bytes());
        let values_hash = values.finalize();

        let mut hasher = blake3::Hasher::new();
        hasher.update(b"marginledger/loan-offering");
        for asset in [
            &self.owed_token,
            &self.held_token,
            &self.lender_fee_token,
            &self.taker_fee_token,
        ] {
            hasher.update(&(asset.0.len() as u64).to_le_bytes());
            hasher.update(asset.0.as_bytes());
        }
        for party in [&self.payer, &self.owner, &self.taker, &self.fee_recipient] {
            hasher.update(party.as_bytes());
        }
        hasher.update(values_hash.as_bytes());
        LoanHash::from_hash(hasher.finalize())
    }

    /// Sign the current terms with `key`, replacing any previous signature.
    pub fn signed_with(mut self, oracle: &dyn SignatureOracle, key: &SigningKey) -> Self {
        let hash = self.loan_hash();
        self.signature = Some(oracle.sign(&hash, key));
        self
    }

    /// The account that receives repayments and may margin-call.
    pub fn lender_of_record(&self) -> Address {
        if self.owner.is_zero() {
            self.payer
        } else {
            self.owner
        }
    }

    /// A fresh random salt, for callers that do not track nonces themselves.
    pub fn random_salt() -> u64 {
        rand::random()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> LoanOffering {
        LoanOffering {
            owed_token: AssetId::new("OWED"),
            held_token: AssetId::new("HELD"),
            payer: Address::from_label("payer"),
            owner: Address::ZERO,
            taker: Address::ZERO,
            fee_recipient: Address::from_label("fees"),
            lender_fee_token: AssetId::new("FEE"),
            taker_fee_token: AssetId::new("FEE"),
            rates: LoanRates {
                max_amount: 10_000,
                min_amount: 100,
                min_held_token: 5_000,
                lender_fee: 10,
                taker_fee: 20,
                interest_rate: 3_650_000,
                interest_period: 86_400,
            },
            expiration_timestamp: 2_000_000_000,
            call_time_limit: 10_000,
            max_duration: 365 * 86_400,
            salt: 42,
            signature: None,
        }
    }

    #[test]
    fn loan_hash_is_deterministic() {
        assert_eq!(sample().loan_hash(), sample().loan_hash());
    }

    #[test]
    fn loan_hash_changes_with_terms() {
        let base = sample().loan_hash();

        let mut salted = sample();
        salted.salt += 1;
        assert_ne!(base, salted.loan_hash());

        let mut richer = sample();
        richer.rates.max_amount += 1;
        assert_ne!(base, richer.loan_hash());

        let mut other_asset = sample();
        other_asset.held_token = AssetId::new("HELD2");
        assert_ne!(base, other_asset.loan_hash());

        let mut taker = sample();
        taker.taker = Address::from_label("someone");
        assert_ne!(base, taker.loan_hash());
    }

    #[test]
    fn asset_boundaries_are_unambiguous() {
        let mut a = sample();
        a.owed_token = AssetId::new("AB");
        a.held_token = AssetId::new("C");
        let mut b = sample();
        b.owed_token = AssetId::new("A");
        b.held_token = AssetId::new("BC");
        assert_ne!(a.loan_hash(), b.loan_hash());
    }

    #[test]
    fn signature_is_not_part_of_the_hash() {
        let unsigned = sample();
        let mut signed = sample();
        signed.signature = Some(Signature {
            signer: Address::from_label("payer"),
            tag: [1u8; 32],
        });
        assert_eq!(unsigned.loan_hash(), signed.loan_hash());
    }

    #[test]
    fn lender_of_record_defaults_to_payer() {
        let mut offering = sample();
        assert_eq!(offering.lender_of_record(), offering.payer);
        offering.owner = Address::from_label("owner");
        assert_eq!(offering.lender_of_record(), Address::from_label("owner"));
    }
}
