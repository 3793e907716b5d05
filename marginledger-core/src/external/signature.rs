//! Signature oracle for loan offerings.
//!
//! The ledger treats signing as opaque: `sign(digest, key)` and
//! `verify(digest, signature) -> signer`. `KeyedHashOracle` is a reference
//! implementation built on BLAKE3 keyed hashing with a registry of known keys;
//! it is deterministic and needs no elliptic-curve machinery.

use crate::domain::{Address, LoanHash};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Proof that `signer` authorized a digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub signer: Address,
    pub tag: [u8; 32],
}

/// Secret signing material bound to an address.
#[derive(Clone)]
pub struct SigningKey {
    address: Address,
    secret: [u8; 32],
}

impl SigningKey {
    pub fn address(&self) -> Address {
        self.address
    }
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKey")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

pub trait SignatureOracle {
    fn sign(&self, digest: &LoanHash, key: &SigningKey) -> Signature;

    /// The signer the signature proves, or `None` if it does not verify.
    fn verify(&self, digest: &LoanHash, signature: &Signature) -> Option<Address>;
}

/// Keyed-hash signatures over a registry of issued keys.
#[derive(Debug, Clone, Default)]
pub struct KeyedHashOracle {
    secrets: HashMap<Address, [u8; 32]>,
}

impl KeyedHashOracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a fresh random key and register it.
    pub fn generate_key(&mut self) -> SigningKey {
        let mut secret = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut secret);
        self.register(secret)
    }

    /// Issue a deterministic key from a seed phrase and register it.
    pub fn key_from_seed(&mut self, seed: &str) -> SigningKey {
        let secret = *blake3::hash(seed.as_bytes()).as_bytes();
        self.register(secret)
    }

    fn register(&mut self, secret: [u8; 32]) -> SigningKey {
        let address = Address::derive(&[b"signer", &secret]);
        self.secrets.insert(address, secret);
        SigningKey { address, secret }
    }
}

impl SignatureOracle for KeyedHashOracle {
    fn sign(&self, digest: &LoanHash, key: &SigningKey) -> Signature {
        Signature {
            signer: key.address,
            tag: *blake3::keyed_hash(&key.secret, digest.as_bytes()).as_bytes(),
        }
    }

    fn verify(&self, digest: &LoanHash, signature: &Signature) -> Option<Address> {
        let secret = self.secrets.get(&signature.signer)?;
        let expected = blake3::keyed_hash(secret, digest.as_bytes());
        // blake3::Hash equality is constant-time
        (expected == blake3::Hash::from(signature.tag)).then_some(signature.signer)
    }
}
