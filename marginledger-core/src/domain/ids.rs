use serde::{Deserialize, Serialize};
use std::fmt;

fn write_hex(f: &mut fmt::Formatter<'_>, bytes: &[u8]) -> fmt::Result {
    write!(f, "0x")?;
    for b in bytes {
        write!(f, "{:02x}", b)?;
    }
    Ok(())
}

/// Account address (20 bytes). Used for lenders, traders, fee recipients,
/// the ledger vault and contract owners alike.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Address(pub [u8; 20]);

impl Address {
    /// The null address. Never a valid owner, lender or trusted recipient.
    pub const ZERO: Address = Address([0u8; 20]);

    /// Deterministic address derived from a human-readable label.
    pub fn from_label(label: &str) -> Self {
        Self::derive(&[b"address", label.as_bytes()])
    }

    /// Deterministic address derived from an ordered list of byte parts.
    /// Uses BLAKE3 so derived addresses are stable across builds/platforms.
    pub fn derive(parts: &[&[u8]]) -> Self {
        let mut hasher = blake3::Hasher::new();
        for part in parts {
            hasher.update(&(part.len() as u64).to_le_bytes());
            hasher.update(part);
        }
        let hash = hasher.finalize();
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&hash.as_bytes()[..20]);
        Self(bytes)
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_hex(f, &self.0)
    }
}

/// Fungible asset identifier (e.g. "WETH", "DAI").
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AssetId(pub String);

impl AssetId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Digest of every field of a loan offering. The thing a payer signs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LoanHash(pub [u8; 32]);

impl LoanHash {
    pub fn from_hash(hash: blake3::Hash) -> Self {
        Self(*hash.as_bytes())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for LoanHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_hex(f, &self.0)
    }
}

/// Position identifier: hash of (loan hash, opener, salt).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PositionId(pub [u8; 32]);

impl PositionId {
    /// Derive the id of a position opened by `trader` from `loan_hash`.
    ///
    /// Collision-resistant: any change to the offering, the opener or the salt
    /// produces a different id.
    pub fn derive(loan_hash: &LoanHash, trader: &Address, salt: u64) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"marginledger/position");
        hasher.update(loan_hash.as_bytes());
        hasher.update(trader.as_bytes());
        hasher.update(&salt.to_le_bytes());
        Self(*hasher.finalize().as_bytes())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for PositionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_hex(f, &self.0)
    }
}
