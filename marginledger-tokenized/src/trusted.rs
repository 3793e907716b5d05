//! Recipients allowed to close on any holder's behalf.

use marginledger_core::domain::Address;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Immutable allowlist of payout recipients, fixed at construction.
///
/// The zero address is dropped if supplied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustedRecipientSet(BTreeSet<Address>);

impl TrustedRecipientSet {
    pub fn new(recipients: impl IntoIterator<Item = Address>) -> Self {
        Self(recipients.into_iter().filter(|a| !a.is_zero()).collect())
    }

    pub fn contains(&self, recipient: &Address) -> bool {
        self.0.contains(recipient)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Address> {
        self.0.iter()
    }
}

impl FromIterator<Address> for TrustedRecipientSet {
    fn from_iter<I: IntoIterator<Item = Address>>(iter: I) -> Self {
        Self::new(iter)
    }
}
