//! Display metadata for share tokens.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenMetadata {
    /// Prefix of every share token's name; the position id follows it.
    pub name_prefix: String,
    pub symbol: String,
}

impl Default for TokenMetadata {
    fn default() -> Self {
        Self {
            name_prefix: "Leveraged Long Token".into(),
            symbol: "LL".into(),
        }
    }
}
