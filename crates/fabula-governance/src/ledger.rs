//! Token balance source.

use std::collections::HashMap;
use fabula_types::{AccountId, TokenAmount};
use parking_lot::RwLock;
use crate::error::GovernanceError;

/// Supplies the token balance a voter holds.
pub trait BalanceLedger: Send + Sync {
    fn balance_of(&self, voter: &AccountId) -> Result<TokenAmount, GovernanceError>;
}

impl<T: BalanceLedger + ?Sized> BalanceLedger for std::sync::Arc<T> {
    fn balance_of(&self, voter: &AccountId) -> Result<TokenAmount, GovernanceError> {
        (**self).balance_of(voter)
    }
}

/// In-memory ledger. Unknown accounts hold nothing.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    balances: RwLock<HashMap<AccountId, TokenAmount>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(account, balance)` pairs.
    pub fn with_balances<I>(balances: I) -> Self
    where
        I: IntoIterator<Item = (AccountId, TokenAmount)>,
    {
        Self {
            balances: RwLock::new(balances.into_iter().collect()),
        }
    }

    pub fn set_balance(&self, account: AccountId, balance: TokenAmount) {
        self.balances.write().insert(account, balance);
    }
}

impl BalanceLedger for MemoryLedger {
    fn balance_of(&self, voter: &AccountId) -> Result<TokenAmount, GovernanceError> {
        Ok(self.balances.read().get(voter).copied().unwrap_or(0))
    }
}
