//! Voting power and quadratic vote cost.
//!
//! A weight of `w` costs `w^2` tokens, so the largest weight a budget can buy
//! is `floor(sqrt(budget))`.

use fabula_types::{amount_from_signed, TokenAmount};
use serde::{Deserialize, Serialize};
use crate::error::GovernanceError;

/// Vote weight, always at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct Weight(u64);

impl Weight {
    pub const ONE: Self = Self(1);

    pub fn new(weight: u64) -> Result<Self, GovernanceError> {
        if weight == 0 {
            return Err(GovernanceError::InvalidInput(
                "Vote weight must be at least 1".to_string()
            ));
        }
        Ok(Self(weight))
    }

    /// Accept a signed wire integer.
    pub fn from_signed(weight: i64) -> Result<Self, GovernanceError> {
        let weight = u64::try_from(weight).map_err(|_| GovernanceError::InvalidInput(
            format!("Vote weight must be positive, got {}", weight)
        ))?;
        Self::new(weight)
    }

    pub fn get(&self) -> u64 {
        self.0
    }

    /// Tokens this weight costs.
    pub fn cost(&self) -> TokenAmount {
        quadratic_cost(self.0)
    }
}

impl TryFrom<u64> for Weight {
    type Error = GovernanceError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Weight> for u64 {
    fn from(weight: Weight) -> Self {
        weight.0
    }
}

/// Integer square root using Newton's method.
/// Returns floor(sqrt(n)).
pub fn integer_sqrt(n: u128) -> u128 {
    if n <= 1 {
        return n;
    }

    let mut x = n;
    // ceil(n / 2) without overflowing at u128::MAX
    let mut y = x / 2 + (x & 1);

    while y < x {
        x = y;
        y = (x + n / x) / 2;
    }

    x
}

/// Token cost of a vote weight.
///
/// Cost grows with the square of the weight: each extra unit of weight costs
/// `2w + 1` more than the last.
pub fn quadratic_cost(weight: u64) -> TokenAmount {
    let w = weight as u128;
    w * w
}

/// Token cost of a vote weight, rejecting weights below 1.
pub fn cost_of(weight: u64) -> Result<TokenAmount, GovernanceError> {
    Weight::new(weight).map(|w| w.cost())
}

/// Largest weight a budget can pay for.
pub fn max_weight_from_budget(budget: TokenAmount) -> u64 {
    // sqrt(u128::MAX) < 2^64, so this never truncates
    integer_sqrt(budget) as u64
}

/// Voting capacity derived from a token balance and the tokens already
/// committed to open ballots. Never stored, always recomputed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VotingPower {
    /// Ledger balance
    pub total_tokens: TokenAmount,
    /// Tokens committed to ballots
    pub used_tokens: TokenAmount,
    /// Tokens still free to spend
    pub available_tokens: TokenAmount,
    /// floor(sqrt(available_tokens))
    pub max_weight: u64,
}

impl VotingPower {
    /// Compute power from a balance and the locked amount.
    pub fn compute(token_balance: TokenAmount, locked_tokens: TokenAmount) -> Self {
        let available_tokens = token_balance.saturating_sub(locked_tokens);
        Self {
            total_tokens: token_balance,
            used_tokens: locked_tokens,
            available_tokens,
            max_weight: max_weight_from_budget(available_tokens),
        }
    }

    /// Same as [`VotingPower::compute`] for signed wire values. Negative input
    /// is rejected.
    pub fn from_signed(token_balance: i128, locked_tokens: i128) -> Result<Self, GovernanceError> {
        let balance = amount_from_signed(token_balance)?;
        let locked = amount_from_signed(locked_tokens)?;
        Ok(Self::compute(balance, locked))
    }

    /// Whether the available tokens cover `weight`.
    pub fn can_afford(&self, weight: Weight) -> bool {
        weight.cost() <= self.available_tokens
    }
}
