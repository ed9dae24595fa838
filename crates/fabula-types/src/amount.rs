//! Token amounts in the smallest token unit.

use crate::error::TypesError;

/// Non-negative token quantity, smallest unit.
pub type TokenAmount = u128;

/// Convert a signed wire integer into a token amount.
pub fn amount_from_signed(value: i128) -> Result<TokenAmount, TypesError> {
    u128::try_from(value).map_err(|_| TypesError::NegativeAmount(value))
}
