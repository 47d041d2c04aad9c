use serde::{Deserialize, Serialize};
use std::fmt;

use super::error::TxError;

/// Opaque 32-byte token category, rendered as lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Category(String);

impl Category {
    pub const LEN: usize = 32;

    /// Parse a hex category. Returns normalized (lowercase) hex if valid.
    pub fn from_hex(s: &str) -> Result<Self, TxError> {
        let bytes = hex::decode(s)
            .map_err(|_| TxError::MalformedInput("invalid category hex".into()))?;
        if bytes.len() != Self::LEN {
            return Err(TxError::MalformedInput(format!(
                "category must be {} bytes, got {}",
                Self::LEN,
                bytes.len()
            )));
        }
        Ok(Self(hex::encode(bytes)))
    }

    /// Mint a fresh random category (dev faucet and tests).
    pub fn random() -> Self {
        let bytes: [u8; Self::LEN] = rand::random();
        Self(hex::encode(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Quantity of a fungible token. All arithmetic is checked.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct TokenAmount(u128);

impl TokenAmount {
    pub const ZERO: Self = Self(0);

    pub const fn new(value: u128) -> Self {
        Self(value)
    }

    pub const fn get(self) -> u128 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, rhs: Self) -> Result<Self, TxError> {
        self.0.checked_add(rhs.0).map(Self).ok_or(TxError::Overflow)
    }

    pub fn checked_mul(self, rhs: u128) -> Result<Self, TxError> {
        self.0.checked_mul(rhs).map(Self).ok_or(TxError::Overflow)
    }

    /// `None` when the result would go below zero.
    pub fn checked_sub(self, rhs: Self) -> Option<Self> {
        self.0.checked_sub(rhs.0).map(Self)
    }

    pub fn div_floor(self, rhs: u128) -> Self {
        Self(self.0 / rhs)
    }
}

impl From<u128> for TokenAmount {
    fn from(value: u128) -> Self {
        Self(value)
    }
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A token attachment: an amount bound to its category.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Token {
    pub category: Category,
    pub amount: TokenAmount,
}

impl Token {
    pub fn new(category: Category, amount: impl Into<TokenAmount>) -> Self {
        Self {
            category,
            amount: amount.into(),
        }
    }

    fn ensure_same_category(&self, other: &Token) -> Result<(), TxError> {
        if self.category != other.category {
            return Err(TxError::CategoryMismatch {
                expected: self.category.clone(),
                found: other.category.clone(),
            });
        }
        Ok(())
    }

    /// Combine two attachments of the same category.
    pub fn checked_add(&self, other: &Token) -> Result<Token, TxError> {
        self.ensure_same_category(other)?;
        Ok(Token::new(
            self.category.clone(),
            self.amount.checked_add(other.amount)?,
        ))
    }

    /// Subtract within the same category. `Ok(None)` when `other` exceeds `self`.
    pub fn checked_sub(&self, other: &Token) -> Result<Option<Token>, TxError> {
        self.ensure_same_category(other)?;
        Ok(self
            .amount
            .checked_sub(other.amount)
            .map(|amount| Token::new(self.category.clone(), amount)))
    }
}
