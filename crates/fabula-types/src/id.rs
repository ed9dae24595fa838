//! Opaque identifiers.
//!
//! Every entity the engine touches is addressed by a stable string handed to
//! us by the surrounding platform (wallet addresses, database keys, ...). The
//! engine never interprets them beyond equality and ordering.

use crate::error::TypesError;
use derive_more::{Display, From};
use std::str::FromStr;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Display, From)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        #[cfg_attr(feature = "serde", serde(transparent))]
        pub struct $name(String);

        impl $name {
            /// Wrap a raw identifier without validation.
            pub fn new(raw: impl Into<String>) -> Self {
                Self(raw.into())
            }

            /// Wrap a raw identifier, rejecting empty or blank input.
            pub fn parse(raw: &str) -> Result<Self, TypesError> {
                let trimmed = raw.trim();
                if trimmed.is_empty() {
                    return Err(TypesError::EmptyIdentifier($label));
                }
                Ok(Self(trimmed.to_string()))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl From<&str> for $name {
            fn from(raw: &str) -> Self {
                Self(raw.to_string())
            }
        }

        impl FromStr for $name {
            type Err = TypesError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id!(
    /// Account of a reader, writer or voter (usually a wallet address).
    AccountId,
    "account"
);

define_id!(
    /// A story, the container of chapters.
    StoryId,
    "story"
);

define_id!(
    /// A chapter proposal competing for a chapter slot.
    ProposalId,
    "proposal"
);

define_id!(
    /// A voting round for one chapter slot.
    RoundId,
    "round"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_trims() {
        let id = AccountId::parse("  0xabc ").unwrap();
        assert_eq!(id.as_str(), "0xabc");
    }

    #[test]
    fn test_parse_rejects_blank() {
        assert_eq!(
            RoundId::parse("   "),
            Err(TypesError::EmptyIdentifier("round"))
        );
        assert!("".parse::<ProposalId>().is_err());
    }

    #[test]
    fn test_display_is_raw_value() {
        let id = StoryId::from("story-7");
        assert_eq!(id.to_string(), "story-7");
        assert_eq!(format!("{:?}", id), "StoryId(\"story-7\")");
    }

    #[test]
    fn test_ordering_follows_string() {
        let a = ProposalId::new("a");
        let b = ProposalId::new("b");
        assert!(a < b);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serde_transparent() {
        let id = AccountId::new("alice");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"alice\"");
        let back: AccountId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
