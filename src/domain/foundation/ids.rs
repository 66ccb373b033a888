//! Strongly-typed identifier value objects.
//!
//! Every identifier in the ledger is a database-assigned `BIGSERIAL` (or an
//! external marketplace key), so each id wraps an `i64`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wraps a raw database key.
            pub const fn new(value: i64) -> Self {
                Self(value)
            }

            /// Returns the raw database key.
            pub const fn value(&self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(s.trim().parse()?))
            }
        }
    };
}

numeric_id!(
    /// Marketplace user (buyer, seller, or admin).
    UserId
);

numeric_id!(
    /// Classified listing owned by the marketplace.
    ListingId
);

numeric_id!(
    /// Internal id of a payment attempt in the ledger.
    TransactionId
);

numeric_id!(
    /// Internal id of a contact access grant.
    GrantId
);

numeric_id!(
    /// Internal id of a buyer/seller message.
    MessageId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_display_raw_value() {
        assert_eq!(TransactionId::new(101).to_string(), "101");
        assert_eq!(UserId::new(42).to_string(), "42");
    }

    #[test]
    fn ids_parse_from_strings() {
        let id: ListingId = " 7 ".parse().unwrap();
        assert_eq!(id, ListingId::new(7));
        assert!("seven".parse::<ListingId>().is_err());
    }

    #[test]
    fn ids_serialize_transparently() {
        let json = serde_json::to_string(&GrantId::new(9)).unwrap();
        assert_eq!(json, "9");

        let id: UserId = serde_json::from_str("42").unwrap();
        assert_eq!(id.value(), 42);
    }

    #[test]
    fn distinct_id_types_do_not_mix() {
        // Same raw value, different semantic types.
        let user = UserId::from(5);
        let listing = ListingId::from(5);
        assert_eq!(user.value(), listing.value());
    }
}
