//! Identity types for pactum
//!
//! Party and arbiter identities are strongly typed wrappers around UUIDs to
//! prevent accidental mixing. Agreements are numbered, not random.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Macro to generate ID types with common implementations
macro_rules! define_id_type {
    ($name:ident, $prefix:literal, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new random ID
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Create from an existing UUID
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Parse from a string (with or without prefix)
            pub fn parse(s: &str) -> Result<Self, uuid::Error> {
                let s = s.strip_prefix(concat!($prefix, "_")).unwrap_or(s);
                Ok(Self(Uuid::parse_str(s)?))
            }

            /// Get the inner UUID
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }

            /// Raw bytes, used when the identity is hashed into a commitment
            pub fn as_bytes(&self) -> &[u8; 16] {
                self.0.as_bytes()
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}_{}", $prefix, self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }
    };
}

define_id_type!(PartyId, "party", "Unique identifier for a party that can hold positions");
define_id_type!(ArbiterId, "arbiter", "Unique identifier for an arbitration authority");

/// Agreement identifier, assigned monotonically by the registry starting at 1
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AgreementId(pub u64);

impl AgreementId {
    /// The id following this one
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for AgreementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "agreement_{}", self.0)
    }
}

/// Opaque case reference handed back by the arbitration authority
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CaseRef(pub String);

impl CaseRef {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CaseRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_party_id_display_and_parse() {
        let id = PartyId::new();
        let shown = id.to_string();
        assert!(shown.starts_with("party_"));
        assert_eq!(PartyId::parse(&shown).unwrap(), id);
        assert_eq!(PartyId::parse(&id.0.to_string()).unwrap(), id);
    }

    #[test]
    fn test_agreement_id_sequence() {
        let first = AgreementId(1);
        assert_eq!(first.next(), AgreementId(2));
        assert_eq!(first.to_string(), "agreement_1");
    }
}
