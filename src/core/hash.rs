//! Fixed-length content hashes.
//!
//! Every identifier in the ledger is a 32-byte SHA-256 digest. The wrappers
//! below keep action, entry and link hashes from being mixed up at compile
//! time; on the wire they are lowercase hex strings.

use crate::core::error::LedgerError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

pub const HASH_LEN: usize = 32;

macro_rules! hash_type {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name([u8; HASH_LEN]);

        impl $name {
            /// Digest arbitrary bytes into this hash type.
            pub fn digest(bytes: &[u8]) -> Self {
                let out = Sha256::digest(bytes);
                let mut raw = [0u8; HASH_LEN];
                raw.copy_from_slice(&out);
                Self(raw)
            }

            pub fn as_bytes(&self) -> &[u8; HASH_LEN] {
                &self.0
            }

            pub fn to_hex(&self) -> String {
                hex::encode(self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.to_hex())
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", $label, &self.to_hex()[..12])
            }
        }

        impl FromStr for $name {
            type Err = LedgerError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let bytes = hex::decode(s.trim()).map_err(|e| {
                    LedgerError::MalformedPayload(format!("{} '{}': {}", $label, s, e))
                })?;
                let raw: [u8; HASH_LEN] = bytes.try_into().map_err(|_| {
                    LedgerError::MalformedPayload(format!(
                        "{} '{}': expected {} bytes",
                        $label, s, HASH_LEN
                    ))
                })?;
                Ok(Self(raw))
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_hex())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

hash_type!(
    /// Identity of one committed action. The action hash of a Create is the
    /// origin hash of the logical entity it starts.
    ActionHash,
    "ActionHash"
);
hash_type!(
    /// Address of an entry payload: digest of its serialized bytes.
    EntryHash,
    "EntryHash"
);
hash_type!(LinkHash, "LinkHash");
hash_type!(
    /// Author identity. Derived from a seed at `init`; signatures are left to
    /// the transport layer.
    AgentPubKey,
    "AgentPubKey"
);
