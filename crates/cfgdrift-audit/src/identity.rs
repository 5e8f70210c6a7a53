//! Match identities
//!
//! A match is named two ways: the *volatile* id covers the matched value and
//! changes when the value drifts, the *stable* id leaves the value out. Both
//! are Blake3 digests over length-prefixed fields behind a domain tag, so no
//! choice of field contents can make two different tuples collide by
//! concatenation.

use crate::error::MatchIdError;
use cfgdrift_resolve::MatchEntry;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

const VOLATILE_TAG: &str = "cfgdrift/match/volatile/v1";
const STABLE_TAG: &str = "cfgdrift/match/stable/v1";
const INSTANCE_TAG: &str = "cfgdrift/instance/v1";

/// A 32-byte match identifier (Blake3)
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MatchId([u8; 32]);

impl MatchId {
    /// Digest a tagged field tuple
    #[must_use]
    pub fn digest(tag: &str, fields: &[&str]) -> Self {
        let mut hasher = blake3::Hasher::new();
        for part in std::iter::once(tag).chain(fields.iter().copied()) {
            hasher.update(&(part.len() as u64).to_le_bytes());
            hasher.update(part.as_bytes());
        }
        Self(*hasher.finalize().as_bytes())
    }

    /// Raw bytes
    #[inline]
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// First 16 hex chars
    #[inline]
    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..8])
    }
}

impl fmt::Display for MatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for MatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MatchId({})", self.short())
    }
}

impl FromStr for MatchId {
    type Err = MatchIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s)?;
        let bytes: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| MatchIdError::InvalidLength {
                expected: 32,
                actual: bytes.len(),
            })?;
        Ok(Self(bytes))
    }
}

impl Serialize for MatchId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MatchId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Volatile and stable ids of one match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MatchIdentity {
    /// Covers the value; changes when the value drifts
    pub volatile: MatchId,
    /// Leaves the value out; constant across scans
    pub stable: MatchId,
}

impl MatchIdentity {
    /// Identity of one match in one instance
    #[must_use]
    pub fn for_match(namespace: &str, workload_name: &str, entry: &MatchEntry) -> Self {
        let match_on = entry.match_on.as_str();
        Self {
            volatile: MatchId::digest(
                VOLATILE_TAG,
                &[
                    namespace,
                    workload_name,
                    entry.key.as_str(),
                    entry.source.as_str(),
                    match_on,
                    entry.value.as_str(),
                ],
            ),
            stable: MatchId::digest(
                STABLE_TAG,
                &[
                    namespace,
                    workload_name,
                    entry.key.as_str(),
                    entry.source.as_str(),
                    match_on,
                ],
            ),
        }
    }

    /// Skip-level identity of a whole instance (used for failed instances)
    #[must_use]
    pub fn for_instance(namespace: &str, workload_name: &str) -> Self {
        let id = MatchId::digest(INSTANCE_TAG, &[namespace, workload_name]);
        Self {
            volatile: id,
            stable: id,
        }
    }
}
