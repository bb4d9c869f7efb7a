//! # Actor Identifiers
//!
//! An [`ActorId`] is 32 bytes rendered as 64 lowercase hex characters:
//!
//! ```text
//! [ 16 bytes: name digest or random ][ 16 bytes: namespace tag ]
//! ```
//!
//! The tag is derived from the owning namespace's secret [`NamespaceKey`], so only that
//! namespace can reconstruct an id from its string form. This is what the same-isolate
//! validator relies on: an id minted by a namespace of another runtime (or another
//! namespace of the same runtime) fails reconstruction.

use crate::error::{HarnessError, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// Length of an actor id in bytes.
pub const ACTOR_ID_LENGTH_BYTES: usize = 32;

const HALF: usize = ACTOR_ID_LENGTH_BYTES / 2;

/// Secret key of one actor namespace.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct NamespaceKey([u8; HALF]);

impl NamespaceKey {
    pub fn generate() -> Self {
        Self(*uuid::Uuid::new_v4().as_bytes())
    }

    fn digest(&self, data: &[u8]) -> [u8; HALF] {
        let mut hasher = Sha256::new();
        hasher.update(self.0);
        hasher.update(data);
        let hash = hasher.finalize();
        let mut out = [0u8; HALF];
        out.copy_from_slice(&hash[..HALF]);
        out
    }

    fn seal(&self, head: [u8; HALF], name: Option<String>) -> ActorId {
        let mut bytes = [0u8; ACTOR_ID_LENGTH_BYTES];
        bytes[..HALF].copy_from_slice(&head);
        bytes[HALF..].copy_from_slice(&self.digest(&head));
        ActorId { bytes, name }
    }

    /// Deterministic id for a name. The same name always maps to the same actor.
    pub fn id_from_name(&self, name: &str) -> ActorId {
        self.seal(self.digest(name.as_bytes()), Some(name.to_string()))
    }

    /// A fresh random id.
    pub fn unique_id(&self) -> ActorId {
        self.seal(*uuid::Uuid::new_v4().as_bytes(), None)
    }

    /// Reconstructs an id minted under this key from its string form.
    pub fn id_from_string(&self, value: &str) -> Result<ActorId> {
        let id: ActorId = value.parse()?;
        let mut head = [0u8; HALF];
        head.copy_from_slice(&id.bytes[..HALF]);
        if id.bytes[HALF..] != self.digest(&head) {
            return Err(HarnessError::Usage(format!(
                "Actor id {} was not created by this namespace",
                value
            )));
        }
        Ok(id)
    }
}

impl fmt::Debug for NamespaceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("NamespaceKey(..)")
    }
}

/// Address of one actor.
///
/// Equality and hashing only consider the id bytes; the optional name is what the id
/// was derived from, kept for logging and for [`ActorId::name`].
#[derive(Clone)]
pub struct ActorId {
    bytes: [u8; ACTOR_ID_LENGTH_BYTES],
    name: Option<String>,
}

impl ActorId {
    /// The name this id was derived from, if any.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn as_bytes(&self) -> &[u8; ACTOR_ID_LENGTH_BYTES] {
        &self.bytes
    }
}

impl PartialEq for ActorId {
    fn eq(&self, other: &Self) -> bool {
        self.bytes == other.bytes
    }
}

impl Eq for ActorId {}

impl Hash for ActorId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bytes.hash(state);
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.bytes))
    }
}

impl fmt::Debug for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "ActorId({}, name={:?})", self, name),
            None => write!(f, "ActorId({})", self),
        }
    }
}

impl FromStr for ActorId {
    type Err = HarnessError;

    /// Parses the hex form without checking which namespace minted it.
    fn from_str(value: &str) -> Result<Self> {
        let decoded = hex::decode(value)
            .map_err(|e| HarnessError::Usage(format!("Invalid actor id {:?}: {}", value, e)))?;
        let bytes: [u8; ACTOR_ID_LENGTH_BYTES] = decoded.try_into().map_err(|_| {
            HarnessError::Usage(format!(
                "Invalid actor id {:?}: expected {} hex characters",
                value,
                ACTOR_ID_LENGTH_BYTES * 2
            ))
        })?;
        Ok(Self { bytes, name: None })
    }
}

impl Serialize for ActorId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ActorId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        value.parse().map_err(serde::de::Error::custom)
    }
}
