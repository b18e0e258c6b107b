//! Fleet identifiers
//!
//! The fleet API hands out bus ids as database integers in some payloads
//! (`bus_id: 12`) and as text in others (`"id": "12"`). Both normalise to
//! the same `EntityId`, so a delta always finds the snapshot record it
//! refers to. Routes are keyed the same way.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Borrow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::Arc;

/// Bus identifier
///
/// Shared text: the store key, the overlay key, every view row and every
/// delta all point at one allocation.
///
/// ```
/// use contracts::EntityId;
///
/// let from_wire = EntityId::from(7u64);
/// assert_eq!(from_wire, "7");
/// assert_eq!(EntityId::from("7"), from_wire);
/// ```
#[derive(Clone, Default, PartialOrd, Ord)]
pub struct EntityId(Arc<str>);

/// Catalog route identifier
pub type RouteId = EntityId;

impl EntityId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Deref for EntityId {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for EntityId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// Keyed maps are queried with plain `&str` ids taken from deltas and UI
// actions; `Hash` below must agree with `str`.
impl Borrow<str> for EntityId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl Hash for EntityId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_str().hash(state)
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        Self(id.into())
    }
}

impl From<String> for EntityId {
    fn from(id: String) -> Self {
        Self(id.into())
    }
}

impl From<u64> for EntityId {
    fn from(id: u64) -> Self {
        Self::from(id.to_string())
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl PartialEq for EntityId {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0 == other.0
    }
}

impl Eq for EntityId {}

macro_rules! eq_text {
    ($($text:ty),*) => {$(
        impl PartialEq<$text> for EntityId {
            fn eq(&self, other: &$text) -> bool {
                self.as_str() == AsRef::<str>::as_ref(other)
            }
        }
    )*};
}

eq_text!(str, &str, String);

impl Serialize for EntityId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

/// Wire forms an id arrives in
#[derive(Deserialize)]
#[serde(untagged)]
enum WireId {
    Text(String),
    Unsigned(u64),
    Signed(i64),
}

impl<'de> Deserialize<'de> for EntityId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match WireId::deserialize(deserializer)? {
            WireId::Text(text) => Self::from(text),
            WireId::Unsigned(n) => Self::from(n),
            WireId::Signed(n) => Self::from(n.to_string()),
        })
    }
}
