//! Generated entity records.
//!
//! Identifiers are opaque strings of the form `<kind_prefix>_<index>`; they
//! compare lexicographically and are never parsed back into numbers.

use std::{borrow::Borrow, fmt};

use serde::{Deserialize, Serialize};

/// Stable, generator-assigned identifier of a user or transaction.
///
/// # Examples
/// ```
/// use fraudnet_core::{EntityId, EntityKind};
///
/// let id = EntityId::for_index(EntityKind::User, 12);
/// assert_eq!(id.as_str(), "u_12");
/// // Ordering is lexicographic, not numeric.
/// assert!(EntityId::from("u_10") < EntityId::from("u_2"));
/// ```
#[derive(Clone, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// Builds the identifier of the `index`-th entity of `kind`.
    #[must_use]
    pub fn for_index(kind: EntityKind, index: usize) -> Self {
        Self(format!("{}_{index}", kind.prefix()))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    #[rustfmt::skip]
    pub fn as_str(&self) -> &str { &self.0 }

    /// Returns whether the identifier is empty.
    #[must_use]
    #[rustfmt::skip]
    pub fn is_empty(&self) -> bool { self.0.is_empty() }
}

impl From<&str> for EntityId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for EntityId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl Borrow<str> for EntityId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The two entity kinds the generator produces.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum EntityKind {
    /// Account holders (`u_<i>`).
    User,
    /// Payments between two users (`t_<i>`).
    Transaction,
}

impl EntityKind {
    /// Identifier prefix for this kind.
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::User => "u",
            Self::Transaction => "t",
        }
    }

    /// Store label for this kind.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Transaction => "Transaction",
        }
    }
}

/// A synthetic account holder.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier, `u_<i>`.
    pub id: EntityId,
    /// Display name, `User<i>`.
    pub name: String,
    /// Email address, possibly shared with one peer.
    pub email: String,
    /// Phone number, possibly shared with one peer.
    pub phone: String,
    /// Postal address, possibly shared with one peer.
    pub address: String,
    /// Payment method, possibly shared with one peer.
    pub payment_methods: String,
}

/// A synthetic payment between two distinct users.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// Unique identifier, `t_<i>`.
    pub id: EntityId,
    /// Debited user.
    pub sender_id: EntityId,
    /// Credited user; never equal to `sender_id`.
    pub receiver_id: EntityId,
    /// Amount in `[0, 1000)` with two decimal places.
    pub amount: f64,
    /// Origin IP address, possibly shared with one peer.
    pub ip: String,
    /// Device identifier, possibly shared with one peer.
    pub device_id: String,
}
