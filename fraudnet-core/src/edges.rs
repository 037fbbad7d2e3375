//! Undirected sharing edges and the accumulator that deduplicates them.
//!
//! Several attribute dimensions may connect the same pair of entities. The
//! accumulator keys every record by its normalised `(source, target)` pair so
//! a pair is stored once and its reason set is the union over dimensions.

use std::{
    collections::{BTreeSet, HashMap},
    fmt,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::entity::EntityId;

/// Label naming the attribute dimension that produced an edge.
///
/// Variants are declared in the alphabetical order of their wire names so the
/// derived ordering sorts reason lists the same way their strings would.
#[derive(
    Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize,
)]
pub enum ReasonTag {
    /// Users share a postal address.
    #[serde(rename = "address")]
    Address,
    /// Transactions share a device identifier.
    #[serde(rename = "deviceId")]
    DeviceId,
    /// Users share an email address.
    #[serde(rename = "email")]
    Email,
    /// Transactions share an origin IP.
    #[serde(rename = "ip")]
    Ip,
    /// Users share a payment method.
    #[serde(rename = "payment_methods")]
    PaymentMethods,
    /// Users share a phone number.
    #[serde(rename = "phone")]
    Phone,
    /// Fallback edge forced when sharing produced no pair at all.
    #[serde(rename = "seed")]
    Seed,
    /// Edge registered without any reason.
    #[serde(rename = "unspecified")]
    Unspecified,
}

impl ReasonTag {
    /// Wire name of the tag.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Address => "address",
            Self::DeviceId => "deviceId",
            Self::Email => "email",
            Self::Ip => "ip",
            Self::PaymentMethods => "payment_methods",
            Self::Phone => "phone",
            Self::Seed => "seed",
            Self::Unspecified => "unspecified",
        }
    }
}

impl fmt::Display for ReasonTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An undirected edge in canonical form (`source < target`) with a
/// non-empty, sorted reason list.
///
/// # Examples
/// ```
/// use fraudnet_core::{EdgeAccumulator, ReasonTag};
///
/// let mut edges = EdgeAccumulator::new();
/// edges.add_edge(&"u_7".into(), &"u_3".into(), ReasonTag::Phone);
/// let finalized = edges.finalize();
/// assert_eq!(finalized[0].source().as_str(), "u_3");
/// assert_eq!(finalized[0].target().as_str(), "u_7");
/// assert_eq!(finalized[0].reasons(), &[ReasonTag::Phone]);
/// ```
///
/// Deserialisation re-checks the canonical form and fails with
/// [`EdgeError`] instead of admitting degenerate edges.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawSharedEdge")]
pub struct SharedEdge {
    source: EntityId,
    target: EntityId,
    reasons: Vec<ReasonTag>,
}

impl SharedEdge {
    /// Returns the lexicographically smaller endpoint.
    #[must_use]
    #[rustfmt::skip]
    pub fn source(&self) -> &EntityId { &self.source }

    /// Returns the lexicographically larger endpoint.
    #[must_use]
    #[rustfmt::skip]
    pub fn target(&self) -> &EntityId { &self.target }

    /// Returns the sorted, de-duplicated reasons.
    #[must_use]
    #[rustfmt::skip]
    pub fn reasons(&self) -> &[ReasonTag] { &self.reasons }

    /// Returns whether the edge joins `a` and `b` in either orientation.
    #[must_use]
    pub fn connects(&self, a: &str, b: &str) -> bool {
        let (low, high) = if a < b { (a, b) } else { (b, a) };
        self.source.as_str() == low && self.target.as_str() == high
    }
}

/// Why a serialised edge was refused.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum EdgeError {
    /// An endpoint identifier is empty.
    #[error("edge endpoints must not be empty")]
    EmptyEndpoint,
    /// The endpoints are equal or not in ascending order.
    #[error("edge `{from}` -> `{to}` is not in canonical order")]
    NotCanonical {
        /// Serialised source endpoint.
        from: EntityId,
        /// Serialised target endpoint.
        to: EntityId,
    },
    /// The reason list is empty.
    #[error("edge carries no reasons")]
    NoReasons,
    /// The reason list is unsorted or repeats a tag.
    #[error("edge reasons must be sorted and distinct")]
    UnsortedReasons,
}

#[derive(Deserialize)]
struct RawSharedEdge {
    source: EntityId,
    target: EntityId,
    reasons: Vec<ReasonTag>,
}

impl TryFrom<RawSharedEdge> for SharedEdge {
    type Error = EdgeError;

    fn try_from(raw: RawSharedEdge) -> Result<Self, Self::Error> {
        let RawSharedEdge {
            source,
            target,
            reasons,
        } = raw;
        if source.is_empty() || target.is_empty() {
            return Err(EdgeError::EmptyEndpoint);
        }
        if source >= target {
            return Err(EdgeError::NotCanonical {
                from: source,
                to: target,
            });
        }
        if reasons.is_empty() {
            return Err(EdgeError::NoReasons);
        }
        if reasons.windows(2).any(|pair| matches!(pair, [a, b] if a >= b)) {
            return Err(EdgeError::UnsortedReasons);
        }
        Ok(Self {
            source,
            target,
            reasons,
        })
    }
}

/// Accumulates undirected edges, merging the reasons of repeated pairs.
#[derive(Clone, Debug, Default)]
pub struct EdgeAccumulator {
    edges: HashMap<(EntityId, EntityId), BTreeSet<ReasonTag>>,
}

impl EdgeAccumulator {
    /// Creates an empty accumulator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `reason` for the unordered pair `{a, b}`.
    ///
    /// Self-edges and empty identifiers are dropped; the return value reports
    /// whether the pair was accepted.
    pub fn add_edge(&mut self, a: &EntityId, b: &EntityId, reason: ReasonTag) -> bool {
        self.record(a, b, Some(reason))
    }

    /// Registers the unordered pair `{a, b}` without attaching a reason.
    pub fn link(&mut self, a: &EntityId, b: &EntityId) -> bool {
        self.record(a, b, None)
    }

    fn record(&mut self, a: &EntityId, b: &EntityId, reason: Option<ReasonTag>) -> bool {
        if a.is_empty() || b.is_empty() || a == b {
            return false;
        }
        let key = if a < b {
            (a.clone(), b.clone())
        } else {
            (b.clone(), a.clone())
        };
        let reasons = self.edges.entry(key).or_default();
        if let Some(tag) = reason {
            reasons.insert(tag);
        }
        true
    }

    /// Number of distinct unordered pairs recorded so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    /// Returns whether no pair has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Returns the reasons recorded for `{a, b}`, if the pair exists.
    #[must_use]
    pub fn reasons(&self, a: &EntityId, b: &EntityId) -> Option<&BTreeSet<ReasonTag>> {
        let key = if a < b {
            (a.clone(), b.clone())
        } else {
            (b.clone(), a.clone())
        };
        self.edges.get(&key)
    }

    /// Produces one [`SharedEdge`] per pair, sorted by `(source, target)`.
    ///
    /// Pairs registered without any reason report
    /// [`ReasonTag::Unspecified`].
    #[must_use]
    pub fn finalize(self) -> Vec<SharedEdge> {
        let mut edges: Vec<SharedEdge> = self
            .edges
            .into_iter()
            .map(|((source, target), reasons)| {
                let reasons = if reasons.is_empty() {
                    vec![ReasonTag::Unspecified]
                } else {
                    reasons.into_iter().collect()
                };
                SharedEdge {
                    source,
                    target,
                    reasons,
                }
            })
            .collect();
        edges.sort_unstable_by(|left, right| {
            left.source
                .cmp(&right.source)
                .then_with(|| left.target.cmp(&right.target))
        });
        edges
    }
}
