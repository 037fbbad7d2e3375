//! Group-based attribute sharing.
//!
//! Every attribute dimension owns a [`GroupList`]. A new entity either opens
//! a singleton group holding its default value or, with the family's
//! effective probability, joins a group that still has room and copies that
//! group's value. Joining records an edge to one existing member, so groups
//! capped at two members yield pairwise sharing rather than cliques.
//!
//! The list tracks which groups still have room in a side index so picking
//! an eligible group never scans the full list.

use std::{collections::BTreeMap, num::NonZeroUsize};

use rand::{Rng, distributions::Standard, seq::SliceRandom};
use tracing::debug;

use crate::{
    edges::{EdgeAccumulator, ReasonTag, SharedEdge},
    entity::EntityId,
};

/// Default cap on the number of members in one sharing group.
pub const MAX_GROUP_SIZE: usize = 2;

/// Entities that were assigned the same attribute value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SharingGroup {
    value: String,
    members: Vec<EntityId>,
}

impl SharingGroup {
    /// The shared attribute value.
    #[must_use]
    #[rustfmt::skip]
    pub fn value(&self) -> &str { &self.value }

    /// Members in join order; the first member opened the group.
    #[must_use]
    #[rustfmt::skip]
    pub fn members(&self) -> &[EntityId] { &self.members }
}

/// Outcome of assigning a value to one entity in one dimension.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Assignment {
    /// The entity opened a new group with its default value.
    Fresh(String),
    /// The entity joined an existing group.
    Shared {
        /// Value copied from the group.
        value: String,
        /// Existing member the new edge connects to.
        peer: EntityId,
    },
}

impl Assignment {
    /// Returns the assigned value.
    #[must_use]
    pub fn into_value(self) -> String {
        match self {
            Self::Fresh(value) | Self::Shared { value, .. } => value,
        }
    }
}

/// Sharing groups for a single attribute dimension.
///
/// # Examples
/// ```
/// use std::num::NonZeroUsize;
///
/// use fraudnet_core::{Assignment, GroupList};
/// use rand::{SeedableRng, rngs::SmallRng};
///
/// let mut rng = SmallRng::seed_from_u64(7);
/// let mut groups = GroupList::new(NonZeroUsize::new(2).expect("non-zero"));
/// let first = groups.assign(&mut rng, 1.0, &"u_0".into(), "a@example.com".into());
/// assert_eq!(first, Assignment::Fresh("a@example.com".into()));
/// let second = groups.assign(&mut rng, 1.0, &"u_1".into(), "b@example.com".into());
/// assert_eq!(second.into_value(), "a@example.com");
/// assert_eq!(groups.eligible_len(), 0);
/// ```
#[derive(Clone, Debug)]
pub struct GroupList {
    groups: Vec<SharingGroup>,
    eligible: Vec<usize>,
    max_group_size: NonZeroUsize,
}

impl GroupList {
    /// Creates an empty list whose groups hold at most `max_group_size`
    /// members.
    #[must_use]
    pub fn new(max_group_size: NonZeroUsize) -> Self {
        Self {
            groups: Vec::new(),
            eligible: Vec::new(),
            max_group_size,
        }
    }

    /// Assigns a value to `entity`.
    ///
    /// When a group with room exists and a uniform draw falls below
    /// `probability`, the entity joins a uniformly chosen eligible group and
    /// the peer is a uniformly chosen existing member. Otherwise the entity
    /// opens a singleton group holding `default_value`.
    pub fn assign<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        probability: f64,
        entity: &EntityId,
        default_value: String,
    ) -> Assignment {
        if !self.eligible.is_empty() {
            let draw: f64 = rng.sample(Standard);
            if draw < probability
                && let Some(assignment) = self.join_eligible(rng, entity)
            {
                return assignment;
            }
        }
        self.open(entity, default_value)
    }

    fn join_eligible<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        entity: &EntityId,
    ) -> Option<Assignment> {
        let slot = rng.gen_range(0..self.eligible.len());
        let group_index = *self.eligible.get(slot)?;
        let group = self.groups.get_mut(group_index)?;
        let peer = group.members.choose(rng)?.clone();
        group.members.push(entity.clone());
        let value = group.value.clone();
        if group.members.len() >= self.max_group_size.get() {
            self.eligible.swap_remove(slot);
        }
        Some(Assignment::Shared { value, peer })
    }

    fn open(&mut self, entity: &EntityId, default_value: String) -> Assignment {
        let index = self.groups.len();
        self.groups.push(SharingGroup {
            value: default_value.clone(),
            members: vec![entity.clone()],
        });
        if self.max_group_size.get() > 1 {
            self.eligible.push(index);
        }
        Assignment::Fresh(default_value)
    }

    /// All groups in creation order.
    #[must_use]
    #[rustfmt::skip]
    pub fn groups(&self) -> &[SharingGroup] { &self.groups }

    /// Number of groups that can still accept members.
    #[must_use]
    #[rustfmt::skip]
    pub fn eligible_len(&self) -> usize { self.eligible.len() }

    /// Maximum members per group.
    #[must_use]
    #[rustfmt::skip]
    pub fn max_group_size(&self) -> NonZeroUsize { self.max_group_size }
}

/// Per-run sharing state for one attribute family (users or transactions).
///
/// Holds one [`GroupList`] per reason tag and the family's
/// [`EdgeAccumulator`]. A fresh engine is built for every run so no state
/// leaks between runs.
#[derive(Clone, Debug)]
pub struct SharingEngine {
    probability: f64,
    max_group_size: NonZeroUsize,
    dimensions: BTreeMap<ReasonTag, GroupList>,
    edges: EdgeAccumulator,
}

impl SharingEngine {
    /// Creates an engine sharing with `probability` (clamped into `[0, 1]`).
    #[must_use]
    pub fn new(probability: f64, max_group_size: NonZeroUsize) -> Self {
        let probability = if probability.is_nan() {
            0.0
        } else {
            probability.clamp(0.0, 1.0)
        };
        Self {
            probability,
            max_group_size,
            dimensions: BTreeMap::new(),
            edges: EdgeAccumulator::new(),
        }
    }

    /// Effective probability applied to every dimension of the family.
    #[must_use]
    #[rustfmt::skip]
    pub fn probability(&self) -> f64 { self.probability }

    /// Assigns the `reason` dimension of `entity`, recording an edge to the
    /// peer when the value is shared.
    pub fn assign_value<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        entity: &EntityId,
        default_value: String,
        reason: ReasonTag,
    ) -> String {
        let max_group_size = self.max_group_size;
        let groups = self
            .dimensions
            .entry(reason)
            .or_insert_with(|| GroupList::new(max_group_size));
        match groups.assign(rng, self.probability, entity, default_value) {
            Assignment::Shared { value, peer } => {
                self.edges.add_edge(entity, &peer, reason);
                value
            }
            Assignment::Fresh(value) => value,
        }
    }

    /// Group list of one dimension, if any entity was assigned in it.
    #[must_use]
    pub fn groups(&self, reason: ReasonTag) -> Option<&GroupList> {
        self.dimensions.get(&reason)
    }

    /// Edges recorded so far.
    #[must_use]
    #[rustfmt::skip]
    pub fn edges(&self) -> &EdgeAccumulator { &self.edges }

    /// Forces a `seed` edge between the first two entities when sharing was
    /// requested but produced no edge.
    ///
    /// Returns whether the seed edge was added.
    pub fn seed_if_disconnected(
        &mut self,
        first: Option<&EntityId>,
        second: Option<&EntityId>,
        requested_density: f64,
    ) -> bool {
        if !self.edges.is_empty() || requested_density.is_nan() || requested_density <= 0.0 {
            return false;
        }
        let (Some(first), Some(second)) = (first, second) else {
            return false;
        };
        let added = self.edges.add_edge(first, second, ReasonTag::Seed);
        if added {
            debug!(source = %first, target = %second, "seed edge added");
        }
        added
    }

    /// Consumes the engine and returns the deduplicated edge list.
    #[must_use]
    pub fn finish(self) -> Vec<SharedEdge> {
        self.edges.finalize()
    }
}
