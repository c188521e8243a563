//! Interaction graph and nested index sets.
//!
//! The base graph has one vertex per interaction and one edge per
//! dynamical system shared by two interactions. Index set 0 holds every
//! interaction; index set `i > 0` holds the members of index set `i - 1`
//! whose activation predicate currently holds, so that
//! `indexSet(i) ⊆ indexSet(i - 1)` at all times.
//!
//! Membership lives in side arrays keyed by interaction handle, giving
//! O(1) insertion and removal. Each index set carries a generation stamp
//! that changes whenever its membership does, letting assemblers cache
//! positions until the stamp moves.


use std::collections::BTreeMap;

use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use thiserror::Error;

use crate::model::{Interaction, InteractionId, SystemId};

/// Default activation tolerance, scaled from machine epsilon.
pub const DEFAULT_TOLERANCE: f64 = 10.0 * f64::EPSILON;

/// Errors raised when updating index sets.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TopologyError {
    #[error("index set 0 always holds every interaction and cannot be updated")]
    BaseLevel,

    #[error("index set {level} does not exist, the topology has {count}")]
    NoSuchLevel { level: usize, count: usize },

    #[error("interaction {id:?} is not in index set {parent}")]
    NotInParent { id: InteractionId, parent: usize },

    #[error("expected {expected} interactions, got {found}")]
    InteractionCount { expected: usize, found: usize },
}

/// Activation predicate applied by index-set updates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde-derive", derive(serde::Serialize, serde::Deserialize))]
pub enum Activation {
    /// `law.is_active(y[i - 1], y[i])`: the gap is closed and not opening.
    #[default]
    ClosedAndApproaching,
    /// `law.is_closed(y[i - 1])`: the gap alone decides, for outputs that
    /// already hold a predicted gap.
    Closed,
}

impl Activation {
    fn holds(self, interaction: &Interaction, level: usize, tolerance: f64) -> bool {
        let law = interaction.law();
        let gap = interaction.y(level - 1)[0];
        law.is_equality()
            || match self {
                Self::ClosedAndApproaching => {
                    law.is_active(gap, interaction.y(level)[0], tolerance)
                }
                Self::Closed => law.is_closed(gap, tolerance),
            }
    }
}

/// An edge between two interactions sharing a dynamical system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    /// Stable edge index, usable as a key for per-edge data.
    pub index: usize,
    pub source: InteractionId,
    pub target: InteractionId,
    pub system: SystemId,
}

/// Membership changes made by one index-set update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexSetUpdate {
    pub inserted: Vec<InteractionId>,
    pub removed: Vec<InteractionId>,
    /// Equality interactions pre-activated one level ahead.
    pub forecast: Vec<InteractionId>,
}

impl IndexSetUpdate {
    /// Returns `true` if no membership changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inserted.is_empty() && self.removed.is_empty() && self.forecast.is_empty()
    }
}

#[derive(Debug, Clone)]
struct IndexSet {
    members: Vec<bool>,
    len: usize,
    generation: u64,
}

static EMPTY_SET: IndexSet = IndexSet {
    members: Vec::new(),
    len: 0,
    generation: 0,
};

impl IndexSet {
    fn new(size: usize, full: bool) -> Self {
        Self {
            members: vec![full; size],
            len: if full { size } else { 0 },
            generation: 0,
        }
    }

    fn contains(&self, index: usize) -> bool {
        self.members.get(index).copied().unwrap_or(false)
    }

    fn set(&mut self, index: usize, member: bool) -> bool {
        match self.members.get_mut(index) {
            Some(slot) if *slot != member => {
                *slot = member;
                if member {
                    self.len += 1;
                } else {
                    self.len -= 1;
                }
                self.generation += 1;
                true
            }
            _ => false,
        }
    }
}

/// Read-only view of one index set.
#[derive(Debug, Clone, Copy)]
pub struct IndexSetView<'a> {
    set: &'a IndexSet,
    level: usize,
}

impl<'a> IndexSetView<'a> {
    #[must_use]
    pub fn level(&self) -> usize {
        self.level
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.set.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.set.len == 0
    }

    #[must_use]
    pub fn contains(&self, id: InteractionId) -> bool {
        self.set.contains(id.index())
    }

    /// Returns the membership stamp of this index set.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.set.generation
    }

    /// Iterates over members in ascending handle order.
    pub fn iter(&self) -> impl Iterator<Item = InteractionId> + 'a {
        self.set
            .members
            .iter()
            .enumerate()
            .filter(|(_, member)| **member)
            .map(|(index, _)| InteractionId(index))
    }
}

/// The activation graph: base interaction graph plus nested index sets.
#[derive(Debug, Clone)]
pub struct Topology {
    graph: UnGraph<InteractionId, SystemId>,
    sets: Vec<IndexSet>,
    activation: Activation,
    changed: bool,
}

impl Topology {
    /// Builds the base graph over `interactions` with `index_sets` levels
    /// (at least one). Index set 0 starts full, higher sets start empty.
    #[must_use]
    pub fn new(interactions: &[Interaction], index_sets: usize) -> Self {
        let n = interactions.len();
        let mut graph = UnGraph::with_capacity(n, 0);
        for index in 0..n {
            graph.add_node(InteractionId(index));
        }

        let mut by_system: BTreeMap<SystemId, Vec<usize>> = BTreeMap::new();
        for (index, interaction) in interactions.iter().enumerate() {
            for &system in interaction.systems() {
                by_system.entry(system).or_default().push(index);
            }
        }
        for (system, members) in by_system {
            for (i, &a) in members.iter().enumerate() {
                for &b in &members[i + 1..] {
                    graph.add_edge(NodeIndex::new(a), NodeIndex::new(b), system);
                }
            }
        }

        let mut sets = vec![IndexSet::new(n, true)];
        sets.extend((1..index_sets.max(1)).map(|_| IndexSet::new(n, false)));

        Self {
            graph,
            sets,
            activation: Activation::default(),
            changed: false,
        }
    }

    /// Replaces the activation predicate.
    #[must_use]
    pub fn with_activation(mut self, activation: Activation) -> Self {
        self.activation = activation;
        self
    }

    #[must_use]
    pub fn activation(&self) -> Activation {
        self.activation
    }

    /// Returns the number of interactions (vertices).
    #[must_use]
    pub fn interaction_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Returns the number of index sets.
    #[must_use]
    pub fn index_set_count(&self) -> usize {
        self.sets.len()
    }

    /// Returns a view of index set `level`, empty if the level does not exist.
    #[must_use]
    pub fn index_set(&self, level: usize) -> IndexSetView<'_> {
        IndexSetView {
            set: self.sets.get(level).unwrap_or(&EMPTY_SET),
            level,
        }
    }

    /// Returns `true` if `id` is a member of index set `level`.
    #[must_use]
    pub fn contains(&self, level: usize, id: InteractionId) -> bool {
        self.index_set(level).contains(id)
    }

    /// Returns the membership stamp of index set `level`.
    #[must_use]
    pub fn generation(&self, level: usize) -> u64 {
        self.index_set(level).generation()
    }

    /// Returns the number of edges in the base graph.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Iterates over edges whose endpoints are both in index set `level`.
    pub fn edges(&self, level: usize) -> impl Iterator<Item = Edge> + '_ {
        let set = self.sets.get(level).unwrap_or(&EMPTY_SET);
        self.graph.edge_references().filter_map(move |edge| {
            let source = edge.source().index();
            let target = edge.target().index();
            (set.contains(source) && set.contains(target)).then(|| Edge {
                index: edge.id().index(),
                source: InteractionId(source),
                target: InteractionId(target),
                system: *edge.weight(),
            })
        })
    }

    /// Returns `true` if membership changed since the flag was last taken.
    #[must_use]
    pub fn has_changed(&self) -> bool {
        self.changed
    }

    /// Returns and clears the "topology changed" flag.
    pub fn take_changed(&mut self) -> bool {
        std::mem::take(&mut self.changed)
    }

    /// Inserts `id` into index set `level`.
    ///
    /// Returns `Ok(false)` if it was already a member.
    ///
    /// # Errors
    ///
    /// Returns an error for level 0, a missing level, or an interaction that
    /// is not a member of index set `level - 1`.
    pub fn insert(&mut self, level: usize, id: InteractionId) -> Result<bool, TopologyError> {
        self.check_level(level)?;
        if !self.sets[level - 1].contains(id.index()) {
            return Err(TopologyError::NotInParent {
                id,
                parent: level - 1,
            });
        }
        let inserted = self.sets[level].set(id.index(), true);
        self.changed |= inserted;
        Ok(inserted)
    }

    /// Removes `id` from index set `level` and every higher set.
    ///
    /// Returns `Ok(false)` if it was not a member of `level`.
    ///
    /// # Errors
    ///
    /// Returns an error for level 0 or a missing level.
    pub fn remove(&mut self, level: usize, id: InteractionId) -> Result<bool, TopologyError> {
        self.check_level(level)?;
        let removed = self.remove_cascading(level, id);
        self.changed |= removed;
        Ok(removed)
    }

    /// Re-evaluates index set `level` against the current outputs.
    ///
    /// Every member of index set `level - 1` is tested with the activation
    /// predicate; equality laws are always kept. Decisions are taken on a
    /// consistent snapshot and applied afterwards. Removed interactions have
    /// their reactions zeroed at the levels they leave. When level 1 gains
    /// members, equality interactions are pre-activated in index set 2.
    ///
    /// # Errors
    ///
    /// Returns an error for level 0, a missing level, or an interaction
    /// slice that does not match the graph.
    pub fn update_index_set(
        &mut self,
        level: usize,
        interactions: &mut [Interaction],
        tolerance: f64,
    ) -> Result<IndexSetUpdate, TopologyError> {
        self.sweep(level, interactions, tolerance, true)
    }

    /// Removes the members of index set `level` whose gap `y[level - 1]`
    /// has opened, without admitting new ones. The rate is not consulted,
    /// whatever the topology's [`Activation`].
    ///
    /// Used between events, where a closing gap must be handled as an
    /// impact rather than silently activated.
    ///
    /// # Errors
    ///
    /// Returns an error for level 0, a missing level, or an interaction
    /// slice that does not match the graph.
    pub fn release_index_set(
        &mut self,
        level: usize,
        interactions: &mut [Interaction],
        tolerance: f64,
    ) -> Result<IndexSetUpdate, TopologyError> {
        self.sweep(level, interactions, tolerance, false)
    }

    /// Updates every index set above 0 in ascending order.
    ///
    /// # Errors
    ///
    /// Returns an error if the interaction slice does not match the graph.
    pub fn update_index_sets(
        &mut self,
        interactions: &mut [Interaction],
        tolerance: f64,
    ) -> Result<Vec<IndexSetUpdate>, TopologyError> {
        (1..self.sets.len())
            .map(|level| self.update_index_set(level, interactions, tolerance))
            .collect()
    }

    fn sweep(
        &mut self,
        level: usize,
        interactions: &mut [Interaction],
        tolerance: f64,
        admit: bool,
    ) -> Result<IndexSetUpdate, TopologyError> {
        self.check_level(level)?;
        if interactions.len() != self.interaction_count() {
            return Err(TopologyError::InteractionCount {
                expected: self.interaction_count(),
                found: interactions.len(),
            });
        }

        let mut update = IndexSetUpdate::default();
        for (index, interaction) in interactions.iter().enumerate() {
            if !self.sets[level - 1].contains(index) {
                continue;
            }
            let active = if admit {
                self.activation.holds(interaction, level, tolerance)
            } else {
                Activation::Closed.holds(interaction, level, tolerance)
            };
            let member = self.sets[level].contains(index);

            if active && !member && admit {
                update.inserted.push(InteractionId(index));
            } else if !active && member {
                update.removed.push(InteractionId(index));
            }
        }

        for &id in &update.removed {
            self.remove_cascading(level, id);
            for lambda_level in level..self.sets.len() {
                interactions[id.index()].reset_lambda(lambda_level);
            }
        }
        for &id in &update.inserted {
            self.sets[level].set(id.index(), true);
        }

        if level == 1 && !update.inserted.is_empty() && self.sets.len() > 2 {
            for (index, interaction) in interactions.iter().enumerate() {
                if interaction.law().is_equality()
                    && self.sets[1].contains(index)
                    && self.sets[2].set(index, true)
                {
                    update.forecast.push(InteractionId(index));
                }
            }
        }

        if !update.is_empty() {
            self.changed = true;
            tracing::debug!(
                level,
                inserted = update.inserted.len(),
                removed = update.removed.len(),
                forecast = update.forecast.len(),
                "index set updated"
            );
        }

        Ok(update)
    }

    fn check_level(&self, level: usize) -> Result<(), TopologyError> {
        if level == 0 {
            return Err(TopologyError::BaseLevel);
        }
        if level >= self.sets.len() {
            return Err(TopologyError::NoSuchLevel {
                level,
                count: self.sets.len(),
            });
        }
        Ok(())
    }

    fn remove_cascading(&mut self, level: usize, id: InteractionId) -> bool {
        let removed = self.sets[level].set(id.index(), false);
        for set in &mut self.sets[level + 1..] {
            set.set(id.index(), false);
        }
        removed
    }
}
