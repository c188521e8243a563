use std::ops::{Index, IndexMut};

use super::DynamicalSystem;

/// Handle to a dynamical system in a [`SystemStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SystemId(pub(crate) usize);

impl SystemId {
    /// Returns the position of the system in its store.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Owning arena of dynamical systems.
///
/// Interactions refer to systems by [`SystemId`] only; the store is the
/// single owner of every state vector.
#[derive(Debug, Clone, Default)]
pub struct SystemStore {
    systems: Vec<DynamicalSystem>,
}

impl SystemStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a system and returns its handle.
    pub fn insert(&mut self, system: DynamicalSystem) -> SystemId {
        self.systems.push(system);
        SystemId(self.systems.len() - 1)
    }

    #[must_use]
    pub fn get(&self, id: SystemId) -> Option<&DynamicalSystem> {
        self.systems.get(id.0)
    }

    pub fn get_mut(&mut self, id: SystemId) -> Option<&mut DynamicalSystem> {
        self.systems.get_mut(id.0)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.systems.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }

    /// Returns `true` if `id` refers to a system in this store.
    #[must_use]
    pub fn contains(&self, id: SystemId) -> bool {
        id.0 < self.systems.len()
    }

    /// Iterates over systems in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (SystemId, &DynamicalSystem)> {
        self.systems
            .iter()
            .enumerate()
            .map(|(index, system)| (SystemId(index), system))
    }

    /// Iterates mutably over systems in insertion order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (SystemId, &mut DynamicalSystem)> {
        self.systems
            .iter_mut()
            .enumerate()
            .map(|(index, system)| (SystemId(index), system))
    }
}

impl Index<SystemId> for SystemStore {
    type Output = DynamicalSystem;

    fn index(&self, id: SystemId) -> &Self::Output {
        &self.systems[id.0]
    }
}

impl IndexMut<SystemId> for SystemStore {
    fn index_mut(&mut self, id: SystemId) -> &mut Self::Output {
        &mut self.systems[id.0]
    }
}
