//! Append-only node storage with typed handles.
//!
//! Statement and expression nodes are never mutated after they are appended.
//! A rewrite appends replacement nodes and hands back a new root handle, so a
//! [`Handle`] recorded before a rewrite still names the same node afterwards.

use std::fmt;
use std::marker::PhantomData;
use std::ops::Index;

/// A typed slot in an [`Arena`].
///
/// Two handles are equal exactly when they name the same slot, which is what
/// the offload passes use as node identity.
pub struct Handle<T> {
    slot: usize,
    marker: PhantomData<fn() -> T>,
}

impl<T> Handle<T> {
    pub(crate) fn new(slot: usize) -> Self {
        Self {
            slot,
            marker: PhantomData,
        }
    }

    /// Zero-based append position of the node.
    pub fn index(self) -> usize {
        self.slot
    }
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.slot == other.slot
    }
}

impl<T> Eq for Handle<T> {}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.slot)
    }
}

/// Append-only node storage. Nodes can be read by handle but never replaced.
#[derive(Clone, Debug, PartialEq)]
pub struct Arena<T> {
    nodes: Vec<T>,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self { nodes: Vec::new() }
    }
}

impl<T> Arena<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Appends `node` and returns the handle naming it.
    pub fn append(&mut self, node: T) -> Handle<T> {
        let handle = Handle::new(self.nodes.len());
        self.nodes.push(node);
        handle
    }

    /// The node behind `handle`, or `None` when the handle was issued by a
    /// larger arena.
    pub fn try_get(&self, handle: Handle<T>) -> Option<&T> {
        self.nodes.get(handle.slot)
    }

    /// `(handle, node)` pairs in append order.
    pub fn iter(&self) -> impl Iterator<Item = (Handle<T>, &T)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(slot, node)| (Handle::new(slot), node))
    }
}

impl<T> Index<Handle<T>> for Arena<T> {
    type Output = T;

    fn index(&self, handle: Handle<T>) -> &T {
        &self.nodes[handle.slot]
    }
}
