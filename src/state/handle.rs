//! Identity types shared by managers and states.

use std::fmt;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

static NEXT_MANAGER_ID: AtomicU64 = AtomicU64::new(1);

/// Identifier of a state type (a "state class").
///
/// Usually a field-less enum. Blanket-implemented for anything that fits.
pub trait StateKey: Copy + Eq + Hash + fmt::Debug + 'static {}

impl<T> StateKey for T where T: Copy + Eq + Hash + fmt::Debug + 'static {}

/// Process-unique identity of a [`StateManager`](super::StateManager).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ManagerId(u64);

impl ManagerId {
    pub(crate) fn next() -> Self {
        Self(NEXT_MANAGER_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric id.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ManagerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "manager#{}", self.0)
    }
}

/// Handle to one state instance spawned by a manager.
///
/// Handles are cheap to copy and never dangle: a manager keeps every state it
/// spawned for its whole lifetime. A handle only means something to the
/// manager that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StateRef<K> {
    pub(crate) manager: ManagerId,
    pub(crate) index: usize,
    pub(crate) key: K,
}

impl<K: StateKey> StateRef<K> {
    /// Manager that spawned this state.
    pub fn manager(&self) -> ManagerId {
        self.manager
    }

    /// Stable index within the manager's state list.
    pub fn index(&self) -> usize {
        self.index
    }

    /// State class this instance was created from.
    pub fn key(&self) -> K {
        self.key
    }

    /// Check if this handle refers to a state of class `key`.
    pub fn is(&self, key: K) -> bool {
        self.key == key
    }
}

impl<K: StateKey> fmt::Display for StateRef<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}[{}]@{}", self.key, self.index, self.manager)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum Key {
        Idle,
    }

    #[test]
    fn test_manager_ids_are_unique() {
        let a = ManagerId::next();
        let b = ManagerId::next();
        assert_ne!(a, b);
        assert!(b.as_u64() > a.as_u64());
    }

    #[test]
    fn test_state_ref_accessors() {
        let manager = ManagerId::next();
        let r = StateRef {
            manager,
            index: 3,
            key: Key::Idle,
        };

        assert_eq!(r.index(), 3);
        assert_eq!(r.manager(), manager);
        assert!(r.is(Key::Idle));
        assert_eq!(format!("{}", r), format!("Idle[3]@{}", manager));
    }
}
