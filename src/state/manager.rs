//! State manager.
//!
//! Owns one instance of every configured state class, tracks which one is
//! current and arbitrates transitions between them.
//!
//! # Transition order
//!
//! ```text
//!   current (if active)                current           new state
//!   on_interrupt ─▶ become_inactive ─▶ on_end ─▶ swap ─▶ on_begin
//! ```
//!
//! The old state is fully torn down before the new one begins, so no two
//! states are ever active at the same time.

use std::collections::{HashMap, VecDeque};
use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::behavior::{deactivate, State, StateClass, StateContext};
use super::handle::{ManagerId, StateKey, StateRef};
use super::history::{StateSnapshot, TransitionHistory, TransitionKind, DEFAULT_HISTORY_LEN};
use super::timer::{TimerHandle, TimerSet};

/// Longest chain of self-initiated transitions processed in one call.
pub const MAX_CHAINED_TRANSITIONS: usize = 64;

/// Name given to managers that were not configured with one.
pub const DEFAULT_MANAGER_NAME: &str = "StateManager";

/// Non-fatal problems reported by a manager.
///
/// These are logged and kept in [`StateManager::diagnostics`]; the manager
/// carries on in a defined state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateError {
    #[error("state manager \"{manager}\" has a duplicate state with class {class}")]
    DuplicateState { manager: String, class: String },

    #[error("state manager \"{manager}\" got a state it didn't spawn in {operation}, call ignored")]
    ForeignState {
        manager: String,
        operation: &'static str,
    },

    #[error("state manager \"{manager}\" is already initialized")]
    AlreadyInitialized { manager: String },

    #[error("state manager \"{manager}\" has no state at index {index}")]
    UnknownStateIndex { manager: String, index: usize },
}

fn default_name() -> String {
    DEFAULT_MANAGER_NAME.to_string()
}

fn default_history_len() -> usize {
    DEFAULT_HISTORY_LEN
}

/// Serializable manager setup.
///
/// ```json
/// { "name": "hero", "states": ["idle", "walking"], "history_len": 8 }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateManagerConfig<K> {
    /// Name used in log messages and diagnostics
    #[serde(default = "default_name")]
    pub name: String,

    /// State classes in index order
    pub states: Vec<K>,

    /// Transitions kept in the history, zero disables it
    #[serde(default = "default_history_len")]
    pub history_len: usize,
}

impl<K> StateManagerConfig<K> {
    /// Config with the default name and history length.
    pub fn new(states: impl IntoIterator<Item = K>) -> Self {
        Self {
            name: default_name(),
            states: states.into_iter().collect(),
            history_len: DEFAULT_HISTORY_LEN,
        }
    }
}

impl<K: DeserializeOwned> StateManagerConfig<K> {
    /// Parse a config from JSON.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

type StateFactory<K> = Box<dyn FnMut(K) -> Box<dyn State<K>>>;

struct StateSlot<K: StateKey> {
    key: K,
    state: Box<dyn State<K>>,
    active: bool,
    timers: TimerSet,
}

/// Finite state machine over a fixed catalog of states.
///
/// The owner calls [`initialize`](Self::initialize) once, then
/// [`tick`](Self::tick) every frame, and [`advance_timers`](Self::advance_timers)
/// if its states use timers.
pub struct StateManager<K: StateKey> {
    id: ManagerId,
    name: String,
    state_classes: Vec<K>,
    factory: StateFactory<K>,
    slots: Vec<StateSlot<K>>,
    class_to_index: HashMap<K, usize>,
    current: Option<StateRef<K>>,
    /// Self-initiated transitions waiting for the running hook to return
    requests: VecDeque<StateRef<K>>,
    history: TransitionHistory,
    diagnostics: Vec<StateError>,
    initialized: bool,
}

impl<K: StateClass> StateManager<K> {
    /// Create a manager whose states build themselves through [`StateClass`].
    pub fn new(states: impl IntoIterator<Item = K>) -> Self {
        Self::with_factory(states, K::instantiate)
    }

    /// Create a manager from a config, building states through [`StateClass`].
    pub fn from_config(config: StateManagerConfig<K>) -> Self {
        Self::from_config_with_factory(config, K::instantiate)
    }
}

impl<K: StateKey> StateManager<K> {
    /// Create a manager that builds each state with `factory`.
    pub fn with_factory<F>(states: impl IntoIterator<Item = K>, factory: F) -> Self
    where
        F: FnMut(K) -> Box<dyn State<K>> + 'static,
    {
        Self::from_config_with_factory(StateManagerConfig::new(states), factory)
    }

    /// Create a manager from a config, building each state with `factory`.
    pub fn from_config_with_factory<F>(config: StateManagerConfig<K>, factory: F) -> Self
    where
        F: FnMut(K) -> Box<dyn State<K>> + 'static,
    {
        Self {
            id: ManagerId::next(),
            name: config.name,
            state_classes: config.states,
            factory: Box::new(factory),
            slots: Vec::new(),
            class_to_index: HashMap::new(),
            current: None,
            requests: VecDeque::new(),
            history: TransitionHistory::with_capacity(config.history_len),
            diagnostics: Vec::new(),
            initialized: false,
        }
    }

    /// Set the name used in log messages and diagnostics.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Spawn every configured state and run its `initialize` hook.
    ///
    /// Duplicate classes are reported and skipped; the remaining states are
    /// still spawned. Returns false if anything was reported.
    pub fn initialize(&mut self) -> bool {
        if self.initialized {
            self.report(StateError::AlreadyInitialized {
                manager: self.name.clone(),
            });
            return false;
        }
        self.initialized = true;

        let mut any_errors = false;

        for position in 0..self.state_classes.len() {
            let key = self.state_classes[position];

            if self.class_to_index.contains_key(&key) {
                self.report(StateError::DuplicateState {
                    manager: self.name.clone(),
                    class: format!("{:?}", key),
                });
                any_errors = true;
                continue;
            }

            let index = self.slots.len();
            self.class_to_index.insert(key, index);

            let state = (self.factory)(key);
            self.slots.push(StateSlot {
                key,
                state,
                active: false,
                timers: TimerSet::new(),
            });

            self.with_state(index, |state, cx| state.initialize(cx));
        }

        self.drain_requests();
        !any_errors
    }

    /// Forward a frame tick to the current state, if it is active.
    pub fn tick(&mut self, delta_time: f32) {
        let Some(current) = self.current else {
            return;
        };

        if self.slots[current.index].active {
            self.with_state(current.index, |state, cx| state.tick(cx, delta_time));
            self.drain_requests();
        }
    }

    /// Transition to `state` without asking the current state.
    ///
    /// Passing `None` leaves the manager with no current state. A state
    /// spawned by another manager is reported and ignored.
    pub fn force_goto_state(&mut self, state: Option<StateRef<K>>) {
        if let Some(target) = state {
            if !self.owns(target) {
                self.report_foreign("force_goto_state");
                return;
            }
        }

        self.transition(state, TransitionKind::Forced);
        self.drain_requests();
    }

    /// Transition to `state` if the current state allows it.
    ///
    /// Returns false, with no state change, if `state` is `None` and
    /// `allow_null` is false, or if the interruption is refused.
    pub fn try_goto_state(&mut self, state: Option<StateRef<K>>, allow_null: bool) -> bool {
        if state.is_none() && !allow_null {
            return false;
        }

        let allowed = self.allow_interruption(state, "try_goto_state");
        if allowed {
            self.transition(state, TransitionKind::Requested);
        }

        self.drain_requests();
        allowed
    }

    /// Ask whether `state` may interrupt the current state.
    ///
    /// Going to no state is always allowed; a foreign state never is.
    pub fn allow_interruption_by_state(&mut self, state: Option<StateRef<K>>) -> bool {
        let allowed = self.allow_interruption(state, "allow_interruption_by_state");
        self.drain_requests();
        allowed
    }

    /// Advance the timers of every state and dispatch the ones that came due.
    pub fn advance_timers(&mut self, delta_time: f32) {
        let due: Vec<(usize, Vec<TimerHandle>)> = self
            .slots
            .iter_mut()
            .enumerate()
            .map(|(index, slot)| (index, slot.timers.advance(delta_time)))
            .filter(|(_, fired)| !fired.is_empty())
            .collect();

        for (index, fired) in due {
            for timer in fired {
                // An earlier callback may have deactivated this state
                if !self.slots[index].timers.take_due(timer) {
                    continue;
                }
                self.with_state(index, |state, cx| state.on_timer(cx, timer));
                self.drain_requests();
            }
        }
    }

    /// Force-transition to the state at `index`, as received from a peer.
    ///
    /// Returns false, with no state change, for an unknown index.
    pub fn sync_to_index(&mut self, index: Option<usize>) -> bool {
        let target = match index {
            None => None,
            Some(index) => match self.state_for_index(index) {
                Some(state) => Some(state),
                None => {
                    self.report(StateError::UnknownStateIndex {
                        manager: self.name.clone(),
                        index,
                    });
                    return false;
                }
            },
        };

        self.transition(target, TransitionKind::Synced);
        self.drain_requests();
        true
    }

    // Lookups

    /// Index of the state spawned for class `key`.
    pub fn state_index_for_class(&self, key: K) -> Option<usize> {
        self.class_to_index.get(&key).copied()
    }

    /// State spawned for class `key`.
    pub fn state_for_class(&self, key: K) -> Option<StateRef<K>> {
        self.state_index_for_class(key)
            .and_then(|index| self.state_for_index(index))
    }

    /// State at a stable index.
    pub fn state_for_index(&self, index: usize) -> Option<StateRef<K>> {
        self.slots.get(index).map(|slot| StateRef {
            manager: self.id,
            index,
            key: slot.key,
        })
    }

    /// Current state, active or not.
    pub fn current_state(&self) -> Option<StateRef<K>> {
        self.current
    }

    /// Check if `state` was spawned by this manager.
    pub fn owns(&self, state: StateRef<K>) -> bool {
        state.manager == self.id
            && self
                .slots
                .get(state.index)
                .is_some_and(|slot| slot.key == state.key)
    }

    /// Check if `state` belongs to this manager and is active.
    pub fn is_state_active(&self, state: StateRef<K>) -> bool {
        self.owns(state) && self.slots[state.index].active
    }

    /// Borrow a state instance.
    pub fn state(&self, state: StateRef<K>) -> Option<&dyn State<K>> {
        if !self.owns(state) {
            return None;
        }
        Some(self.slots[state.index].state.as_ref())
    }

    /// Handles of all spawned states, in index order.
    pub fn states(&self) -> impl Iterator<Item = StateRef<K>> + '_ {
        (0..self.slots.len()).filter_map(move |index| self.state_for_index(index))
    }

    /// Number of spawned states.
    pub fn state_count(&self) -> usize {
        self.slots.len()
    }

    /// Configured classes, duplicates included.
    pub fn state_classes(&self) -> &[K] {
        &self.state_classes
    }

    /// Number of timers a state has scheduled.
    pub fn pending_timers(&self, state: StateRef<K>) -> usize {
        if !self.owns(state) {
            return 0;
        }
        self.slots[state.index].timers.len()
    }

    /// Check if `initialize` has run.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Identity compared against [`StateRef::manager`].
    pub fn id(&self) -> ManagerId {
        self.id
    }

    /// Name used in log messages and diagnostics.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Everything reported so far, oldest first.
    pub fn diagnostics(&self) -> &[StateError] {
        &self.diagnostics
    }

    /// Recent transitions, oldest first.
    pub fn history(&self) -> &TransitionHistory {
        &self.history
    }

    /// Current state by index, for replication.
    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            current: self.current.map(|state| state.index),
            active: self
                .current
                .is_some_and(|state| self.slots[state.index].active),
        }
    }

    // Internals

    fn allow_interruption(&mut self, state: Option<StateRef<K>>, operation: &'static str) -> bool {
        let Some(candidate) = state else {
            return true;
        };

        if !self.owns(candidate) {
            self.report_foreign(operation);
            return false;
        }

        match self.current {
            Some(current) if self.slots[current.index].active => {
                self.with_state(current.index, |state, cx| {
                    state.allow_interruption_by_state(cx, candidate)
                })
            }
            _ => true,
        }
    }

    /// Swap the current state. `target` must be owned by this manager.
    fn transition(&mut self, target: Option<StateRef<K>>, kind: TransitionKind) {
        let previous = self.current;

        if let Some(old) = previous {
            if self.slots[old.index].active {
                self.with_state(old.index, |state, cx| state.on_interrupt(cx, target));
                // on_interrupt may have left through goto_state already
                if self.slots[old.index].active {
                    self.with_state(old.index, |state, cx| deactivate(state, cx));
                }
            }
            self.with_state(old.index, |state, cx| state.on_end(cx, target));
        }

        self.current = target;
        self.history.push(
            previous.map(|state| state.index),
            target.map(|state| state.index),
            kind,
        );
        log::debug!(
            "state manager \"{}\": {} -> {} ({})",
            self.name,
            describe(previous),
            describe(target),
            kind.as_str()
        );

        if let Some(new) = target {
            self.slots[new.index].active = true;
            self.with_state(new.index, |state, cx| state.on_begin(cx, previous));
        }
    }

    /// Run transitions that states requested through `goto_state`.
    fn drain_requests(&mut self) {
        let mut chained = 0;

        while let Some(target) = self.requests.pop_front() {
            if chained == MAX_CHAINED_TRANSITIONS {
                log::error!(
                    "state manager \"{}\" stopped after {} chained transitions, dropping {} more",
                    self.name,
                    chained,
                    self.requests.len() + 1
                );
                self.requests.clear();
                return;
            }
            chained += 1;
            self.transition(Some(target), TransitionKind::SelfInitiated);
        }
    }

    fn with_state<R>(
        &mut self,
        index: usize,
        hook: impl FnOnce(&mut dyn State<K>, &mut StateContext<'_, K>) -> R,
    ) -> R {
        let slot = &mut self.slots[index];
        let mut cx = StateContext {
            this: StateRef {
                manager: self.id,
                index,
                key: slot.key,
            },
            active: &mut slot.active,
            timers: &mut slot.timers,
            lookup: &self.class_to_index,
            requests: &mut self.requests,
        };
        hook(slot.state.as_mut(), &mut cx)
    }

    fn report_foreign(&mut self, operation: &'static str) {
        self.report(StateError::ForeignState {
            manager: self.name.clone(),
            operation,
        });
    }

    fn report(&mut self, error: StateError) {
        log::warn!("{}", error);
        self.diagnostics.push(error);
    }
}

impl<K: StateKey + Serialize> StateManager<K> {
    /// Manager and state overview for debugging tools.
    pub fn to_json(&self) -> serde_json::Value {
        let states: Vec<serde_json::Value> = self
            .slots
            .iter()
            .enumerate()
            .map(|(index, slot)| {
                serde_json::json!({
                    "index": index,
                    "class": slot.key,
                    "active": slot.active,
                    "pending_timers": slot.timers.len(),
                })
            })
            .collect();

        serde_json::json!({
            "id": self.id.as_u64(),
            "name": self.name,
            "current": self.current.map(|state| state.index),
            "states": states,
        })
    }
}

impl<K: StateKey> fmt::Debug for StateManager<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateManager")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("state_classes", &self.state_classes)
            .field("current", &self.current)
            .field("initialized", &self.initialized)
            .finish_non_exhaustive()
    }
}

fn describe<K: StateKey>(state: Option<StateRef<K>>) -> String {
    match state {
        Some(state) => format!("{:?}", state.key),
        None => "none".to_string(),
    }
}
