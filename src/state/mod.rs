//! State machine module.
//!
//! - `handle` - Manager identity and state handles
//! - `behavior` - The `State` trait and the context passed to its hooks
//! - `manager` - The `StateManager` that owns states and switches between them
//! - `timer` - Timers scoped to a single state
//! - `history` - Transition records and replication snapshots
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                         StateManager<K>                           │
//! │                                                                   │
//! │  state_classes: [Idle, Walking, Running]   (configuration)        │
//! │                                                                   │
//! │  class_to_index        slots (one per class)                      │
//! │  ┌──────────────┐      ┌──────────────────────────────────────┐  │
//! │  │ Idle    → 0  │      │ 0: Box<dyn State>, active, TimerSet │  │
//! │  │ Walking → 1  │─────▶│ 1: Box<dyn State>, active, TimerSet │  │
//! │  │ Running → 2  │      │ 2: Box<dyn State>, active, TimerSet │  │
//! │  └──────────────┘      └──────────────────────────────────────┘  │
//! │                                        ▲                          │
//! │  current: Option<StateRef> ────────────┘                          │
//! │                                                                   │
//! │  requests: queued goto_state calls, drained after each hook       │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! States never hold a reference to the manager. Each hook gets a
//! [`StateContext`] instead, which is how a state reads its own flag, sets
//! timers and asks to move to a sibling.

pub mod behavior;
pub mod handle;
pub mod history;
pub mod manager;
pub mod timer;

// Re-export commonly used types
pub use behavior::{State, StateClass, StateContext};
pub use handle::{ManagerId, StateKey, StateRef};
pub use history::{
    StateSnapshot, TransitionHistory, TransitionKind, TransitionRecord, DEFAULT_HISTORY_LEN,
};
pub use manager::{
    StateError, StateManager, StateManagerConfig, DEFAULT_MANAGER_NAME, MAX_CHAINED_TRANSITIONS,
};
pub use timer::{TimerHandle, TimerSet};
