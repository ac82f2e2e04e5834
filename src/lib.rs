//! Actor State Library
//!
//! This crate provides a data-driven finite state machine for driving actor
//! behavior from a game loop.
//!
//! # Overview
//!
//! - **States** - Behavioral units implementing the [`State`] trait. Every
//!   lifecycle hook has a default body, so a state only overrides what it needs.
//!
//! - **State Manager** - Owns one instance of every configured state class,
//!   tracks the current one and arbitrates transitions with interruption
//!   negotiation.
//!
//! - **Scoped Timers** - Each state owns its timers; they are cancelled the
//!   moment the state becomes inactive.
//!
//! - **Replication** - Current state is addressable by a stable index, so a
//!   peer can mirror it from a [`StateSnapshot`].
//!
//! # Design Principles
//!
//! 1. **Single threaded** - Everything runs synchronously on the thread that
//!    ticks the owning actor. No locks.
//!
//! 2. **Misuse is reported, not fatal** - Duplicate classes or handles from
//!    another manager are logged and recorded as diagnostics; the manager
//!    carries on unchanged.
//!
//! 3. **States are reused** - Instances are created once at initialization and
//!    live as long as their manager.
//!
//! # Example
//!
//! ```rust
//! use actor_state::{State, StateClass, StateContext, StateManager};
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
//! enum Guard {
//!     Patrol,
//!     Chase,
//! }
//!
//! struct Patrol;
//!
//! impl State<Guard> for Patrol {
//!     fn tick(&mut self, cx: &mut StateContext<'_, Guard>, _delta_time: f32) {
//!         // Saw something
//!         self.goto_state(cx, Guard::Chase);
//!     }
//! }
//!
//! struct Chase;
//!
//! impl State<Guard> for Chase {}
//!
//! impl StateClass for Guard {
//!     fn instantiate(self) -> Box<dyn State<Self>> {
//!         match self {
//!             Guard::Patrol => Box::new(Patrol),
//!             Guard::Chase => Box::new(Chase),
//!         }
//!     }
//! }
//!
//! let mut guard = StateManager::new([Guard::Patrol, Guard::Chase]);
//! assert!(guard.initialize());
//!
//! assert!(guard.try_goto_state(guard.state_for_class(Guard::Patrol), false));
//! guard.tick(0.016);
//!
//! assert_eq!(guard.current_state().map(|s| s.key()), Some(Guard::Chase));
//! ```

pub mod state;

// Re-export everything from state module at crate root
pub use state::*;
