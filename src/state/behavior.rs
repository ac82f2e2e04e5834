//! State behavior contract.
//!
//! A state is a single behavioral unit driven by its [`StateManager`]:
//!
//! ```text
//!   ┌───────────────┐  initialize   ┌──────────┐   on_begin    ┌──────────┐
//!   │ Uninitialized │──────────────▶│ Inactive │──────────────▶│  Active  │
//!   └───────────────┘               └──────────┘               └────┬─────┘
//!                                        ▲                          │
//!                                        │     become_inactive      │
//!                                        └──────────────────────────┘
//! ```
//!
//! Every hook receives a [`StateContext`] giving access to the state's own
//! active flag, its timers and its sibling states.
//!
//! [`StateManager`]: super::StateManager

use std::collections::{HashMap, VecDeque};

use super::handle::{ManagerId, StateKey, StateRef};
use super::timer::{TimerHandle, TimerSet};

/// Lifecycle hooks of a state.
///
/// All hooks have default bodies. The defaults of `allow_interruption_by_state`,
/// `on_begin`, `on_interrupt` and `tick` assert that the state is active.
pub trait State<K: StateKey> {
    /// One-time setup, called by the manager right after construction.
    fn initialize(&mut self, cx: &mut StateContext<'_, K>) {
        let _ = cx;
    }

    /// Should `candidate` be allowed to interrupt this state mid run?
    ///
    /// Only consulted by requested transitions; a forced transition ignores it.
    fn allow_interruption_by_state(
        &mut self,
        cx: &mut StateContext<'_, K>,
        candidate: StateRef<K>,
    ) -> bool {
        let _ = candidate;
        debug_assert!(cx.is_active(), "{} asked about interruption while inactive", cx.this());
        true
    }

    /// Called right after this state became current and active.
    fn on_begin(&mut self, cx: &mut StateContext<'_, K>, previous: Option<StateRef<K>>) {
        let _ = previous;
        debug_assert!(cx.is_active(), "{} began while inactive", cx.this());
    }

    /// Called while still active, when a transition away from this state starts.
    fn on_interrupt(&mut self, cx: &mut StateContext<'_, K>, interruptor: Option<StateRef<K>>) {
        let _ = interruptor;
        debug_assert!(cx.is_active(), "{} interrupted while inactive", cx.this());
    }

    /// Called whenever this state stops being current, even if it was
    /// already inactive.
    fn on_end(&mut self, cx: &mut StateContext<'_, K>, next: Option<StateRef<K>>) {
        let _ = (cx, next);
    }

    /// Called as the state becomes inactive. All timers of this state are
    /// cleared right after it returns, so don't set any here.
    fn on_become_inactive(&mut self, cx: &mut StateContext<'_, K>) {
        let _ = cx;
    }

    /// Called once per frame while this state is current and active.
    fn tick(&mut self, cx: &mut StateContext<'_, K>, delta_time: f32) {
        let _ = delta_time;
        debug_assert!(cx.is_active(), "{} ticked while inactive", cx.this());
    }

    /// Called when a timer set by this state comes due.
    fn on_timer(&mut self, cx: &mut StateContext<'_, K>, timer: TimerHandle) {
        let _ = (cx, timer);
    }

    /// End this state's active period.
    fn become_inactive(&mut self, cx: &mut StateContext<'_, K>)
    where
        Self: Sized,
    {
        deactivate(self, cx);
    }

    /// Leave this state for the sibling of class `key`.
    ///
    /// Returns false, and changes nothing, if the manager has no such state.
    fn goto_state(&mut self, cx: &mut StateContext<'_, K>, key: K) -> bool
    where
        Self: Sized,
    {
        goto(self, cx, key)
    }
}

/// State keys that know how to build their own state instance.
pub trait StateClass: StateKey {
    /// Build a fresh state instance of this class.
    fn instantiate(self) -> Box<dyn State<Self>>;
}

/// Deactivate `state`: clear the flag, run `on_become_inactive`, drop its timers.
///
/// Every active period ends here.
pub(crate) fn deactivate<K, S>(state: &mut S, cx: &mut StateContext<'_, K>)
where
    K: StateKey,
    S: State<K> + ?Sized,
{
    *cx.active = false;
    state.on_become_inactive(cx);
    let dropped = cx.timers.clear_all();
    if dropped > 0 {
        log::debug!("{} became inactive, cleared {} timer(s)", cx.this, dropped);
    }
}

pub(crate) fn goto<K, S>(state: &mut S, cx: &mut StateContext<'_, K>, key: K) -> bool
where
    K: StateKey,
    S: State<K> + ?Sized,
{
    let Some(target) = cx.state_for_class(key) else {
        return false;
    };

    deactivate(state, cx);
    cx.requests.push_back(target);
    true
}

/// View of the manager handed to a state while one of its hooks runs.
pub struct StateContext<'a, K: StateKey> {
    pub(crate) this: StateRef<K>,
    pub(crate) active: &'a mut bool,
    pub(crate) timers: &'a mut TimerSet,
    pub(crate) lookup: &'a HashMap<K, usize>,
    pub(crate) requests: &'a mut VecDeque<StateRef<K>>,
}

impl<'a, K: StateKey> StateContext<'a, K> {
    /// Handle of the state receiving the hook.
    pub fn this(&self) -> StateRef<K> {
        self.this
    }

    /// Class of the state receiving the hook.
    pub fn key(&self) -> K {
        self.this.key
    }

    /// Manager owning this state.
    pub fn manager(&self) -> ManagerId {
        self.this.manager
    }

    /// Check if the state receiving the hook is active.
    pub fn is_active(&self) -> bool {
        *self.active
    }

    /// Look up a sibling state by class.
    pub fn state_for_class(&self, key: K) -> Option<StateRef<K>> {
        self.lookup.get(&key).map(|&index| StateRef {
            manager: self.this.manager,
            index,
            key,
        })
    }

    /// Schedule a timer owned by this state.
    pub fn set_timer(&mut self, delay: f32, looping: bool) -> TimerHandle {
        self.timers.set(delay, looping)
    }

    /// Cancel one of this state's timers. Returns true if it was outstanding.
    pub fn clear_timer(&mut self, timer: TimerHandle) -> bool {
        self.timers.clear(timer)
    }

    /// Check if a timer is still scheduled.
    pub fn is_timer_pending(&self, timer: TimerHandle) -> bool {
        self.timers.is_pending(timer)
    }

    /// Seconds until a pending timer fires.
    pub fn timer_remaining(&self, timer: TimerHandle) -> Option<f32> {
        self.timers.remaining(timer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum Key {
        Idle,
        Walking,
        Running,
    }

    #[derive(Default)]
    struct Counter {
        became_inactive: usize,
    }

    impl State<Key> for Counter {
        fn on_become_inactive(&mut self, cx: &mut StateContext<'_, Key>) {
            assert!(!cx.is_active());
            self.became_inactive += 1;
        }
    }

    /// Relies on every built-in hook body.
    struct Plain;

    impl State<Key> for Plain {}

    struct Parts {
        active: bool,
        timers: TimerSet,
        lookup: HashMap<Key, usize>,
        requests: VecDeque<StateRef<Key>>,
        manager: ManagerId,
    }

    impl Parts {
        fn new() -> Self {
            let mut lookup = HashMap::new();
            lookup.insert(Key::Idle, 0);
            lookup.insert(Key::Walking, 1);
            Self {
                active: true,
                timers: TimerSet::new(),
                lookup,
                requests: VecDeque::new(),
                manager: ManagerId::next(),
            }
        }

        fn inactive() -> Self {
            Self {
                active: false,
                ..Self::new()
            }
        }

        fn sibling(&self, key: Key) -> StateRef<Key> {
            StateRef {
                manager: self.manager,
                index: self.lookup[&key],
                key,
            }
        }

        fn cx(&mut self) -> StateContext<'_, Key> {
            StateContext {
                this: StateRef {
                    manager: self.manager,
                    index: 0,
                    key: Key::Idle,
                },
                active: &mut self.active,
                timers: &mut self.timers,
                lookup: &self.lookup,
                requests: &mut self.requests,
            }
        }
    }

    #[test]
    fn test_become_inactive_clears_timers() {
        let mut parts = Parts::new();
        let mut counter = Counter::default();

        {
            let mut cx = parts.cx();
            let timer = cx.set_timer(1.0, true);
            assert!(cx.is_timer_pending(timer));
            counter.become_inactive(&mut cx);
            assert!(!cx.is_timer_pending(timer));
        }

        assert!(!parts.active);
        assert!(parts.timers.is_empty());
        assert_eq!(counter.became_inactive, 1);
    }

    #[test]
    fn test_goto_known_sibling() {
        let mut parts = Parts::new();
        let mut counter = Counter::default();

        assert!(counter.goto_state(&mut parts.cx(), Key::Walking));

        assert!(!parts.active);
        assert_eq!(counter.became_inactive, 1);
        assert_eq!(parts.requests.len(), 1);
        assert_eq!(parts.requests[0].key(), Key::Walking);
        assert_eq!(parts.requests[0].index(), 1);
        assert_eq!(parts.requests[0].manager(), parts.manager);
    }

    #[test]
    fn test_goto_unknown_sibling_is_noop() {
        let mut parts = Parts::new();
        let mut counter = Counter::default();

        assert!(!counter.goto_state(&mut parts.cx(), Key::Running));

        assert!(parts.active);
        assert_eq!(counter.became_inactive, 0);
        assert!(parts.requests.is_empty());
    }

    #[test]
    fn test_context_lookup() {
        let mut parts = Parts::new();
        let cx = parts.cx();

        assert_eq!(cx.key(), Key::Idle);
        assert!(cx.state_for_class(Key::Idle).is_some());
        assert!(cx.state_for_class(Key::Running).is_none());
    }

    #[test]
    #[should_panic(expected = "ticked while inactive")]
    fn test_default_tick_requires_active() {
        let mut parts = Parts::inactive();
        Plain.tick(&mut parts.cx(), 0.1);
    }

    #[test]
    #[should_panic(expected = "interrupted while inactive")]
    fn test_default_on_interrupt_requires_active() {
        let mut parts = Parts::inactive();
        Plain.on_interrupt(&mut parts.cx(), None);
    }

    #[test]
    #[should_panic(expected = "began while inactive")]
    fn test_default_on_begin_requires_active() {
        let mut parts = Parts::inactive();
        Plain.on_begin(&mut parts.cx(), None);
    }

    #[test]
    #[should_panic(expected = "asked about interruption while inactive")]
    fn test_default_allow_interruption_requires_active() {
        let mut parts = Parts::inactive();
        let walking = parts.sibling(Key::Walking);
        Plain.allow_interruption_by_state(&mut parts.cx(), walking);
    }

    #[test]
    fn test_default_hooks_while_active() {
        let mut parts = Parts::new();
        let walking = parts.sibling(Key::Walking);
        let mut cx = parts.cx();

        Plain.on_begin(&mut cx, None);
        assert!(Plain.allow_interruption_by_state(&mut cx, walking));
        Plain.tick(&mut cx, 0.1);
        Plain.on_interrupt(&mut cx, Some(walking));
    }

    #[test]
    fn test_default_teardown_hooks_allow_inactive() {
        let mut parts = Parts::inactive();
        let walking = parts.sibling(Key::Walking);

        {
            let mut cx = parts.cx();
            Plain.on_become_inactive(&mut cx);
            Plain.on_end(&mut cx, Some(walking));
            Plain.initialize(&mut cx);
        }

        assert!(!parts.active);
        assert!(parts.requests.is_empty());
    }
}
