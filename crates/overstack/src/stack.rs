#![forbid(unsafe_code)]

//! Overlay stack controller.
//!
//! The [`StackController`] owns the ordered list of overlay instances. It
//! listens to the command kinds on the overlay [`Emitter`], applies each one
//! as a state transition, and publishes a [`ModalChanged`] notice for every
//! instance that opened or started closing.
//!
//! # Invariants
//!
//! - List order is insertion order; the last element is painted on top.
//! - Instance keys are unique for the life of the process.
//! - Phases only move forward: `Open → Closing → Closed (removed)`.
//! - A replace closes at most one instance: the open one nearest the end.
//! - The sweep timer is armed iff at least one instance is `Closing`.
//!
//! # Failure Modes
//!
//! - A command naming an overlay missing from the registry (only possible
//!   when emitting on the bus directly) is logged and dropped.
//! - `pop` with no matching instance and `pop_all` on an empty list change
//!   nothing and publish nothing.
//! - `unmounted()` for an open or unknown key returns `None`.

use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use overstack_runtime::{Clock, Emitter, Instant, IntervalTimer, SubscriptionScope};

use crate::config::StackConfig;
use crate::events::{
    ChangeNotice, ModalChanged, OpenCommand, PopAllModals, PopCommand, PopModal, PushModal,
    ReplaceModal,
};
use crate::options::OverlayOptions;
use crate::props::Props;
use crate::registry::OverlayRegistry;

/// Global counter for instance keys.
static INSTANCE_KEY_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Process-unique identifier of an overlay instance.
///
/// Keys are handed out by a monotonic counter, so comparing two keys tells
/// which instance was created first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceKey(u64);

impl InstanceKey {
    fn next() -> Self {
        Self(INSTANCE_KEY_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw key value.
    #[inline]
    pub const fn id(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for InstanceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "overlay-{}", self.0)
    }
}

/// Lifecycle phase of an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Visible and interactive.
    Open,
    /// Close requested; still mounted so the wrapper can animate out.
    Closing,
    /// Removed from the list. Only seen on instances handed back by
    /// [`StackController::unmounted`].
    Closed,
}

/// One live occurrence of an overlay.
pub struct OverlayInstance<V> {
    key: InstanceKey,
    name: &'static str,
    props: Props,
    phase: Phase,
    closed_at: Option<Instant>,
    options: OverlayOptions<V>,
}

impl<V> OverlayInstance<V> {
    #[must_use]
    pub fn key(&self) -> InstanceKey {
        self.key
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub fn props(&self) -> &Props {
        &self.props
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.phase == Phase::Open
    }

    /// When the close was requested, if it was.
    #[must_use]
    pub fn closed_at(&self) -> Option<Instant> {
        self.closed_at
    }

    /// Effective options: instance options merged over the definition's.
    #[must_use]
    pub fn options(&self) -> &OverlayOptions<V> {
        &self.options
    }

    fn notice(&self) -> ChangeNotice {
        ChangeNotice {
            name: self.name,
            open: self.is_open(),
            props: self.props.clone(),
        }
    }
}

impl<V> Clone for OverlayInstance<V> {
    fn clone(&self) -> Self {
        Self {
            key: self.key,
            name: self.name,
            props: self.props.clone(),
            phase: self.phase,
            closed_at: self.closed_at,
            options: self.options.clone(),
        }
    }
}

impl<V> std::fmt::Debug for OverlayInstance<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OverlayInstance")
            .field("key", &self.key)
            .field("name", &self.name)
            .field("props", &self.props)
            .field("phase", &self.phase)
            .field("closed_at", &self.closed_at)
            .finish()
    }
}

struct StackState<V> {
    /// Instances in paint order (bottom to top).
    instances: Vec<OverlayInstance<V>>,
    registry: Rc<OverlayRegistry<V>>,
    config: StackConfig,
    clock: Rc<dyn Clock>,
    sweep: IntervalTimer,
    version: u64,
}

impl<V: 'static> StackState<V> {
    fn instantiate(&self, command: &OpenCommand<V>, kind: &'static str) -> Option<OverlayInstance<V>> {
        let Some(definition) = self.registry.get(command.name) else {
            tracing::warn!(
                name = command.name,
                command = kind,
                "command for unregistered overlay dropped"
            );
            return None;
        };
        Some(OverlayInstance {
            key: InstanceKey::next(),
            name: definition.name(),
            props: command.props.clone(),
            phase: Phase::Open,
            closed_at: None,
            options: command.options.merged_over(definition.default_options()),
        })
    }

    fn append(&mut self, instance: OverlayInstance<V>) -> ChangeNotice {
        tracing::debug!(
            key = instance.key.id(),
            name = instance.name,
            depth = self.instances.len() + 1,
            "overlay opened"
        );
        let notice = instance.notice();
        self.instances.push(instance);
        self.version += 1;
        notice
    }

    fn begin_close(&mut self, index: usize, now: Instant) -> ChangeNotice {
        let instance = &mut self.instances[index];
        instance.phase = Phase::Closing;
        instance.closed_at = Some(now);
        tracing::debug!(key = instance.key.id(), name = instance.name, "overlay closing");
        let notice = instance.notice();
        self.version += 1;
        if self.sweep.arm(now) {
            tracing::trace!("sweep armed");
        }
        notice
    }

    fn after_close(&mut self, now: Instant) {
        if self.config.grace_window.is_zero() {
            self.collect_expired(now);
        }
    }

    fn push(&mut self, command: &OpenCommand<V>) -> Vec<ChangeNotice> {
        match self.instantiate(command, "push") {
            Some(instance) => vec![self.append(instance)],
            None => Vec::new(),
        }
    }

    fn replace(&mut self, command: &OpenCommand<V>) -> Vec<ChangeNotice> {
        let Some(instance) = self.instantiate(command, "replace") else {
            return Vec::new();
        };
        let now = self.clock.now();
        self.collect_expired(now);

        let mut notices = Vec::with_capacity(2);
        if let Some(index) = self.instances.iter().rposition(OverlayInstance::is_open) {
            notices.push(self.begin_close(index, now));
        }
        self.after_close(now);
        notices.push(self.append(instance));
        notices
    }

    fn pop(&mut self, command: PopCommand) -> Vec<ChangeNotice> {
        let index = match command.name {
            Some(name) => self
                .instances
                .iter()
                .rposition(|i| i.name == name && i.is_open()),
            None => self.instances.len().checked_sub(1),
        };
        let Some(index) = index else {
            tracing::trace!(name = ?command.name, "pop matched nothing");
            return Vec::new();
        };
        if !self.instances[index].is_open() {
            tracing::trace!(
                key = self.instances[index].key.id(),
                "pop target already closing"
            );
            return Vec::new();
        }
        let now = self.clock.now();
        let notice = self.begin_close(index, now);
        self.after_close(now);
        vec![notice]
    }

    fn pop_all(&mut self) -> Vec<ChangeNotice> {
        let now = self.clock.now();
        let mut notices = Vec::new();
        let mut restamped = false;
        for index in 0..self.instances.len() {
            if self.instances[index].is_open() {
                notices.push(self.begin_close(index, now));
            } else {
                // Already closing: the grace window restarts from now.
                self.instances[index].closed_at = Some(now);
                restamped = true;
            }
        }
        if restamped && notices.is_empty() {
            self.version += 1;
        }
        if !self.instances.is_empty() {
            self.after_close(now);
        }
        notices
    }

    /// Drop closing instances whose grace window elapsed.
    fn collect_expired(&mut self, now: Instant) -> usize {
        let grace = self.config.grace_window;
        let before = self.instances.len();
        self.instances.retain(|instance| {
            let expired = instance.phase == Phase::Closing
                && instance
                    .closed_at
                    .is_some_and(|at| now.saturating_duration_since(at) >= grace);
            if expired {
                tracing::debug!(key = instance.key.id(), name = instance.name, "overlay collected");
            }
            !expired
        });
        let removed = before - self.instances.len();
        if removed > 0 {
            self.version += 1;
        }
        self.sync_sweep();
        removed
    }

    fn remove_closing(&mut self, key: InstanceKey) -> Option<OverlayInstance<V>> {
        let index = self
            .instances
            .iter()
            .position(|i| i.key == key && i.phase == Phase::Closing)?;
        let mut instance = self.instances.remove(index);
        instance.phase = Phase::Closed;
        tracing::debug!(key = key.id(), name = instance.name, "overlay unmounted");
        self.version += 1;
        self.sync_sweep();
        Some(instance)
    }

    fn sync_sweep(&mut self) {
        let closing = self.instances.iter().any(|i| i.phase == Phase::Closing);
        if !closing && self.sweep.disarm() {
            tracing::trace!("sweep disarmed");
        }
    }
}

fn publish(emitter: &Emitter, notices: Vec<ChangeNotice>) {
    for notice in notices {
        emitter.emit::<ModalChanged>(notice);
    }
}

/// Stateful core: the ordered overlay instance list.
///
/// The controller is mounted on an emitter for as long as it lives; dropping
/// it unsubscribes, after which commands are dropped unheard.
pub struct StackController<V: 'static> {
    state: Rc<RefCell<StackState<V>>>,
    _subscriptions: SubscriptionScope,
}

impl<V: 'static> StackController<V> {
    /// Subscribe a new, empty controller to `emitter`.
    pub fn mount(
        emitter: &Emitter,
        registry: Rc<OverlayRegistry<V>>,
        config: StackConfig,
        clock: Rc<dyn Clock>,
    ) -> Self {
        let state = Rc::new(RefCell::new(StackState {
            instances: Vec::new(),
            registry,
            sweep: IntervalTimer::new(config.sweep_interval),
            config,
            clock,
            version: 0,
        }));

        let mut scope = SubscriptionScope::new();
        scope
            .on::<PushModal<V>>(
                emitter,
                handler(&state, emitter, |s, command: &OpenCommand<V>| s.push(command)),
            )
            .on::<ReplaceModal<V>>(
                emitter,
                handler(&state, emitter, |s, command: &OpenCommand<V>| {
                    s.replace(command)
                }),
            )
            .on::<PopModal>(
                emitter,
                handler(&state, emitter, |s, command: &PopCommand| s.pop(*command)),
            )
            .on::<PopAllModals>(emitter, handler(&state, emitter, |s, _: &()| s.pop_all()));
        tracing::debug!("stack controller mounted");

        Self {
            state,
            _subscriptions: scope,
        }
    }

    /// Snapshot of the instance list, bottom to top.
    #[must_use]
    pub fn instances(&self) -> Vec<OverlayInstance<V>> {
        self.state.borrow().instances.clone()
    }

    /// Instance with `key`, if still in the list.
    #[must_use]
    pub fn get(&self, key: InstanceKey) -> Option<OverlayInstance<V>> {
        self.state
            .borrow()
            .instances
            .iter()
            .find(|i| i.key == key)
            .cloned()
    }

    /// Topmost instance regardless of phase.
    #[must_use]
    pub fn top(&self) -> Option<OverlayInstance<V>> {
        self.state.borrow().instances.last().cloned()
    }

    /// Whether any instance named `name` is open.
    #[must_use]
    pub fn is_open(&self, name: &str) -> bool {
        self.state
            .borrow()
            .instances
            .iter()
            .any(|i| i.name == name && i.is_open())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.state.borrow().instances.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.borrow().instances.is_empty()
    }

    /// Number of instances in phase `Open`.
    #[must_use]
    pub fn open_count(&self) -> usize {
        self.state
            .borrow()
            .instances
            .iter()
            .filter(|i| i.is_open())
            .count()
    }

    /// Counter bumped on every list mutation.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.state.borrow().version
    }

    #[must_use]
    pub fn config(&self) -> StackConfig {
        self.state.borrow().config
    }

    /// When the host should call [`tick`](Self::tick) next. `None` while
    /// nothing is closing.
    #[must_use]
    pub fn next_sweep_at(&self) -> Option<Instant> {
        self.state.borrow().sweep.deadline()
    }

    /// Advance the sweep timer; collects expired instances when it fires.
    ///
    /// Returns the number of instances removed.
    pub fn tick(&self) -> usize {
        let mut state = self.state.borrow_mut();
        let now = state.clock.now();
        if !state.sweep.poll(now) {
            return 0;
        }
        tracing::trace!(depth = state.instances.len(), "sweep tick");
        state.collect_expired(now)
    }

    /// Collect expired instances now, ignoring the timer.
    pub fn sweep(&self) -> usize {
        let mut state = self.state.borrow_mut();
        let now = state.clock.now();
        state.collect_expired(now)
    }

    /// Signal from the rendering boundary that `key` finished its exit
    /// transition. Removes it if it is closing.
    pub fn unmounted(&self, key: InstanceKey) -> Option<OverlayInstance<V>> {
        self.state.borrow_mut().remove_closing(key)
    }
}

impl<V: 'static> std::fmt::Debug for StackController<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("StackController")
            .field("instances", &state.instances)
            .field("version", &state.version)
            .field("sweep_armed", &state.sweep.is_armed())
            .finish()
    }
}

/// Wrap a transition as an emitter handler. The state borrow is released
/// before notices go out, so observers may issue new commands.
fn handler<V: 'static, P: 'static>(
    state: &Rc<RefCell<StackState<V>>>,
    emitter: &Emitter,
    transition: impl Fn(&mut StackState<V>, &P) -> Vec<ChangeNotice> + 'static,
) -> impl Fn(&P) + 'static {
    let weak: Weak<RefCell<StackState<V>>> = Rc::downgrade(state);
    let emitter = emitter.clone();
    move |payload: &P| {
        let Some(state) = weak.upgrade() else {
            return;
        };
        let notices = transition(&mut state.borrow_mut(), payload);
        publish(&emitter, notices);
    }
}
