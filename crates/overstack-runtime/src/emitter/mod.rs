#![forbid(unsafe_code)]

//! Typed publish/subscribe emitter.
//!
//! An [`Emitter`] routes payloads to handlers by *event kind*. A kind is a
//! marker type implementing [`EventKind`]; its associated `Payload` fixes the
//! shape every handler for that kind receives, so a handler registered for
//! one kind can never observe another kind's payload.
//!
//! ```ignore
//! struct Saved;
//! impl EventKind for Saved {
//!     type Payload = String;
//!     const NAME: &'static str = "saved";
//! }
//!
//! let emitter = Emitter::new();
//! let _sub = emitter.on::<Saved>(|path| println!("saved {path}"));
//! emitter.emit::<Saved>("notes.txt".to_string());
//! ```
//!
//! # Invariants
//!
//! 1. Dispatch is synchronous: `emit` returns after every handler ran.
//! 2. Handlers run in registration order.
//! 3. Only handlers registered when `emit` starts are called for that event.
//! 4. Handlers may subscribe, unsubscribe or emit re-entrantly. A nested
//!    emission is fully delivered before the outer one continues.
//! 5. Events emitted with no handler are dropped; nothing is buffered.
//!
//! # Failure Modes
//!
//! - Handler panic: propagates to the caller of `emit`. Handlers later in
//!   the list do not run for that event.

mod subscription;

pub use subscription::Subscription;

use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::marker::PhantomData;
use std::rc::{Rc, Weak};

use ahash::AHashMap;

/// Marker trait mapping an event kind to its payload type.
pub trait EventKind: 'static {
    /// Payload delivered to handlers of this kind.
    type Payload: 'static;

    /// Human-readable kind name, used in logs.
    const NAME: &'static str;
}

struct Handler<P> {
    callback: Box<dyn Fn(&P)>,
}

struct Topic<P> {
    handlers: RefCell<Vec<Weak<Handler<P>>>>,
}

impl<P: 'static> Topic<P> {
    fn new() -> Self {
        Self {
            handlers: RefCell::new(Vec::new()),
        }
    }

    fn snapshot(&self) -> Vec<Weak<Handler<P>>> {
        self.handlers.borrow().clone()
    }

    fn prune(&self) {
        self.handlers.borrow_mut().retain(|h| h.strong_count() > 0);
    }

    fn live_count(&self) -> usize {
        self.handlers
            .borrow()
            .iter()
            .filter(|h| h.strong_count() > 0)
            .count()
    }
}

#[derive(Default)]
struct EmitterInner {
    topics: RefCell<AHashMap<TypeId, Rc<dyn Any>>>,
}

/// Shared, single-threaded typed emitter.
///
/// Cloning an `Emitter` yields another handle to the same topics.
#[derive(Clone, Default)]
pub struct Emitter {
    inner: Rc<EmitterInner>,
}

impl Emitter {
    /// Create an emitter with no topics.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn topic<K: EventKind>(&self) -> Rc<Topic<K::Payload>> {
        let mut topics = self.inner.topics.borrow_mut();
        let entry = topics
            .entry(TypeId::of::<K>())
            .or_insert_with(|| Rc::new(Topic::<K::Payload>::new()) as Rc<dyn Any>);
        match Rc::clone(entry).downcast::<Topic<K::Payload>>() {
            Ok(topic) => topic,
            // Keyed by the kind's TypeId, so the stored topic always has the
            // kind's payload type.
            Err(_) => unreachable!("topic payload type mismatch for {}", K::NAME),
        }
    }

    fn existing_topic<K: EventKind>(&self) -> Option<Rc<Topic<K::Payload>>> {
        let topics = self.inner.topics.borrow();
        let entry = topics.get(&TypeId::of::<K>())?;
        Rc::clone(entry).downcast::<Topic<K::Payload>>().ok()
    }

    /// Register `callback` for events of kind `K`.
    ///
    /// The handler stays registered until the returned [`Subscription`] is
    /// dropped.
    pub fn on<K: EventKind>(&self, callback: impl Fn(&K::Payload) + 'static) -> Subscription {
        let handler = Rc::new(Handler {
            callback: Box::new(callback),
        });
        self.topic::<K>()
            .handlers
            .borrow_mut()
            .push(Rc::downgrade(&handler));
        Subscription::new(handler, K::NAME)
    }

    /// Deliver `payload` to every handler currently registered for `K`.
    ///
    /// Returns the number of handlers that ran.
    pub fn emit<K: EventKind>(&self, payload: K::Payload) -> usize {
        let Some(topic) = self.existing_topic::<K>() else {
            tracing::trace!(kind = K::NAME, "emit with no topic; dropped");
            return 0;
        };

        let mut delivered = 0;
        let mut stale = false;
        for weak in topic.snapshot() {
            match weak.upgrade() {
                Some(handler) => {
                    (handler.callback)(&payload);
                    delivered += 1;
                }
                None => stale = true,
            }
        }
        if stale {
            topic.prune();
        }
        tracing::trace!(kind = K::NAME, delivered, "emit");
        delivered
    }

    /// Number of live handlers for kind `K`.
    #[must_use]
    pub fn handler_count<K: EventKind>(&self) -> usize {
        self.existing_topic::<K>()
            .map_or(0, |topic| topic.live_count())
    }

    /// Whether any live handler listens to kind `K`.
    #[must_use]
    pub fn has_handlers<K: EventKind>(&self) -> bool {
        self.handler_count::<K>() > 0
    }

    /// Forget every topic. Outstanding subscriptions become inert.
    pub fn clear(&self) {
        self.inner.topics.borrow_mut().clear();
    }

    /// Whether two handles point at the same emitter.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl std::fmt::Debug for Emitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Emitter")
            .field("topics", &self.inner.topics.borrow().len())
            .finish()
    }
}

/// Zero-sized helper for declaring event kinds generic over a type parameter.
///
/// `PhantomData<fn() -> T>` keeps the marker `Send + Sync` and covariant
/// regardless of `T`.
pub type KindMarker<T> = PhantomData<fn() -> T>;
