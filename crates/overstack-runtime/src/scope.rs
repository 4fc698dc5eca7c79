#![forbid(unsafe_code)]

//! Lifetime management for groups of subscriptions.
//!
//! A [`SubscriptionScope`] collects the subscriptions that belong to one
//! logical owner (a controller, a view, a test) so they are all released
//! together when the owner goes away.
//!
//! # Invariants
//!
//! 1. Subscriptions are released in reverse registration order on drop.
//! 2. After drop or `clear()`, no handler from this scope fires again.
//! 3. `clear()` leaves the scope empty and reusable.

use crate::emitter::{Emitter, EventKind, Subscription};

/// Owns a set of subscriptions and releases them together.
#[derive(Default)]
pub struct SubscriptionScope {
    subscriptions: Vec<Subscription>,
}

impl SubscriptionScope {
    /// Create an empty scope.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep an existing subscription alive for the lifetime of the scope.
    pub fn hold(&mut self, sub: Subscription) {
        self.subscriptions.push(sub);
    }

    /// Subscribe to `K` on `emitter` within this scope.
    pub fn on<K: EventKind>(
        &mut self,
        emitter: &Emitter,
        callback: impl Fn(&K::Payload) + 'static,
    ) -> &mut Self {
        self.subscriptions.push(emitter.on::<K>(callback));
        self
    }

    /// Number of held subscriptions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    /// Whether the scope holds nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    /// Release every subscription now.
    pub fn clear(&mut self) {
        while self.subscriptions.pop().is_some() {}
    }
}

impl Drop for SubscriptionScope {
    fn drop(&mut self) {
        self.clear();
    }
}

impl std::fmt::Debug for SubscriptionScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionScope")
            .field("len", &self.subscriptions.len())
            .finish()
    }
}
