#![forbid(unsafe_code)]

//! RAII handle for an emitter registration.

use std::any::Any;
use std::rc::Rc;

/// Keeps a handler registered for as long as it is alive.
///
/// Topics only hold weak references to their handlers, so dropping the
/// `Subscription` is all it takes to unsubscribe. Stale entries are pruned
/// lazily on the next emission.
///
/// Dropping a subscription from inside its own handler is allowed: the
/// dispatch loop holds a temporary strong reference for the duration of the
/// call, so the handler finishes normally and is skipped from then on.
#[must_use = "dropping a subscription unsubscribes its handler"]
pub struct Subscription {
    handler: Option<Rc<dyn Any>>,
    kind: &'static str,
}

impl Subscription {
    pub(crate) fn new(handler: Rc<dyn Any>, kind: &'static str) -> Self {
        Self {
            handler: Some(handler),
            kind,
        }
    }

    /// Name of the event kind this subscription listens to.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        self.kind
    }

    /// Whether the handler is still registered.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.handler.is_some()
    }

    /// Unsubscribe now. Equivalent to dropping, but keeps the handle around.
    pub fn unsubscribe(&mut self) {
        self.handler = None;
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("kind", &self.kind)
            .field("active", &self.is_active())
            .finish()
    }
}
