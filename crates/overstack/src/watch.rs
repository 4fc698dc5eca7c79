#![forbid(unsafe_code)]

//! Lifecycle-scoped change subscription.
//!
//! A [`ModalWatch`] lives inside a long-lived component. Every render calls
//! [`watch`](ModalWatch::watch) with the current target and callback; the
//! subscription is only replaced when one of them actually changes, and it
//! is released when the watch is dropped.

use std::rc::Rc;

use overstack_runtime::{Emitter, Subscription};

use crate::facade::{ChangeCallback, ModalTarget, Modals};

struct Watched {
    emitter: Emitter,
    target: ModalTarget,
    callback: ChangeCallback,
    _subscription: Subscription,
}

/// Holds at most one change subscription.
#[derive(Default)]
pub struct ModalWatch {
    current: Option<Watched>,
}

impl ModalWatch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Watch `target` with `callback`, re-subscribing only if the target,
    /// the callback identity or the emitter changed.
    ///
    /// Returns `true` when a new subscription was made.
    pub fn watch<V: 'static>(
        &mut self,
        modals: &Modals<V>,
        target: impl Into<ModalTarget>,
        callback: &ChangeCallback,
    ) -> bool {
        let target = target.into();
        if let Some(current) = &self.current
            && current.target == target
            && current.emitter.ptr_eq(modals.emitter())
            && std::ptr::addr_eq(Rc::as_ptr(&current.callback), Rc::as_ptr(callback))
        {
            return false;
        }

        self.release();
        let forward = Rc::clone(callback);
        let subscription =
            modals.on_push_modal(target, move |open, props, name| forward(open, props, name));
        tracing::trace!(?target, "modal watch subscribed");
        self.current = Some(Watched {
            emitter: modals.emitter().clone(),
            target,
            callback: Rc::clone(callback),
            _subscription: subscription,
        });
        true
    }

    /// Drop the subscription. Returns `true` if one was held.
    pub fn release(&mut self) -> bool {
        self.current.take().is_some()
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.current.is_some()
    }

    /// Target currently watched.
    #[must_use]
    pub fn target(&self) -> Option<ModalTarget> {
        self.current.as_ref().map(|c| c.target)
    }
}

impl std::fmt::Debug for ModalWatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModalWatch")
            .field("target", &self.target())
            .finish()
    }
}
