#![forbid(unsafe_code)]

//! Per-instance overlay options.
//!
//! [`OverlayOptions`] carries the wrapper override and the dismiss handlers a
//! wrapper consults before closing. Effective options for an instance are the
//! instance-level options shallow-merged over the definition's defaults:
//! every field set on the instance wins, unset fields fall back.

use std::rc::Rc;

use crate::host::Wrapper;

/// User gesture that would dismiss an overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DismissKind {
    /// Focus or pointer interaction landed outside the overlay.
    InteractOutside,
    /// A pointer went down outside the overlay.
    PointerDownOutside,
    /// The escape key was pressed.
    EscapeKeyDown,
}

/// A dismiss gesture, passed to the matching handler before the overlay
/// closes. Calling [`prevent_default`](Self::prevent_default) keeps it open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DismissEvent {
    kind: DismissKind,
    default_prevented: bool,
}

impl DismissEvent {
    /// A fresh event of `kind`.
    #[must_use]
    pub const fn new(kind: DismissKind) -> Self {
        Self {
            kind,
            default_prevented: false,
        }
    }

    /// Gesture kind.
    #[must_use]
    pub const fn kind(&self) -> DismissKind {
        self.kind
    }

    /// Keep the overlay open.
    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    /// Whether a handler vetoed the dismissal.
    #[must_use]
    pub const fn is_default_prevented(&self) -> bool {
        self.default_prevented
    }
}

/// Callback invoked for a dismiss gesture.
pub type DismissHandler = Rc<dyn Fn(&mut DismissEvent)>;

/// Options attached to an overlay definition or a single instance.
pub struct OverlayOptions<V> {
    /// Wrapper used instead of the definition's or the host's default.
    pub wrapper: Option<Rc<dyn Wrapper<V>>>,
    pub on_interact_outside: Option<DismissHandler>,
    pub on_pointer_down_outside: Option<DismissHandler>,
    pub on_escape_key_down: Option<DismissHandler>,
}

impl<V> OverlayOptions<V> {
    /// Options with nothing set.
    #[must_use]
    pub fn new() -> Self {
        Self {
            wrapper: None,
            on_interact_outside: None,
            on_pointer_down_outside: None,
            on_escape_key_down: None,
        }
    }

    /// Use `wrapper` for this overlay.
    #[must_use]
    pub fn wrapper(mut self, wrapper: impl Wrapper<V> + 'static) -> Self {
        self.wrapper = Some(Rc::new(wrapper));
        self
    }

    #[must_use]
    pub fn on_interact_outside(mut self, handler: impl Fn(&mut DismissEvent) + 'static) -> Self {
        self.on_interact_outside = Some(Rc::new(handler));
        self
    }

    #[must_use]
    pub fn on_pointer_down_outside(
        mut self,
        handler: impl Fn(&mut DismissEvent) + 'static,
    ) -> Self {
        self.on_pointer_down_outside = Some(Rc::new(handler));
        self
    }

    #[must_use]
    pub fn on_escape_key_down(mut self, handler: impl Fn(&mut DismissEvent) + 'static) -> Self {
        self.on_escape_key_down = Some(Rc::new(handler));
        self
    }

    /// Whether no field is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.wrapper.is_none()
            && self.on_interact_outside.is_none()
            && self.on_pointer_down_outside.is_none()
            && self.on_escape_key_down.is_none()
    }

    /// `self` shallow-merged over `base`: fields set here win.
    #[must_use]
    pub fn merged_over(&self, base: &Self) -> Self {
        Self {
            wrapper: self.wrapper.clone().or_else(|| base.wrapper.clone()),
            on_interact_outside: self
                .on_interact_outside
                .clone()
                .or_else(|| base.on_interact_outside.clone()),
            on_pointer_down_outside: self
                .on_pointer_down_outside
                .clone()
                .or_else(|| base.on_pointer_down_outside.clone()),
            on_escape_key_down: self
                .on_escape_key_down
                .clone()
                .or_else(|| base.on_escape_key_down.clone()),
        }
    }

    /// Overwrite every field that `patch` sets.
    pub fn apply_patch(&mut self, patch: &Self) {
        *self = patch.merged_over(self);
    }

    /// Handler registered for `kind`.
    #[must_use]
    pub fn handler(&self, kind: DismissKind) -> Option<&DismissHandler> {
        match kind {
            DismissKind::InteractOutside => self.on_interact_outside.as_ref(),
            DismissKind::PointerDownOutside => self.on_pointer_down_outside.as_ref(),
            DismissKind::EscapeKeyDown => self.on_escape_key_down.as_ref(),
        }
    }

    /// Run the handler for `kind`. Returns `true` if the overlay should close.
    pub fn dispatch_dismiss(&self, kind: DismissKind) -> bool {
        let mut event = DismissEvent::new(kind);
        if let Some(handler) = self.handler(kind) {
            handler(&mut event);
        }
        !event.is_default_prevented()
    }
}

impl<V> Default for OverlayOptions<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Clone for OverlayOptions<V> {
    fn clone(&self) -> Self {
        Self {
            wrapper: self.wrapper.clone(),
            on_interact_outside: self.on_interact_outside.clone(),
            on_pointer_down_outside: self.on_pointer_down_outside.clone(),
            on_escape_key_down: self.on_escape_key_down.clone(),
        }
    }
}

impl<V> std::fmt::Debug for OverlayOptions<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OverlayOptions")
            .field("wrapper", &self.wrapper.is_some())
            .field("on_interact_outside", &self.on_interact_outside.is_some())
            .field(
                "on_pointer_down_outside",
                &self.on_pointer_down_outside.is_some(),
            )
            .field("on_escape_key_down", &self.on_escape_key_down.is_some())
            .finish()
    }
}
