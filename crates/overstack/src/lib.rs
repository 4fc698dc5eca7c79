#![forbid(unsafe_code)]

//! Overlay stack for modal-style UI.
//!
//! Overlays (dialogs, sheets, drawers, menus) are registered once under a
//! unique name with a typed props contract. Anywhere in the application a
//! [`Modals`] handle pushes, replaces or pops them; a [`StackController`]
//! keeps the ordered instance list, and an [`OverlayHost`] renders it with
//! the right wrapper around each body.
//!
//! # Role in overstack
//! `overstack` owns the domain: registry, stack semantics and the render
//! boundary. Reactive plumbing (emitter, subscriptions, clock, timer) lives
//! in `overstack-runtime`. The view type `V` is up to the application; the
//! crate never inspects it.
//!
//! # Example
//!
//! ```ignore
//! use overstack::{Overlay, OverlayHost, OverlayRegistry, OverlayStack, passthrough};
//!
//! struct Confirm;
//! impl Overlay for Confirm {
//!     const NAME: &'static str = "confirm";
//!     type Props = String;
//! }
//!
//! let registry = OverlayRegistry::builder()
//!     .register::<Confirm>(|question: &String| format!("? {question}"))
//!     .build()?;
//! let host = OverlayHost::new(OverlayStack::new(registry), passthrough);
//! host.modals().push_modal::<Confirm>("Delete file?".into())?;
//! for overlay in host.render() {
//!     println!("{}: {}", overlay.key, overlay.view);
//! }
//! ```
//!
//! # Architecture
//!
//! Commands travel over an [`Emitter`] as typed events, so the facade and the
//! controller only share the emitter handle and the registry. The controller
//! answers every transition with a [`ModalChanged`](events::ModalChanged)
//! notice, which subscriptions made through [`Modals::on_push_modal`] or a
//! [`ModalWatch`] observe.

use std::rc::Rc;

pub mod config;
pub mod context;
pub mod error;
pub mod events;
pub mod facade;
pub mod host;
pub mod options;
pub mod props;
pub mod registry;
pub mod stack;
pub mod watch;

pub use config::StackConfig;
pub use context::{OptionsScope, ScopeGuard, current_options, patch_options};
pub use error::{ConfigError, OverlayError};
pub use facade::{ChangeCallback, ModalTarget, Modals};
pub use host::{
    Content, OpenChange, OverlayHost, RenderedOverlay, Wrapper, WrapperFrame, passthrough,
};
pub use options::{DismissEvent, DismissHandler, DismissKind, OverlayOptions};
pub use props::{Overlay, Props, PropsShape};
pub use registry::{OverlayDefinition, OverlayRegistry, RegistryBuilder};
pub use stack::{InstanceKey, OverlayInstance, Phase, StackController};
pub use watch::ModalWatch;

pub use overstack_runtime::{Clock, Emitter, Instant, ManualClock, Subscription, SystemClock};

/// A controller and a facade sharing one emitter and registry.
pub struct OverlayStack<V: 'static> {
    pub modals: Modals<V>,
    pub controller: StackController<V>,
}

impl<V: 'static> OverlayStack<V> {
    /// Mount with the default timing on the wall clock.
    #[must_use]
    pub fn new(registry: OverlayRegistry<V>) -> Self {
        Self::mount(registry, StackConfig::default(), Rc::new(SystemClock))
    }

    /// Mount with explicit timing and clock.
    pub fn with_config(
        registry: OverlayRegistry<V>,
        config: StackConfig,
        clock: Rc<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::mount(registry, config, clock))
    }

    fn mount(registry: OverlayRegistry<V>, config: StackConfig, clock: Rc<dyn Clock>) -> Self {
        let registry = Rc::new(registry);
        let emitter = Emitter::new();
        let controller = StackController::mount(&emitter, Rc::clone(&registry), config, clock);
        Self {
            modals: Modals::new(emitter, registry),
            controller,
        }
    }
}

impl<V: 'static> std::fmt::Debug for OverlayStack<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OverlayStack")
            .field("modals", &self.modals)
            .field("controller", &self.controller)
            .finish()
    }
}
