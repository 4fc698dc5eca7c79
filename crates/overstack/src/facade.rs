#![forbid(unsafe_code)]

//! Command facade.
//!
//! [`Modals`] is the handle the rest of an application holds. It validates
//! every command against the registry and turns it into an emitter event;
//! the [`StackController`](crate::StackController) does the rest. Handles
//! are cheap to clone and never reference the rendering tree.
//!
//! ```ignore
//! modals.push_modal::<EditProfile>(ProfileId(7))?;
//! modals.push_empty_modal::<About>()?;
//! modals.pop_modal(Some(EditProfile::NAME))?;
//! let _sub = modals.on_push_modal("*", |open, _props, name| {
//!     println!("{name} is now {}", if open { "open" } else { "closing" });
//! });
//! ```
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | `UnknownOverlay` | Name not in the registry | `Err`, nothing emitted |
//! | `PropsMismatch` | Props type differs from the definition's | `Err`, nothing emitted |
//! | No controller mounted | Controller dropped | `Ok`, command dropped (logged) |

use std::rc::Rc;

use overstack_runtime::{Emitter, EventKind, Subscription};

use crate::error::OverlayError;
use crate::events::{
    ModalChanged, OpenCommand, PopAllModals, PopCommand, PopModal, PushModal, ReplaceModal,
};
use crate::options::OverlayOptions;
use crate::props::{Overlay, Props};
use crate::registry::OverlayRegistry;

/// Callback for change notifications: `(open, props, name)`.
pub type ChangeCallback = Rc<dyn Fn(bool, &Props, &'static str)>;

/// Which overlays a change subscription listens to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModalTarget {
    /// Every overlay (the `"*"` wildcard).
    Any,
    /// Only overlays registered under this name.
    Name(&'static str),
}

impl ModalTarget {
    /// Wildcard spelling accepted by `From<&str>`.
    pub const WILDCARD: &'static str = "*";

    /// Whether a notice for `name` is delivered.
    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Name(target) => *target == name,
        }
    }
}

impl From<&'static str> for ModalTarget {
    fn from(name: &'static str) -> Self {
        if name == Self::WILDCARD {
            Self::Any
        } else {
            Self::Name(name)
        }
    }
}

/// Typed entry points for showing and hiding overlays.
pub struct Modals<V: 'static> {
    emitter: Emitter,
    registry: Rc<OverlayRegistry<V>>,
}

impl<V: 'static> Clone for Modals<V> {
    fn clone(&self) -> Self {
        Self {
            emitter: self.emitter.clone(),
            registry: Rc::clone(&self.registry),
        }
    }
}

impl<V: 'static> std::fmt::Debug for Modals<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Modals")
            .field("registry", &self.registry)
            .finish()
    }
}

fn reject(err: OverlayError) -> OverlayError {
    tracing::error!(error = %err, "overlay command rejected");
    err
}

impl<V: 'static> Modals<V> {
    /// Facade emitting on `emitter`, validating against `registry`.
    #[must_use]
    pub fn new(emitter: Emitter, registry: Rc<OverlayRegistry<V>>) -> Self {
        Self { emitter, registry }
    }

    #[must_use]
    pub fn emitter(&self) -> &Emitter {
        &self.emitter
    }

    #[must_use]
    pub fn registry(&self) -> &Rc<OverlayRegistry<V>> {
        &self.registry
    }

    fn send<K: EventKind>(&self, payload: K::Payload) {
        if self.emitter.emit::<K>(payload) == 0 {
            tracing::warn!(command = K::NAME, "no stack controller mounted; command dropped");
        }
    }

    fn open_typed<O, K>(&self, props: O::Props, options: OverlayOptions<V>) -> Result<(), OverlayError>
    where
        O: Overlay,
        K: EventKind<Payload = OpenCommand<V>>,
    {
        let definition = self.registry.resolve_typed::<O>().map_err(reject)?;
        self.send::<K>(OpenCommand {
            name: definition.name(),
            props: Props::new(props),
            options,
        });
        Ok(())
    }

    fn open_named<K>(
        &self,
        name: &str,
        props: Props,
        options: OverlayOptions<V>,
    ) -> Result<(), OverlayError>
    where
        K: EventKind<Payload = OpenCommand<V>>,
    {
        let definition = self.registry.resolve(name).map_err(reject)?;
        definition.check_props(&props).map_err(reject)?;
        self.send::<K>(OpenCommand {
            name: definition.name(),
            props,
            options,
        });
        Ok(())
    }

    /// Open overlay `O` on top of the stack.
    pub fn push_modal<O: Overlay>(&self, props: O::Props) -> Result<(), OverlayError> {
        self.push_modal_with::<O>(props, OverlayOptions::new())
    }

    /// Open overlay `O` with instance-level options.
    pub fn push_modal_with<O: Overlay>(
        &self,
        props: O::Props,
        options: OverlayOptions<V>,
    ) -> Result<(), OverlayError> {
        self.open_typed::<O, PushModal<V>>(props, options)
    }

    /// Open a props-less overlay.
    pub fn push_empty_modal<O: Overlay<Props = ()>>(&self) -> Result<(), OverlayError> {
        self.push_modal::<O>(())
    }

    /// Close the most recent open overlay and open `O` in its place.
    pub fn replace_with_modal<O: Overlay>(&self, props: O::Props) -> Result<(), OverlayError> {
        self.replace_with_modal_with::<O>(props, OverlayOptions::new())
    }

    pub fn replace_with_modal_with<O: Overlay>(
        &self,
        props: O::Props,
        options: OverlayOptions<V>,
    ) -> Result<(), OverlayError> {
        self.open_typed::<O, ReplaceModal<V>>(props, options)
    }

    pub fn replace_with_empty_modal<O: Overlay<Props = ()>>(&self) -> Result<(), OverlayError> {
        self.replace_with_modal::<O>(())
    }

    /// Open an overlay by name. The props type is checked at runtime.
    pub fn push_named(
        &self,
        name: &str,
        props: Props,
        options: OverlayOptions<V>,
    ) -> Result<(), OverlayError> {
        self.open_named::<PushModal<V>>(name, props, options)
    }

    /// Replace by name. The props type is checked at runtime.
    pub fn replace_named(
        &self,
        name: &str,
        props: Props,
        options: OverlayOptions<V>,
    ) -> Result<(), OverlayError> {
        self.open_named::<ReplaceModal<V>>(name, props, options)
    }

    /// Close the last open overlay named `name`, or the topmost overlay when
    /// `name` is `None`.
    pub fn pop_modal(&self, name: Option<&str>) -> Result<(), OverlayError> {
        let name = match name {
            Some(name) => Some(self.registry.resolve(name).map_err(reject)?.name()),
            None => None,
        };
        self.send::<PopModal>(PopCommand { name });
        Ok(())
    }

    /// Close the last open instance of overlay `O`.
    pub fn pop_modal_of<O: Overlay>(&self) -> Result<(), OverlayError> {
        self.pop_modal(Some(O::NAME))
    }

    /// Close every overlay.
    pub fn pop_all_modals(&self) {
        self.send::<PopAllModals>(());
    }

    /// Subscribe to open/close notices for `target` (a name or `"*"`).
    pub fn on_push_modal(
        &self,
        target: impl Into<ModalTarget>,
        callback: impl Fn(bool, &Props, &'static str) + 'static,
    ) -> Subscription {
        let target = target.into();
        self.emitter.on::<ModalChanged>(move |notice| {
            if target.matches(notice.name) {
                callback(notice.open, &notice.props, notice.name);
            }
        })
    }

    /// Typed variant of [`on_push_modal`](Self::on_push_modal) for overlay `O`.
    pub fn on_modal<O: Overlay>(
        &self,
        callback: impl Fn(bool, &O::Props) + 'static,
    ) -> Subscription {
        self.on_push_modal(ModalTarget::Name(O::NAME), move |open, props, _| {
            if let Some(props) = props.downcast_ref::<O::Props>() {
                callback(open, props);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    use crate::config::StackConfig;
    use crate::stack::{Phase, StackController};
    use overstack_runtime::ManualClock;

    struct Greeting;
    impl Overlay for Greeting {
        const NAME: &'static str = "greeting";
        type Props = String;
    }

    struct Help;
    impl Overlay for Help {
        const NAME: &'static str = "help";
        type Props = ();
    }

    struct Unregistered;
    impl Overlay for Unregistered {
        const NAME: &'static str = "unregistered";
        type Props = ();
    }

    fn mounted() -> (Modals<String>, StackController<String>) {
        let registry = Rc::new(
            OverlayRegistry::builder()
                .register::<Greeting>(|s: &String| s.clone())
                .register::<Help>(|_: &()| "help".to_string())
                .build()
                .expect("registry"),
        );
        let emitter = Emitter::new();
        let controller = StackController::mount(
            &emitter,
            Rc::clone(&registry),
            StackConfig::default(),
            Rc::new(ManualClock::new()),
        );
        (Modals::new(emitter, registry), controller)
    }

    #[test]
    fn target_from_str() {
        assert_eq!(ModalTarget::from("*"), ModalTarget::Any);
        assert_eq!(ModalTarget::from("help"), ModalTarget::Name("help"));
        assert!(ModalTarget::Any.matches("x"));
        assert!(!ModalTarget::Name("a").matches("b"));
    }

    #[test]
    fn typed_push_and_pop() {
        let (modals, controller) = mounted();
        modals.push_modal::<Greeting>("hi".into()).expect("push");
        modals.push_empty_modal::<Help>().expect("push");
        assert!(controller.is_open("greeting"));
        assert!(controller.is_open("help"));

        modals.pop_modal_of::<Help>().expect("pop");
        assert!(!controller.is_open("help"));
        assert_eq!(controller.top().map(|i| i.phase()), Some(Phase::Closing));
    }

    #[test]
    fn unregistered_overlay_is_rejected_before_emission() {
        let (modals, controller) = mounted();
        let seen = Rc::new(RefCell::new(0));
        let s = Rc::clone(&seen);
        let _sub = modals.on_push_modal("*", move |_, _, _| *s.borrow_mut() += 1);

        assert_eq!(
            modals.push_empty_modal::<Unregistered>(),
            Err(OverlayError::UnknownOverlay("unregistered".into()))
        );
        assert_eq!(
            modals.pop_modal(Some("unregistered")),
            Err(OverlayError::UnknownOverlay("unregistered".into()))
        );
        assert!(controller.is_empty());
        assert_eq!(*seen.borrow(), 0);
    }

    #[test]
    fn dynamic_push_checks_props_shape() {
        let (modals, controller) = mounted();
        let err = modals
            .push_named("greeting", Props::new(5u32), OverlayOptions::new())
            .unwrap_err();
        assert!(matches!(
            err,
            OverlayError::PropsMismatch {
                name: "greeting",
                expected: "alloc::string::String",
                found: "u32"
            }
        ));
        assert!(controller.is_empty());

        modals
            .push_named("greeting", Props::new(String::from("yo")), OverlayOptions::new())
            .expect("valid props");
        modals
            .replace_named("help", Props::empty(), OverlayOptions::new())
            .expect("valid props");
        let phases: Vec<_> = controller
            .instances()
            .iter()
            .map(|i| (i.name(), i.phase()))
            .collect();
        assert_eq!(
            phases,
            vec![("greeting", Phase::Closing), ("help", Phase::Open)]
        );
    }

    #[test]
    fn on_push_modal_filters_by_name() {
        let (modals, _controller) = mounted();
        let log = Rc::new(RefCell::new(Vec::new()));
        let l = Rc::clone(&log);
        let _sub = modals.on_push_modal("greeting", move |open, props, name| {
            l.borrow_mut()
                .push((name, open, props.downcast_ref::<String>().cloned()));
        });

        modals.push_modal::<Greeting>("a".into()).expect("push");
        modals.push_empty_modal::<Help>().expect("push");
        modals.pop_modal(Some("greeting")).expect("pop");

        assert_eq!(
            *log.borrow(),
            vec![
                ("greeting", true, Some("a".to_string())),
                ("greeting", false, Some("a".to_string())),
            ]
        );
    }

    #[test]
    fn typed_subscription_receives_typed_props() {
        let (modals, _controller) = mounted();
        let log = Rc::new(RefCell::new(Vec::new()));
        let l = Rc::clone(&log);
        let _sub = modals.on_modal::<Greeting>(move |open, text: &String| {
            l.borrow_mut().push((open, text.clone()));
        });
        modals.push_modal::<Greeting>("x".into()).expect("push");
        modals.pop_all_modals();
        assert_eq!(
            *log.borrow(),
            vec![(true, "x".to_string()), (false, "x".to_string())]
        );
    }

    #[test]
    fn dropping_subscription_stops_notices() {
        let (modals, _controller) = mounted();
        let count = Rc::new(RefCell::new(0));
        let c = Rc::clone(&count);
        let sub = modals.on_push_modal("*", move |_, _, _| *c.borrow_mut() += 1);
        modals.push_empty_modal::<Help>().expect("push");
        drop(sub);
        modals.push_empty_modal::<Help>().expect("push");
        assert_eq!(*count.borrow(), 1);
    }

    #[test]
    fn commands_without_controller_are_dropped() {
        let (modals, controller) = mounted();
        drop(controller);
        assert!(modals.push_empty_modal::<Help>().is_ok());
        modals.pop_all_modals();
    }
}
