#![forbid(unsafe_code)]

//! Event kinds carried on the overlay emitter.
//!
//! Four command kinds flow from the facade to the stack controller
//! ([`PushModal`], [`ReplaceModal`], [`PopModal`], [`PopAllModals`]); one
//! derived notification flows from the controller to observers
//! ([`ModalChanged`]).

use overstack_runtime::{EventKind, KindMarker};

use crate::options::OverlayOptions;
use crate::props::Props;

/// Payload of push and replace commands.
pub struct OpenCommand<V> {
    pub name: &'static str,
    pub props: Props,
    /// Instance-level options, merged over the definition defaults.
    pub options: OverlayOptions<V>,
}

impl<V> std::fmt::Debug for OpenCommand<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenCommand")
            .field("name", &self.name)
            .field("props", &self.props)
            .field("options", &self.options)
            .finish()
    }
}

/// Payload of the pop command. `None` targets the last list element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PopCommand {
    pub name: Option<&'static str>,
}

/// Open/close notification for one instance.
#[derive(Debug, Clone)]
pub struct ChangeNotice {
    pub name: &'static str,
    /// Phase after the transition: `true` when the instance just opened.
    pub open: bool,
    pub props: Props,
}

/// Append a new instance.
pub struct PushModal<V>(KindMarker<V>);

impl<V: 'static> EventKind for PushModal<V> {
    type Payload = OpenCommand<V>;
    const NAME: &'static str = "push";
}

/// Close the most recent open instance, then append a new one.
pub struct ReplaceModal<V>(KindMarker<V>);

impl<V: 'static> EventKind for ReplaceModal<V> {
    type Payload = OpenCommand<V>;
    const NAME: &'static str = "replace";
}

/// Close one instance.
pub struct PopModal;

impl EventKind for PopModal {
    type Payload = PopCommand;
    const NAME: &'static str = "pop";
}

/// Close every instance.
pub struct PopAllModals;

impl EventKind for PopAllModals {
    type Payload = ();
    const NAME: &'static str = "pop-all";
}

/// An instance opened or started closing.
pub struct ModalChanged;

impl EventKind for ModalChanged {
    type Payload = ChangeNotice;
    const NAME: &'static str = "change";
}
