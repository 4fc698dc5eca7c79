#![forbid(unsafe_code)]

//! Rendering boundary.
//!
//! [`OverlayHost`] turns the controller's instance list into views. For each
//! instance, in list order, it renders the definition's [`Content`] inside
//! the instance's [`OptionsScope`] and hands the result to a [`Wrapper`]
//! chosen by precedence: instance options, then definition defaults, then
//! the host's default wrapper.
//!
//! The host does not animate. A wrapper sees `open == false` while the
//! instance is closing; once its exit transition is done the application
//! calls [`OverlayHost::unmounted`], or lets the grace-window sweep collect
//! it on [`OverlayHost::tick`].

use std::cell::RefCell;
use std::rc::Rc;

use ahash::AHashMap;

use crate::OverlayStack;
use crate::context::OptionsScope;
use crate::facade::Modals;
use crate::options::{DismissKind, OverlayOptions};
use crate::stack::{InstanceKey, OverlayInstance, Phase, StackController};

/// Renders an overlay's body from its typed props.
pub trait Content<P, V> {
    fn render(&self, props: &P) -> V;
}

impl<P, V, F> Content<P, V> for F
where
    F: Fn(&P) -> V,
{
    fn render(&self, props: &P) -> V {
        self(props)
    }
}

/// Chrome around an overlay body: a dialog frame, a sheet, a drawer.
pub trait Wrapper<V> {
    fn render(&self, frame: WrapperFrame<V>) -> V;
}

impl<V, F> Wrapper<V> for F
where
    F: Fn(WrapperFrame<V>) -> V,
{
    fn render(&self, frame: WrapperFrame<V>) -> V {
        self(frame)
    }
}

/// Wrapper that renders the body unchanged.
pub fn passthrough<V>(frame: WrapperFrame<V>) -> V {
    frame.children
}

/// Requests an open-state change from inside a wrapper.
#[derive(Clone)]
pub struct OpenChange {
    callback: Rc<dyn Fn(bool)>,
}

impl OpenChange {
    pub fn new(callback: impl Fn(bool) + 'static) -> Self {
        Self {
            callback: Rc::new(callback),
        }
    }

    /// Request `open`. `false` closes the overlay; `true` is ignored by the
    /// host since instances are only opened through commands.
    pub fn set(&self, open: bool) {
        (self.callback)(open);
    }
}

impl std::fmt::Debug for OpenChange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("OpenChange")
    }
}

/// Everything a wrapper receives for one instance.
pub struct WrapperFrame<V> {
    /// `false` once the instance started closing.
    pub open: bool,
    /// Always `true`: instances are created open.
    pub default_open: bool,
    pub on_open_change: OpenChange,
    /// Rendered content.
    pub children: V,
    /// Effective options, including patches made by the content.
    pub options: OverlayOptions<V>,
}

impl<V> WrapperFrame<V> {
    /// Run the dismiss handler for `kind` and close unless it vetoed.
    ///
    /// Returns `true` if a close was requested.
    pub fn dismiss(&self, kind: DismissKind) -> bool {
        if self.options.dispatch_dismiss(kind) {
            self.on_open_change.set(false);
            true
        } else {
            false
        }
    }
}

impl<V: std::fmt::Debug> std::fmt::Debug for WrapperFrame<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WrapperFrame")
            .field("open", &self.open)
            .field("default_open", &self.default_open)
            .field("children", &self.children)
            .field("options", &self.options)
            .finish()
    }
}

/// One rendered instance.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedOverlay<V> {
    pub key: InstanceKey,
    pub name: &'static str,
    pub phase: Phase,
    pub view: V,
}

/// Owns a mounted stack and renders it.
pub struct OverlayHost<V: 'static> {
    stack: OverlayStack<V>,
    default_wrapper: Rc<dyn Wrapper<V>>,
    scopes: RefCell<AHashMap<InstanceKey, OptionsScope<V>>>,
}

impl<V: 'static> OverlayHost<V> {
    /// Host for `stack`, wrapping overlays without a wrapper of their own in
    /// `default_wrapper`.
    pub fn new(stack: OverlayStack<V>, default_wrapper: impl Wrapper<V> + 'static) -> Self {
        Self {
            stack,
            default_wrapper: Rc::new(default_wrapper),
            scopes: RefCell::new(AHashMap::new()),
        }
    }

    #[must_use]
    pub fn modals(&self) -> &Modals<V> {
        &self.stack.modals
    }

    #[must_use]
    pub fn controller(&self) -> &StackController<V> {
        &self.stack.controller
    }

    fn scope_for(&self, instance: &OverlayInstance<V>) -> OptionsScope<V> {
        self.scopes
            .borrow_mut()
            .entry(instance.key())
            .or_insert_with(|| OptionsScope::new(instance.options().clone()))
            .clone()
    }

    fn open_change(&self, name: &'static str) -> OpenChange {
        let modals = self.stack.modals.clone();
        OpenChange::new(move |open| {
            if open {
                return;
            }
            if let Err(err) = modals.pop_modal(Some(name)) {
                tracing::error!(name, error = %err, "close request failed");
            }
        })
    }

    /// Render every instance, bottom to top.
    pub fn render(&self) -> Vec<RenderedOverlay<V>> {
        let instances = self.stack.controller.instances();
        self.scopes
            .borrow_mut()
            .retain(|key, _| instances.iter().any(|i| i.key() == *key));

        let registry = Rc::clone(self.stack.modals.registry());
        let mut rendered = Vec::with_capacity(instances.len());
        for instance in &instances {
            let Some(definition) = registry.get(instance.name()) else {
                continue;
            };
            let scope = self.scope_for(instance);
            let children = {
                let _guard = scope.enter();
                definition.render(instance.props())
            };
            let Some(children) = children else {
                tracing::error!(
                    key = instance.key().id(),
                    name = instance.name(),
                    props = instance.props().type_name(),
                    "props do not match overlay definition; instance skipped"
                );
                continue;
            };

            let options = scope.get();
            let wrapper = options
                .wrapper
                .clone()
                .unwrap_or_else(|| Rc::clone(&self.default_wrapper));
            let view = wrapper.render(WrapperFrame {
                open: instance.is_open(),
                default_open: true,
                on_open_change: self.open_change(instance.name()),
                children,
                options,
            });
            rendered.push(RenderedOverlay {
                key: instance.key(),
                name: instance.name(),
                phase: instance.phase(),
                view,
            });
        }
        tracing::trace!(rendered = rendered.len(), "overlays rendered");
        rendered
    }

    /// Effective options of `key`, including patches made while rendering.
    #[must_use]
    pub fn options_of(&self, key: InstanceKey) -> Option<OverlayOptions<V>> {
        if let Some(scope) = self.scopes.borrow().get(&key) {
            return Some(scope.get());
        }
        self.stack.controller.get(key).map(|i| i.options().clone())
    }

    /// Route a dismiss gesture to the topmost open instance.
    ///
    /// Returns the key of the instance asked to close, or `None` if nothing
    /// is open or its handler vetoed.
    pub fn dismiss_top(&self, kind: DismissKind) -> Option<InstanceKey> {
        let top = self
            .stack
            .controller
            .instances()
            .into_iter()
            .rev()
            .find(OverlayInstance::is_open)?;
        let options = self.options_of(top.key())?;
        if !options.dispatch_dismiss(kind) {
            tracing::debug!(key = top.key().id(), ?kind, "dismiss vetoed");
            return None;
        }
        self.open_change(top.name()).set(false);
        Some(top.key())
    }

    /// The wrapper for `key` finished its exit transition.
    ///
    /// Ignored unless the instance is closing; open instances keep their
    /// patched options.
    pub fn unmounted(&self, key: InstanceKey) -> bool {
        if self.stack.controller.unmounted(key).is_none() {
            return false;
        }
        self.scopes.borrow_mut().remove(&key);
        true
    }

    /// Drive the grace-window sweep. Returns the number of instances removed.
    pub fn tick(&self) -> usize {
        self.stack.controller.tick()
    }
}

impl<V: 'static> std::fmt::Debug for OverlayHost<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OverlayHost")
            .field("controller", &self.stack.controller)
            .field("scopes", &self.scopes.borrow().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use overstack_runtime::ManualClock;

    use crate::config::StackConfig;
    use crate::context::patch_options;
    use crate::props::Overlay;
    use crate::registry::{OverlayDefinition, OverlayRegistry};

    struct Toast;
    impl Overlay for Toast {
        const NAME: &'static str = "toast";
        type Props = String;
    }

    struct Sheet;
    impl Overlay for Sheet {
        const NAME: &'static str = "sheet";
        type Props = ();
    }

    struct Guarded;
    impl Overlay for Guarded {
        const NAME: &'static str = "guarded";
        type Props = ();
    }

    fn host() -> (OverlayHost<String>, ManualClock) {
        let registry = OverlayRegistry::builder()
            .register::<Toast>(|text: &String| text.clone())
            .define(
                OverlayDefinition::new::<Sheet>(|_: &()| "sheet".to_string())
                    .with_wrapper(|f: WrapperFrame<String>| format!("sheet-frame({})", f.children)),
            )
            .register::<Guarded>(|_: &()| {
                patch_options(
                    &OverlayOptions::<String>::new().on_escape_key_down(|e| e.prevent_default()),
                );
                "guarded".to_string()
            })
            .build()
            .expect("registry");
        let clock = ManualClock::new();
        let stack = OverlayStack::with_config(
            registry,
            StackConfig::default(),
            Rc::new(clock.clone()),
        )
        .expect("valid config");
        let host = OverlayHost::new(stack, |f: WrapperFrame<String>| {
            format!("{}[{}]", if f.open { "open" } else { "closing" }, f.children)
        });
        (host, clock)
    }

    fn views(host: &OverlayHost<String>) -> Vec<String> {
        host.render().into_iter().map(|r| r.view).collect()
    }

    #[test]
    fn renders_in_list_order() {
        let (host, _clock) = host();
        host.modals().push_modal::<Toast>("one".into()).expect("push");
        host.modals().push_modal::<Toast>("two".into()).expect("push");
        assert_eq!(views(&host), vec!["open[one]", "open[two]"]);
    }

    #[test]
    fn wrapper_precedence() {
        let (host, _clock) = host();
        host.modals().push_empty_modal::<Sheet>().expect("push");
        host.modals()
            .push_modal_with::<Toast>(
                "hi".into(),
                OverlayOptions::new().wrapper(|f: WrapperFrame<String>| format!("<{}>", f.children)),
            )
            .expect("push");
        host.modals().push_modal::<Toast>("plain".into()).expect("push");
        assert_eq!(views(&host), vec!["sheet-frame(sheet)", "<hi>", "open[plain]"]);
    }

    #[test]
    fn closing_instance_renders_closed() {
        let (host, _clock) = host();
        host.modals().push_modal::<Toast>("bye".into()).expect("push");
        host.modals().pop_modal(None).expect("pop");
        let rendered = host.render();
        assert_eq!(rendered.len(), 1);
        assert_eq!(rendered[0].phase, Phase::Closing);
        assert_eq!(rendered[0].view, "closing[bye]");
    }

    #[test]
    fn frame_reports_default_open_and_closes_through_open_change() {
        let registry = OverlayRegistry::builder()
            .register::<Sheet>(|_: &()| String::new())
            .build()
            .expect("registry");
        let stack = OverlayStack::new(registry);
        let frames = Rc::new(RefCell::new(Vec::new()));
        let f = Rc::clone(&frames);
        let host = OverlayHost::new(stack, move |frame: WrapperFrame<String>| {
            f.borrow_mut().push(frame.on_open_change.clone());
            assert!(frame.default_open);
            frame.children
        });

        host.modals().push_empty_modal::<Sheet>().expect("push");
        host.render();
        let change = frames.borrow()[0].clone();
        change.set(true);
        assert!(host.controller().is_open("sheet"));
        change.set(false);
        assert!(!host.controller().is_open("sheet"));
    }

    #[test]
    fn content_patch_vetoes_escape() {
        let (host, _clock) = host();
        host.modals().push_empty_modal::<Guarded>().expect("push");
        host.render();

        assert_eq!(host.dismiss_top(DismissKind::EscapeKeyDown), None);
        assert!(host.controller().is_open("guarded"));

        let key = host.dismiss_top(DismissKind::PointerDownOutside);
        assert_eq!(key, host.controller().top().map(|i| i.key()));
        assert!(!host.controller().is_open("guarded"));
    }

    #[test]
    fn early_unmount_signal_keeps_content_patch() {
        let (host, _clock) = host();
        host.modals().push_empty_modal::<Guarded>().expect("push");
        let key = host.render()[0].key;

        assert!(!host.unmounted(key));
        assert!(host.options_of(key).is_some_and(|o| o.on_escape_key_down.is_some()));
        assert_eq!(host.dismiss_top(DismissKind::EscapeKeyDown), None);
        assert!(host.controller().is_open("guarded"));
    }

    #[test]
    fn dismiss_targets_topmost_open_instance() {
        let (host, _clock) = host();
        host.modals().push_modal::<Toast>("below".into()).expect("push");
        host.modals().push_empty_modal::<Sheet>().expect("push");
        host.modals().pop_modal(Some("sheet")).expect("pop");

        let below = host.controller().instances()[0].key();
        assert_eq!(host.dismiss_top(DismissKind::EscapeKeyDown), Some(below));
        assert_eq!(host.controller().open_count(), 0);
        assert_eq!(host.dismiss_top(DismissKind::EscapeKeyDown), None);
    }

    #[test]
    fn unmounted_removes_closing_instance() {
        let (host, _clock) = host();
        host.modals().push_modal::<Toast>("x".into()).expect("push");
        let key = host.render()[0].key;

        assert!(!host.unmounted(key), "open instances stay mounted");
        host.modals().pop_all_modals();
        assert!(host.unmounted(key));
        assert!(host.render().is_empty());
    }

    #[test]
    fn tick_sweeps_after_grace_window() {
        let (host, clock) = host();
        host.modals().push_modal::<Toast>("x".into()).expect("push");
        host.modals().pop_modal(None).expect("pop");

        clock.advance(Duration::from_millis(100));
        assert_eq!(host.tick(), 0);
        clock.advance(Duration::from_millis(300));
        assert_eq!(host.tick(), 1);
        assert!(host.render().is_empty());
    }

    #[test]
    fn scopes_follow_instances() {
        let (host, clock) = host();
        host.modals().push_empty_modal::<Guarded>().expect("push");
        let key = host.render()[0].key;
        assert!(host.options_of(key).is_some_and(|o| o.on_escape_key_down.is_some()));

        host.modals().pop_all_modals();
        clock.advance(Duration::from_secs(1));
        assert_eq!(host.controller().sweep(), 1);
        host.render();
        assert!(host.options_of(key).is_none());
    }
}
