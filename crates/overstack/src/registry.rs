#![forbid(unsafe_code)]

//! Immutable name → definition mapping.
//!
//! Definitions come in two shapes at registration: a bare content renderer
//! ([`RegistryBuilder::register`]) or a full [`OverlayDefinition`] carrying a
//! wrapper and default options ([`RegistryBuilder::define`]). Both normalize
//! into the same record, so nothing downstream branches on shape.
//!
//! # Invariants
//!
//! 1. Names are unique; `build()` fails on the first duplicate.
//! 2. The registry never changes after `build()`.
//! 3. A definition's content renderer only ever sees props of its declared
//!    [`PropsShape`].

use std::rc::Rc;

use ahash::AHashMap;

use crate::error::OverlayError;
use crate::host::{Content, Wrapper};
use crate::options::OverlayOptions;
use crate::props::{Overlay, Props, PropsShape};

type ErasedContent<V> = Rc<dyn Fn(&Props) -> Option<V>>;

/// Normalized overlay definition.
pub struct OverlayDefinition<V> {
    name: &'static str,
    props: PropsShape,
    content: ErasedContent<V>,
    default_options: OverlayOptions<V>,
}

impl<V: 'static> OverlayDefinition<V> {
    /// Definition for overlay `O` rendered by `content`.
    pub fn new<O: Overlay>(content: impl Content<O::Props, V> + 'static) -> Self {
        let content: ErasedContent<V> =
            Rc::new(move |props: &Props| props.downcast_ref::<O::Props>().map(|p| content.render(p)));
        Self {
            name: O::NAME,
            props: PropsShape::of::<O::Props>(),
            content,
            default_options: OverlayOptions::new(),
        }
    }

    /// Render instances of this overlay inside `wrapper`.
    #[must_use]
    pub fn with_wrapper(mut self, wrapper: impl Wrapper<V> + 'static) -> Self {
        self.default_options.wrapper = Some(Rc::new(wrapper));
        self
    }

    /// Default options every instance starts from.
    #[must_use]
    pub fn with_options(mut self, options: OverlayOptions<V>) -> Self {
        self.default_options.apply_patch(&options);
        self
    }
}

impl<V> OverlayDefinition<V> {
    /// Registry key.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Declared props type.
    #[must_use]
    pub fn props_shape(&self) -> PropsShape {
        self.props
    }

    /// Defaults merged under every instance's options.
    #[must_use]
    pub fn default_options(&self) -> &OverlayOptions<V> {
        &self.default_options
    }

    /// Render the content for `props`. `None` if `props` has the wrong shape.
    #[must_use]
    pub fn render(&self, props: &Props) -> Option<V> {
        (self.content)(props)
    }

    /// Check `props` against the declared shape.
    pub fn check_props(&self, props: &Props) -> Result<(), OverlayError> {
        if self.props.matches(props) {
            Ok(())
        } else {
            Err(OverlayError::PropsMismatch {
                name: self.name,
                expected: self.props.type_name(),
                found: props.type_name(),
            })
        }
    }
}

impl<V> std::fmt::Debug for OverlayDefinition<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OverlayDefinition")
            .field("name", &self.name)
            .field("props", &self.props.type_name())
            .field("default_options", &self.default_options)
            .finish()
    }
}

/// Collects definitions before the registry is frozen.
pub struct RegistryBuilder<V> {
    definitions: Vec<OverlayDefinition<V>>,
}

impl<V: 'static> RegistryBuilder<V> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            definitions: Vec::new(),
        }
    }

    /// Register overlay `O` with a bare content renderer.
    #[must_use]
    pub fn register<O: Overlay>(self, content: impl Content<O::Props, V> + 'static) -> Self {
        self.define(OverlayDefinition::new::<O>(content))
    }

    /// Register a fully specified definition.
    #[must_use]
    pub fn define(mut self, definition: OverlayDefinition<V>) -> Self {
        self.definitions.push(definition);
        self
    }

    /// Freeze the registry, rejecting duplicate names.
    pub fn build(self) -> Result<OverlayRegistry<V>, OverlayError> {
        let mut definitions = AHashMap::with_capacity(self.definitions.len());
        let mut order = Vec::with_capacity(self.definitions.len());
        for definition in self.definitions {
            let name = definition.name;
            if definitions.insert(name, definition).is_some() {
                tracing::error!(name, "duplicate overlay name in registry");
                return Err(OverlayError::DuplicateName(name));
            }
            order.push(name);
        }
        tracing::debug!(overlays = order.len(), "overlay registry built");
        Ok(OverlayRegistry { definitions, order })
    }
}

impl<V: 'static> Default for RegistryBuilder<V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Read-only lookup of overlay definitions by name.
pub struct OverlayRegistry<V> {
    definitions: AHashMap<&'static str, OverlayDefinition<V>>,
    order: Vec<&'static str>,
}

impl<V: 'static> OverlayRegistry<V> {
    /// Start building a registry.
    #[must_use]
    pub fn builder() -> RegistryBuilder<V> {
        RegistryBuilder::new()
    }
}

impl<V> OverlayRegistry<V> {
    /// Definition registered under `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&OverlayDefinition<V>> {
        self.definitions.get(name)
    }

    /// Like [`get`](Self::get), but an unknown name is an error.
    pub fn resolve(&self, name: &str) -> Result<&OverlayDefinition<V>, OverlayError> {
        self.get(name)
            .ok_or_else(|| OverlayError::UnknownOverlay(name.to_string()))
    }

    /// Definition of overlay `O`, checking that its props type matches.
    pub fn resolve_typed<O: Overlay>(&self) -> Result<&OverlayDefinition<V>, OverlayError> {
        let definition = self.resolve(O::NAME)?;
        if definition.props != PropsShape::of::<O::Props>() {
            return Err(OverlayError::PropsMismatch {
                name: definition.name,
                expected: definition.props.type_name(),
                found: std::any::type_name::<O::Props>(),
            });
        }
        Ok(definition)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Registered names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.order.iter().copied()
    }
}

impl<V> std::fmt::Debug for OverlayRegistry<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OverlayRegistry")
            .field("names", &self.order)
            .finish()
    }
}
