#![forbid(unsafe_code)]

//! Overlay identities and their parameter bags.
//!
//! Each overlay is described at the type level by an [`Overlay`]
//! implementation: a unique name plus the props type its content expects.
//! The typed command API uses that to reject missing or mistyped props at
//! compile time. Inside the stack, props travel as an opaque [`Props`] bag.

use std::any::{Any, TypeId};
use std::rc::Rc;

/// Type-level description of one overlay.
///
/// ```ignore
/// struct EditProfile;
/// impl Overlay for EditProfile {
///     const NAME: &'static str = "edit-profile";
///     type Props = ProfileId;
/// }
///
/// struct About;
/// impl Overlay for About {
///     const NAME: &'static str = "about";
///     type Props = ();
/// }
/// ```
pub trait Overlay: 'static {
    /// Registry key. Must be unique across the registry.
    const NAME: &'static str;

    /// Parameters handed to the content renderer. Use `()` for none.
    type Props: 'static;
}

/// Declared props type of a definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropsShape {
    type_id: TypeId,
    type_name: &'static str,
}

impl PropsShape {
    /// Shape of props type `T`.
    #[must_use]
    pub fn of<T: 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Whether the overlay takes no props at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.type_id == TypeId::of::<()>()
    }

    /// Whether `props` carries a value of this shape.
    #[must_use]
    pub fn matches(&self, props: &Props) -> bool {
        props.type_id() == self.type_id
    }

    /// Type name, for diagnostics.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

/// Immutable, cheaply clonable parameter bag.
#[derive(Clone)]
pub struct Props {
    value: Rc<dyn Any>,
    type_name: &'static str,
}

impl Props {
    /// Wrap a props value.
    #[must_use]
    pub fn new<T: 'static>(value: T) -> Self {
        Self {
            value: Rc::new(value),
            type_name: std::any::type_name::<T>(),
        }
    }

    /// The bag for overlays without props.
    #[must_use]
    pub fn empty() -> Self {
        Self::new(())
    }

    /// Borrow the value as `T`, if that is its type.
    #[must_use]
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    /// Whether the bag holds a `T`.
    #[must_use]
    pub fn is<T: 'static>(&self) -> bool {
        self.value.is::<T>()
    }

    /// Whether the bag is the empty `()` bag.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.is::<()>()
    }

    /// `TypeId` of the contained value.
    #[must_use]
    pub fn type_id(&self) -> TypeId {
        Any::type_id(&*self.value)
    }

    /// Type name of the contained value.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Whether both bags share the same allocation.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.value, &other.value)
    }
}

impl Default for Props {
    fn default() -> Self {
        Self::empty()
    }
}

impl std::fmt::Debug for Props {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Props").field(&self.type_name).finish()
    }
}
