#![forbid(unsafe_code)]

//! Scoped options context.
//!
//! While an overlay's content renders, the host enters that instance's
//! [`OptionsScope`]. Content can then read the effective options with
//! [`current_options`] or patch them with [`patch_options`]; the patch is
//! visible to the wrapper rendered around the content and persists across
//! renders of the same instance.
//!
//! Scopes nest. Lookups walk the active stack from the innermost scope
//! outward and return the first one whose view type matches.

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use crate::options::OverlayOptions;

thread_local! {
    static ACTIVE: RefCell<Vec<Rc<dyn Any>>> = const { RefCell::new(Vec::new()) };
}

/// Mutable options cell shared between the host and the content it renders.
pub struct OptionsScope<V> {
    cell: Rc<RefCell<OverlayOptions<V>>>,
}

impl<V> Clone for OptionsScope<V> {
    fn clone(&self) -> Self {
        Self {
            cell: Rc::clone(&self.cell),
        }
    }
}

impl<V: 'static> OptionsScope<V> {
    #[must_use]
    pub fn new(initial: OverlayOptions<V>) -> Self {
        Self {
            cell: Rc::new(RefCell::new(initial)),
        }
    }

    /// Snapshot of the current options.
    #[must_use]
    pub fn get(&self) -> OverlayOptions<V> {
        self.cell.borrow().clone()
    }

    pub fn set(&self, options: OverlayOptions<V>) {
        *self.cell.borrow_mut() = options;
    }

    /// Overwrite every field `patch` sets.
    pub fn patch(&self, patch: &OverlayOptions<V>) {
        self.cell.borrow_mut().apply_patch(patch);
    }

    /// Make this scope the innermost one until the guard drops.
    #[must_use = "the scope is exited when the guard is dropped"]
    pub fn enter(&self) -> ScopeGuard {
        let entry: Rc<dyn Any> = Rc::clone(&self.cell) as Rc<dyn Any>;
        ACTIVE.with(|active| active.borrow_mut().push(Rc::clone(&entry)));
        ScopeGuard { entry }
    }

    /// Innermost active scope for view type `V`.
    #[must_use]
    pub fn current() -> Option<Self> {
        ACTIVE.with(|active| {
            active.borrow().iter().rev().find_map(|entry| {
                Rc::clone(entry)
                    .downcast::<RefCell<OverlayOptions<V>>>()
                    .ok()
                    .map(|cell| Self { cell })
            })
        })
    }

    /// Whether both handles share a cell.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.cell, &other.cell)
    }
}

impl<V> std::fmt::Debug for OptionsScope<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("OptionsScope")
            .field(&*self.cell.borrow())
            .finish()
    }
}

/// Exits an [`OptionsScope`] on drop.
pub struct ScopeGuard {
    entry: Rc<dyn Any>,
}

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        let _ = ACTIVE.try_with(|active| {
            let popped = active.borrow_mut().pop();
            debug_assert!(
                popped.is_some_and(|p| Rc::ptr_eq(&p, &self.entry)),
                "options scopes exited out of order"
            );
        });
    }
}

impl std::fmt::Debug for ScopeGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ScopeGuard")
    }
}

/// Options of the innermost active scope for view type `V`.
#[must_use]
pub fn current_options<V: 'static>() -> Option<OverlayOptions<V>> {
    OptionsScope::<V>::current().map(|scope| scope.get())
}

/// Patch the innermost active scope. Returns `false` outside any scope.
pub fn patch_options<V: 'static>(patch: &OverlayOptions<V>) -> bool {
    match OptionsScope::<V>::current() {
        Some(scope) => {
            scope.patch(patch);
            true
        }
        None => false,
    }
}
