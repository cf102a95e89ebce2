//! Scoped, always-defaulted coordination values.
//!
//! A `Scope` is an immutable chain of provided values. Rendering code passes
//! the scope down; `provide` returns a child scope, so siblings never see each
//! other's providers.

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_KEY: AtomicU64 = AtomicU64::new(1);

/// A value that can be carried by a coordination context.
pub trait ContextValue: Clone + Send + Sync + 'static {
    /// Partial override; `None` fields inherit from the enclosing value.
    type Patch: Default;

    fn merge(&self, patch: Self::Patch) -> Self;
}

/// Identity plus defaults of one coordination context.
pub struct ContextHandle<T: ContextValue> {
    key: u64,
    name: &'static str,
    defaults: Arc<T>,
}

impl<T: ContextValue> ContextHandle<T> {
    pub fn new(name: &'static str, defaults: T) -> Self {
        Self {
            key: NEXT_KEY.fetch_add(1, Ordering::Relaxed),
            name,
            defaults: Arc::new(defaults),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn defaults(&self) -> &T {
        &self.defaults
    }
}

impl<T: ContextValue> fmt::Debug for ContextHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextHandle")
            .field("key", &self.key)
            .field("name", &self.name)
            .finish()
    }
}

pub fn create_coordination_context<T: ContextValue>(
    name: &'static str,
    defaults: T,
) -> ContextHandle<T> {
    ContextHandle::new(name, defaults)
}

struct Frame {
    key: u64,
    name: &'static str,
    value: Arc<dyn Any + Send + Sync>,
    parent: Option<Arc<Frame>>,
}

#[derive(Clone, Default)]
pub struct Scope {
    top: Option<Arc<Frame>>,
}

impl Scope {
    /// Scope with nothing provided: every consume yields defaults.
    pub fn root() -> Self {
        Self::default()
    }

    /// Nearest enclosing value for `handle`, or its defaults. Never fails.
    pub fn consume<T: ContextValue>(&self, handle: &ContextHandle<T>) -> T {
        self.lookup(handle).unwrap_or(&*handle.defaults).clone()
    }

    /// Child scope where `patch` overrides the nearest enclosing value.
    pub fn provide<T: ContextValue>(&self, handle: &ContextHandle<T>, patch: T::Patch) -> Scope {
        let base = self.lookup(handle).unwrap_or(&*handle.defaults);
        let value = base.merge(patch);
        self.provide_value(handle, value)
    }

    /// Child scope binding a complete value.
    pub fn provide_value<T: ContextValue>(&self, handle: &ContextHandle<T>, value: T) -> Scope {
        Scope {
            top: Some(Arc::new(Frame {
                key: handle.key,
                name: handle.name,
                value: Arc::new(value),
                parent: self.top.clone(),
            })),
        }
    }

    pub fn is_provided<T: ContextValue>(&self, handle: &ContextHandle<T>) -> bool {
        self.lookup(handle).is_some()
    }

    fn frames(&self) -> impl Iterator<Item = &Frame> {
        std::iter::successors(self.top.as_deref(), |f| f.parent.as_deref())
    }

    fn lookup<T: ContextValue>(&self, handle: &ContextHandle<T>) -> Option<&T> {
        self.frames()
            .find(|f| f.key == handle.key)
            .and_then(|f| f.value.downcast_ref::<T>())
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.frames().map(|fr| fr.name))
            .finish()
    }
}
