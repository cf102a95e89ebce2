use std::fmt;
use std::sync::Arc;

/// A zero/one-argument UI action. Cloning shares the same closure.
pub struct Callback<A = ()> {
    f: Arc<dyn Fn(A) + Send + Sync>,
}

impl<A: 'static> Callback<A> {
    pub fn new(f: impl Fn(A) + Send + Sync + 'static) -> Self {
        Self { f: Arc::new(f) }
    }

    /// The default for every action: does nothing.
    pub fn noop() -> Self {
        Self::new(|_| {})
    }

    pub fn call(&self, arg: A) {
        (self.f)(arg)
    }

    /// True when both handles point at the same closure.
    pub fn same(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.f, &other.f)
    }
}

impl Callback<()> {
    pub fn emit(&self) {
        self.call(())
    }
}

impl<A> Clone for Callback<A> {
    fn clone(&self) -> Self {
        Self {
            f: Arc::clone(&self.f),
        }
    }
}

impl<A: 'static> Default for Callback<A> {
    fn default() -> Self {
        Self::noop()
    }
}

impl<A> fmt::Debug for Callback<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Callback(..)")
    }
}
