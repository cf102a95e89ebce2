//! Owner-side state: what an ancestor holds and binds into a context.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::trace;

use crate::Callback;

/// A value owned by one ancestor. Consumers only get callbacks from it;
/// subscribers are woken on every change so they can re-render.
#[derive(Debug)]
pub struct SharedState<T> {
    tx: Arc<watch::Sender<T>>,
}

impl<T> Clone for SharedState<T> {
    fn clone(&self) -> Self {
        Self {
            tx: Arc::clone(&self.tx),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> SharedState<T> {
    pub fn new(initial: T) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx: Arc::new(tx) }
    }

    pub fn get(&self) -> T {
        self.tx.borrow().clone()
    }

    pub fn set(&self, value: T) {
        self.tx.send_replace(value);
    }

    /// Callback that writes into this state, for handing to a context.
    pub fn setter(&self) -> Callback<T> {
        let tx = Arc::clone(&self.tx);
        Callback::new(move |value| {
            tx.send_replace(value);
        })
    }

    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.tx.subscribe()
    }
}

impl<T: Clone + Default + Send + Sync + 'static> Default for SharedState<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Visibility {
    #[default]
    Hidden,
    Visible,
}

/// `hidden -> visible` on show, `visible -> hidden` on hide.
///
/// Dismissal triggers (outside click, escape) belong to the owner, which wires
/// them to `hide` or `hide_callback`.
#[derive(Clone, Debug)]
pub struct VisibilityState {
    name: &'static str,
    state: SharedState<Visibility>,
}

impl VisibilityState {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            state: SharedState::new(Visibility::Hidden),
        }
    }

    pub fn get(&self) -> Visibility {
        self.state.get()
    }

    pub fn is_visible(&self) -> bool {
        self.get() == Visibility::Visible
    }

    pub fn show(&self) {
        trace!(target: "furion_context", surface = self.name, "show");
        self.state.set(Visibility::Visible);
    }

    pub fn hide(&self) {
        trace!(target: "furion_context", surface = self.name, "hide");
        self.state.set(Visibility::Hidden);
    }

    pub fn show_callback(&self) -> Callback {
        let this = self.clone();
        Callback::new(move |()| this.show())
    }

    pub fn hide_callback(&self) -> Callback {
        let this = self.clone();
        Callback::new(move |()| this.hide())
    }

    pub fn subscribe(&self) -> watch::Receiver<Visibility> {
        self.state.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visibility_transitions() {
        let modal = VisibilityState::new("modal");
        assert_eq!(modal.get(), Visibility::Hidden);

        let show = modal.show_callback();
        let hide = modal.hide_callback();
        show.emit();
        assert!(modal.is_visible());
        show.emit();
        assert!(modal.is_visible());
        hide.emit();
        assert_eq!(modal.get(), Visibility::Hidden);
    }

    #[tokio::test]
    async fn subscribers_see_changes() {
        let state = SharedState::new(0u32);
        let mut rx = state.subscribe();
        state.setter().call(7);
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), 7);
        assert_eq!(state.get(), 7);
    }
}
