use std::sync::OnceLock;

use tokio::sync::watch;
use tracing::info;

use crate::{coordination_context, Callback, ContextHandle, SharedState};

/// "Server online" flag. Owned by the app root and handed down through
/// [`status_context`], never kept in a global.
#[derive(Clone, Debug, Default)]
pub struct ServerStatus {
    online: SharedState<bool>,
}

impl ServerStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_online(&self) -> bool {
        self.online.get()
    }

    pub fn set_online(&self, online: bool) {
        if self.is_online() != online {
            info!(online, "server status changed");
        }
        self.online.set(online);
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.online.subscribe()
    }

    pub fn setter(&self) -> Callback<bool> {
        let this = self.clone();
        Callback::new(move |online| this.set_online(online))
    }
}

coordination_context! {
    pub struct StatusContext / StatusPatch {
        online: bool,
        set_online: Callback<bool>,
    }
}

impl Default for StatusContext {
    fn default() -> Self {
        Self {
            online: false,
            set_online: Callback::noop(),
        }
    }
}

impl StatusPatch {
    pub fn bound_to(status: &ServerStatus) -> Self {
        Self::default()
            .online(status.is_online())
            .set_online(status.setter())
    }
}

pub fn status_context() -> &'static ContextHandle<StatusContext> {
    static HANDLE: OnceLock<ContextHandle<StatusContext>> = OnceLock::new();
    HANDLE.get_or_init(|| ContextHandle::new("server-status", StatusContext::default()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setter_updates_owner() {
        let status = ServerStatus::new();
        assert!(!status.is_online());
        status.setter().call(true);
        assert!(status.is_online());
    }
}
