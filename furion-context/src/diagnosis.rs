use std::sync::OnceLock;

use crate::{coordination_context, Callback, ContextHandle, VisibilityState};

coordination_context! {
    /// Actions the routing-diagnosis panel exposes to nested components.
    pub struct DiagnosisContext / DiagnosisPatch {
        show_modal: Callback,
        show_drawer: Callback,
        hide_popover: Callback,
    }
}

impl Default for DiagnosisContext {
    fn default() -> Self {
        Self {
            show_modal: Callback::noop(),
            show_drawer: Callback::noop(),
            hide_popover: Callback::noop(),
        }
    }
}

impl DiagnosisPatch {
    /// Wire every action to surfaces owned by the providing ancestor.
    pub fn bound_to(
        modal: &VisibilityState,
        drawer: &VisibilityState,
        popover: &VisibilityState,
    ) -> Self {
        Self::default()
            .show_modal(modal.show_callback())
            .show_drawer(drawer.show_callback())
            .hide_popover(popover.hide_callback())
    }
}

pub fn diagnosis_context() -> &'static ContextHandle<DiagnosisContext> {
    static HANDLE: OnceLock<ContextHandle<DiagnosisContext>> = OnceLock::new();
    HANDLE.get_or_init(|| ContextHandle::new("diagnosis", DiagnosisContext::default()))
}
