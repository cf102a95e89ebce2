use std::sync::OnceLock;

use crate::{coordination_context, Callback, ContextHandle, SharedState};

coordination_context! {
    /// Which API description of an OpenAPI group is active.
    pub struct OpenApiGroupContext / OpenApiGroupPatch {
        active_description: Option<String>,
        set_active_description: Callback<Option<String>>,
    }
}

impl Default for OpenApiGroupContext {
    fn default() -> Self {
        Self {
            active_description: None,
            set_active_description: Callback::noop(),
        }
    }
}

impl OpenApiGroupPatch {
    pub fn bound_to(state: &SharedState<Option<String>>) -> Self {
        Self::default()
            .active_description(state.get())
            .set_active_description(state.setter())
    }
}

pub fn openapi_group_context() -> &'static ContextHandle<OpenApiGroupContext> {
    static HANDLE: OnceLock<ContextHandle<OpenApiGroupContext>> = OnceLock::new();
    HANDLE.get_or_init(|| ContextHandle::new("openapi-group", OpenApiGroupContext::default()))
}
