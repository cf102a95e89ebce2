//! UI coordination contexts: scoped dependency injection with mandatory defaults.
//!
//! An ancestor owns state (`SharedState`, `VisibilityState`, `ServerStatus`)
//! and binds callbacks to it with `Scope::provide`. Descendants call
//! `Scope::consume` and get either the nearest provided value or the
//! context's defaults, whose actions are no-ops.

pub mod macros;

pub mod callback;
pub use callback::Callback;

pub mod scope;
pub use scope::{create_coordination_context, ContextHandle, ContextValue, Scope};

pub mod state;
pub use state::{SharedState, Visibility, VisibilityState};

pub mod diagnosis;
pub use diagnosis::{diagnosis_context, DiagnosisContext, DiagnosisPatch};

pub mod explore;
pub use explore::{explore_context, ExploreContext, ExplorePatch, ListType};

pub mod openapi_group;
pub use openapi_group::{openapi_group_context, OpenApiGroupContext, OpenApiGroupPatch};

pub mod status;
pub use status::{status_context, ServerStatus, StatusContext, StatusPatch};
