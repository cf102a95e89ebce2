use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::{coordination_context, Callback, ContextHandle, SharedState};

/// How the explore page lays out API entries.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListType {
    #[default]
    Card,
    List,
}

impl fmt::Display for ListType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ListType::Card => "card",
            ListType::List => "list",
        })
    }
}

impl FromStr for ListType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "card" => Ok(ListType::Card),
            "list" => Ok(ListType::List),
            other => Err(format!("unknown list type '{other}'")),
        }
    }
}

coordination_context! {
    pub struct ExploreContext / ExplorePatch {
        list_type: ListType,
        set_list_type: Callback<ListType>,
    }
}

impl Default for ExploreContext {
    fn default() -> Self {
        Self {
            list_type: ListType::Card,
            set_list_type: Callback::noop(),
        }
    }
}

impl ExplorePatch {
    /// Current value plus a setter writing back into the owner's state.
    pub fn bound_to(state: &SharedState<ListType>) -> Self {
        Self::default()
            .list_type(state.get())
            .set_list_type(state.setter())
    }
}

pub fn explore_context() -> &'static ContextHandle<ExploreContext> {
    static HANDLE: OnceLock<ContextHandle<ExploreContext>> = OnceLock::new();
    HANDLE.get_or_init(|| ContextHandle::new("explore", ExploreContext::default()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_type_text() {
        assert_eq!("list".parse::<ListType>().unwrap(), ListType::List);
        assert_eq!(ListType::default().to_string(), "card");
        assert!("grid".parse::<ListType>().is_err());
        assert_eq!(serde_json::to_string(&ListType::List).unwrap(), "\"list\"");
    }
}
