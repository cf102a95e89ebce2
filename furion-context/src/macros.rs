//! Declares a context value together with its patch type and merge rule.

/// ```
/// use furion_context::{coordination_context, Callback, ContextValue};
///
/// coordination_context! {
///     /// Toolbar actions.
///     pub struct Toolbar / ToolbarPatch {
///         collapsed: bool,
///         toggle: Callback,
///     }
/// }
///
/// let base = Toolbar { collapsed: false, toggle: Callback::noop() };
/// let next = base.merge(ToolbarPatch::default().collapsed(true));
/// assert!(next.collapsed);
/// assert!(next.toggle.same(&base.toggle));
/// ```
#[macro_export]
macro_rules! coordination_context {
    (
        $(#[$meta:meta])*
        pub struct $Name:ident / $Patch:ident {
            $( $(#[$fmeta:meta])* $field:ident : $ty:ty ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Debug)]
        pub struct $Name {
            $( $(#[$fmeta])* pub $field: $ty, )*
        }

        #[doc = concat!("Partial override for [`", stringify!($Name), "`]; unset fields inherit.")]
        #[derive(Clone, Debug, Default)]
        pub struct $Patch {
            $( pub $field: ::core::option::Option<$ty>, )*
        }

        impl $Patch {
            $(
                pub fn $field(mut self, value: $ty) -> Self {
                    self.$field = ::core::option::Option::Some(value);
                    self
                }
            )*
        }

        impl $crate::ContextValue for $Name {
            type Patch = $Patch;

            fn merge(&self, patch: $Patch) -> Self {
                Self {
                    $( $field: patch.$field.unwrap_or_else(|| self.$field.clone()), )*
                }
            }
        }
    };
}
