//! Macro that turns a versioned store declaration into a `Migrations` table.

/// Map a declaration token to `Option<&str>`: `null` drops the table.
#[doc(hidden)]
#[macro_export]
macro_rules! __table_decl {
    ( null ) => {
        ::core::option::Option::None
    };
    ( $decl:literal ) => {
        ::core::option::Option::Some($decl)
    };
}

/// Declarative schema versions. Evaluates to `Result<Migrations, SchemaError>`.
///
/// ```
/// use furion_schema::define_schema;
///
/// let migrations = define_schema! {
///     version 1 => {
///         routingDiagnosis: "++id",
///     },
///     version 2 => {
///         routingDiagnosis: "++id, source",
///         explore: "++id, &slug",
///     },
/// }
/// .unwrap();
/// assert_eq!(migrations.latest().map(|v| v.0), Some(2));
/// ```
#[macro_export]
macro_rules! define_schema {
    (
        $(
            version $v:literal => {
                $( $table:ident : $decl:tt ),* $(,)?
            }
        ),* $(,)?
    ) => {{
        fn __build() -> ::core::result::Result<$crate::Migrations, $crate::SchemaError> {
            let mut migrations = $crate::Migrations::new();
            $(
                migrations.declare(
                    $v,
                    &[ $( (stringify!($table), $crate::__table_decl!($decl)) ),* ],
                )?;
            )*
            Ok(migrations)
        }
        __build()
    }};
}
