//! Utility macros for reducing boilerplate

/// Implement `FromRef<AppState>` for a state component.
///
/// # Example
/// ```ignore
/// impl_from_ref!(AccessResolver, resolver);
/// // Expands to:
/// impl axum::extract::FromRef<AppState> for AccessResolver {
///     fn from_ref(state: &AppState) -> Self {
///         state.resolver.clone()
///     }
/// }
/// ```
#[macro_export]
macro_rules! impl_from_ref {
    ($type:ty, $field:ident) => {
        impl axum::extract::FromRef<$crate::state::AppState> for $type {
            fn from_ref(state: &$crate::state::AppState) -> Self {
                state.$field.clone()
            }
        }
    };
}
