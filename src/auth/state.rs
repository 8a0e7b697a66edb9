//! Authentication state trait and macro.

use crate::jwt::TokenAuthority;

/// Trait for state types that can validate bearer tokens.
pub trait HasAuthBackend {
    fn authority(&self) -> &TokenAuthority;
}

/// Macro to implement `HasAuthBackend` for state structs with the standard field.
///
/// The struct must have an `authority: Arc<TokenAuthority>` field.
///
/// # Example
/// ```ignore
/// use crate::impl_has_auth_backend;
///
/// #[derive(Clone)]
/// pub struct MyState {
///     pub authority: Arc<TokenAuthority>,
///     // ... other fields
/// }
///
/// impl_has_auth_backend!(MyState);
/// ```
#[macro_export]
macro_rules! impl_has_auth_backend {
    ($state_type:ty) => {
        impl $crate::auth::HasAuthBackend for $state_type {
            fn authority(&self) -> &$crate::jwt::TokenAuthority {
                &self.authority
            }
        }
    };
}
