//! Session authentication.
//!
//! Access tokens travel as `Authorization: Bearer` credentials and are
//! checked by the gate. Refresh tokens only ever travel in the HttpOnly
//! refresh cookie and are exchanged for a new pair by the rotator.

mod cookie;
mod errors;
mod gate;
mod ip;
mod password;
mod rotator;
mod state;

pub use cookie::{COOKIE_PATH, CookieDescriptor, CookieFactory, get_cookie};
pub use errors::AuthError;
pub use gate::{BEARER_SCHEME, BearerAuth, authorize, bearer_token, require_bearer};
pub use ip::{ClientIpHeader, extract_client_ip};
pub use password::{
    MAX_PASSWORD_LENGTH, MIN_PASSWORD_LENGTH, PasswordError, PolicyViolation,
    check_password_policy, hash_password, verify_password, verify_password_or_dummy,
};
pub use rotator::SessionRotator;
pub use state::HasAuthBackend;
