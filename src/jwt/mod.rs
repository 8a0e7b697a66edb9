//! JWT token generation and validation.
//!
//! Dual-token system: short-lived access tokens carried as bearer
//! credentials, and long-lived refresh tokens carried in an HttpOnly
//! cookie. Both are HS256 and signed with the same secret. Tokens are
//! stateless; nothing is recorded server-side.

mod authority;
mod claims;
mod codec;
mod error;

pub use authority::{
    AuthorityConfig, ConfigError, DEFAULT_ACCESS_TOKEN_TTL, DEFAULT_COOKIE_NAME, DEFAULT_ISSUER,
    DEFAULT_REFRESH_TOKEN_TTL, MAX_TOKEN_TTL, TokenAuthority, unix_now,
};
pub use claims::{Claims, FRONTEND_AUDIENCE, TokenPair, TokenType};
pub use codec::{ClaimsCodec, PINNED_ALGORITHM};
pub use error::JwtError;
