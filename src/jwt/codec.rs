//! HS256 encoding and decoding of [`Claims`].
//!
//! The algorithm in the token header is checked against the pinned
//! algorithm before the decoding key is used, so a token declaring `none`
//! or any other algorithm never reaches signature verification.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::Deserialize;

use super::claims::Claims;
use super::error::JwtError;

/// The only algorithm tokens are signed and accepted with.
pub const PINNED_ALGORITHM: Algorithm = Algorithm::HS256;

/// Raw header, read as plain strings so unknown algorithms still parse.
#[derive(Deserialize)]
struct RawHeader {
    alg: String,
}

/// Signs and verifies claim sets with a shared secret.
#[derive(Clone)]
pub struct ClaimsCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    empty_secret: bool,
}

impl ClaimsCodec {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            empty_secret: secret.is_empty(),
        }
    }

    /// Sign the claims into a compact JWT.
    pub fn encode(&self, claims: &Claims) -> Result<String, JwtError> {
        if self.empty_secret {
            return Err(JwtError::SigningFailure("signing secret is empty".into()));
        }

        jsonwebtoken::encode(&Header::new(PINNED_ALGORITHM), claims, &self.encoding_key)
            .map_err(|e| JwtError::SigningFailure(e.to_string()))
    }

    /// Verify the algorithm and signature and decode the claims.
    ///
    /// Time and issuer checks are left to the caller, which owns the clock
    /// and the expected issuer.
    pub fn decode(&self, token: &str) -> Result<Claims, JwtError> {
        check_algorithm(token)?;

        let mut validation = Validation::new(PINNED_ALGORITHM);
        validation.leeway = 0;
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.set_required_spec_claims::<&str>(&[]);

        let token_data = jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &validation)?;
        Ok(token_data.claims)
    }
}

/// Reject the token unless its header declares the pinned algorithm.
fn check_algorithm(token: &str) -> Result<(), JwtError> {
    let header_b64 = token
        .split('.')
        .next()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| JwtError::Malformed("missing header".into()))?;

    let header_bytes = URL_SAFE_NO_PAD
        .decode(header_b64)
        .map_err(|e| JwtError::Malformed(format!("header is not base64url: {}", e)))?;

    let header: RawHeader = serde_json::from_slice(&header_bytes)
        .map_err(|e| JwtError::Malformed(format!("header is not valid JSON: {}", e)))?;

    if header.alg != "HS256" {
        return Err(JwtError::UnexpectedAlgorithm(header.alg));
    }

    Ok(())
}
