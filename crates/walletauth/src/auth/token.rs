/*
[INPUT]:  Challenged address, TTL and the server-held secret
[OUTPUT]: Signed challenge tokens and their decoded claims
[POS]:    Auth layer - stateless, tamper-evident challenge tokens
[UPDATE]: When claim layout, algorithm or expiry rules change
*/

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::error::TokenError;

/// Claims carried by a challenge token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeClaims {
    pub address: String,
    /// Random per-token nonce; two challenges are never byte-identical
    #[serde(rename = "jti")]
    pub nonce: String,
    #[serde(rename = "iat")]
    pub issued_at: i64,
    #[serde(rename = "exp")]
    pub expires_at: i64,
}

/// Signs and verifies challenge tokens
///
/// Implementations must fail closed: an expired or altered token never
/// decodes.
pub trait TokenService: Send + Sync {
    /// Sign `{address}` into a token valid for `ttl_seconds`
    fn sign(&self, address: &str, ttl_seconds: u64) -> Result<String, TokenError>;

    /// Decode a token, rejecting expired or tampered input
    fn verify(&self, token: &str) -> Result<ChallengeClaims, TokenError>;
}

/// HS256 JWT token service
pub struct JwtTokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtTokenService {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        let secret = secret.as_ref();
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "iat"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Sign with an explicit issue time
    pub fn sign_issued_at(
        &self,
        address: &str,
        ttl_seconds: u64,
        issued_at: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let ttl = i64::try_from(ttl_seconds)
            .map_err(|_| TokenError::Signing(format!("TTL out of range: {ttl_seconds}")))?;
        let expires_at = issued_at + Duration::seconds(ttl);
        let claims = ChallengeClaims {
            address: address.to_string(),
            nonce: uuid::Uuid::new_v4().to_string(),
            issued_at: issued_at.timestamp(),
            expires_at: expires_at.timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }
}

impl TokenService for JwtTokenService {
    fn sign(&self, address: &str, ttl_seconds: u64) -> Result<String, TokenError> {
        self.sign_issued_at(address, ttl_seconds, Utc::now())
    }

    fn verify(&self, token: &str) -> Result<ChallengeClaims, TokenError> {
        decode::<ChallengeClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid(e.to_string()),
            })
    }
}

impl std::fmt::Debug for JwtTokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtTokenService").finish_non_exhaustive()
    }
}
