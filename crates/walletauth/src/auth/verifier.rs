/*
[INPUT]:  Signed authentication envelope (JSON) and signature
[OUTPUT]: Authenticated address or a distinct failure kind
[POS]:    Auth layer - server side, the protocol's decision point
[UPDATE]: When verification order or the failure taxonomy changes
*/

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::auth::recovery::SignatureRecovery;
use crate::auth::token::TokenService;
use crate::error::{TokenError, VerifyError};
use crate::types::envelope::AUTHENTICATION_TYPE;
use crate::types::{
    AuthEnvelope, Domain, TypeField, TypedPayload, addresses_match, is_valid_address,
};

/// Checks a signed challenge envelope
///
/// Stateless: freshness comes only from the token TTL, so a captured
/// (envelope, signature) pair replays until the token expires.
#[derive(Clone)]
pub struct ChallengeVerifier {
    tokens: Arc<dyn TokenService>,
    recovery: Arc<dyn SignatureRecovery>,
}

impl ChallengeVerifier {
    pub fn new(tokens: Arc<dyn TokenService>, recovery: Arc<dyn SignatureRecovery>) -> Self {
        Self { tokens, recovery }
    }

    /// Verify a typed envelope
    pub fn verify_envelope(
        &self,
        envelope: &AuthEnvelope,
        signature: &str,
    ) -> Result<String, VerifyError> {
        let value = serde_json::to_value(envelope)
            .map_err(|e| VerifyError::InvalidMessage(e.to_string()))?;
        self.verify(&value, signature)
    }

    /// Verify an envelope as received on the wire
    ///
    /// Steps short-circuit in order: shape, token, claim address, signer
    /// recovery, recovered address, equality.
    pub fn verify(&self, envelope: &Value, signature: &str) -> Result<String, VerifyError> {
        let result = self.verify_inner(envelope, signature);
        match &result {
            Ok(address) => debug!(address = %address, "challenge verified"),
            Err(err) => warn!(kind = err.kind(), error = %err, "challenge verification failed"),
        }
        result
    }

    fn verify_inner(&self, envelope: &Value, signature: &str) -> Result<String, VerifyError> {
        let domain = present(envelope, "domain")
            .ok_or_else(|| VerifyError::InvalidMessage("envelope has no domain".to_string()))?;
        let message = present(envelope, "message")
            .ok_or_else(|| VerifyError::InvalidMessage("envelope has no message".to_string()))?;
        let domain: Domain = serde_json::from_value(domain.clone())
            .map_err(|e| VerifyError::InvalidMessage(format!("malformed domain: {e}")))?;

        let challenge = message
            .get("challenge")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let claims = self.tokens.verify(challenge).map_err(|e| match e {
            TokenError::Expired => VerifyError::InvalidToken("challenge expired".to_string()),
            other => VerifyError::InvalidToken(other.to_string()),
        })?;
        if !is_valid_address(&claims.address) {
            return Err(VerifyError::InvalidToken(format!(
                "token embeds malformed address {}",
                claims.address
            )));
        }

        let fields = authentication_fields(envelope);
        let payload = TypedPayload::authentication(domain, fields, message.clone());
        let recovered = self
            .recovery
            .recover(&payload, signature)
            .map_err(|e| VerifyError::InvalidSignature(e.to_string()))?;
        if !is_valid_address(&recovered) {
            return Err(VerifyError::InvalidSignature(format!(
                "signature recovers to malformed address {recovered}"
            )));
        }

        if !addresses_match(&recovered, &claims.address) {
            return Err(VerifyError::SignatureMismatch {
                expected: claims.address,
                recovered,
            });
        }

        Ok(recovered)
    }
}

fn present<'a>(envelope: &'a Value, key: &str) -> Option<&'a Value> {
    envelope.get(key).filter(|value| !value.is_null())
}

// Missing or malformed definitions leave recovery to fail on its own.
fn authentication_fields(envelope: &Value) -> Vec<TypeField> {
    envelope
        .get("types")
        .and_then(|types| types.get(AUTHENTICATION_TYPE))
        .and_then(|fields| serde_json::from_value(fields.clone()).ok())
        .unwrap_or_default()
}
