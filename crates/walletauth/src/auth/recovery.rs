/*
[INPUT]:  EIP-712 payload and a hex-encoded 65-byte signature
[OUTPUT]: Address of the key that produced the signature
[POS]:    Auth layer - signer recovery primitive used by the verifier
[UPDATE]: When signature encoding or recovery backend changes
*/

use alloy_primitives::Signature;

use crate::error::RecoveryError;
use crate::types::TypedPayload;

/// Recovers the signing address of a typed-data signature
pub trait SignatureRecovery: Send + Sync {
    fn recover(&self, payload: &TypedPayload, signature: &str) -> Result<String, RecoveryError>;
}

/// secp256k1 recovery over the EIP-712 signing hash
///
/// Returns the address lowercased with a `0x` prefix.
#[derive(Debug, Clone, Copy, Default)]
pub struct Eip712Recovery;

impl Eip712Recovery {
    pub fn new() -> Self {
        Self
    }
}

impl SignatureRecovery for Eip712Recovery {
    fn recover(&self, payload: &TypedPayload, signature: &str) -> Result<String, RecoveryError> {
        let hash = payload.signing_hash()?;

        let signature_hex = signature.trim();
        let signature_hex = signature_hex.strip_prefix("0x").unwrap_or(signature_hex);
        let bytes =
            hex::decode(signature_hex).map_err(|e| RecoveryError::Signature(e.to_string()))?;
        let signature =
            Signature::from_raw(&bytes).map_err(|e| RecoveryError::Signature(e.to_string()))?;

        let address = signature
            .recover_address_from_prehash(&hash)
            .map_err(|e| RecoveryError::Signature(e.to_string()))?;

        Ok(address.to_string().to_ascii_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AuthEnvelope, Domain};
    use alloy_signer::SignerSync;
    use alloy_signer_local::PrivateKeySigner;

    const TEST_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn sign(signer: &PrivateKeySigner, payload: &TypedPayload) -> String {
        let hash = payload.signing_hash().unwrap();
        let signature = signer.sign_hash_sync(&hash).unwrap();
        format!("0x{}", hex::encode(signature.as_bytes()))
    }

    #[test]
    fn test_recover_matches_signer() {
        let signer: PrivateKeySigner = TEST_KEY.parse().unwrap();
        let payload = TypedPayload::from(&AuthEnvelope::new(Domain::new("App", "1", 1), "t"));
        let signature = sign(&signer, &payload);

        let recovered = Eip712Recovery.recover(&payload, &signature).unwrap();
        assert_eq!(recovered, "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266");
    }

    #[test]
    fn test_recover_other_payload_yields_other_address() {
        let signer: PrivateKeySigner = TEST_KEY.parse().unwrap();
        let domain = Domain::new("App", "1", 1);
        let signed = TypedPayload::from(&AuthEnvelope::new(domain.clone(), "first"));
        let presented = TypedPayload::from(&AuthEnvelope::new(domain, "second"));
        let signature = sign(&signer, &signed);

        let recovered = Eip712Recovery.recover(&presented, &signature).unwrap();
        assert_ne!(recovered, "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266");
    }

    #[test]
    fn test_malformed_signature() {
        let payload = TypedPayload::from(&AuthEnvelope::new(Domain::new("App", "1", 1), "t"));

        for signature in ["", "0x", "0xzz", "0x1234"] {
            assert!(matches!(
                Eip712Recovery.recover(&payload, signature),
                Err(RecoveryError::Signature(_))
            ));
        }
    }
}
