/*
[INPUT]:  Domain, struct definitions, primary type and message JSON
[OUTPUT]: Generic EIP-712 payload and its signing hash
[POS]:    Data layer - typed-data hashing shared by signer and recovery
[UPDATE]: When domain fields or hashing backend change
*/

use std::collections::BTreeMap;

use alloy_dyn_abi::TypedData;
use alloy_primitives::B256;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::RecoveryError;
use crate::types::envelope::{AUTHENTICATION_TYPE, AuthEnvelope, Domain, TypeField};

/// Any EIP-712 payload whose domain fits [`Domain`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypedPayload {
    pub domain: Domain,
    pub types: BTreeMap<String, Vec<TypeField>>,
    pub primary_type: String,
    pub message: Value,
}

impl TypedPayload {
    pub fn new(
        domain: Domain,
        types: BTreeMap<String, Vec<TypeField>>,
        primary_type: impl Into<String>,
        message: Value,
    ) -> Self {
        Self {
            domain,
            types,
            primary_type: primary_type.into(),
            message,
        }
    }

    /// Payload restricted to the `Authentication` struct
    pub fn authentication(domain: Domain, fields: Vec<TypeField>, message: Value) -> Self {
        let types = BTreeMap::from([(AUTHENTICATION_TYPE.to_string(), fields)]);
        Self::new(domain, types, AUTHENTICATION_TYPE, message)
    }

    /// EIP-712 digest a wallet signs for this payload
    pub fn signing_hash(&self) -> Result<B256, RecoveryError> {
        let typed_data: TypedData = serde_json::from_value(self.to_hashable_json())
            .map_err(|e| RecoveryError::TypedData(e.to_string()))?;
        typed_data
            .eip712_signing_hash()
            .map_err(|e| RecoveryError::TypedData(e.to_string()))
    }

    // chainId goes over as a hex quantity so the uint256 decoder never sees a JSON number
    fn to_hashable_json(&self) -> Value {
        let mut domain = json!({
            "name": self.domain.name,
            "version": self.domain.version,
            "chainId": format!("{:#x}", self.domain.chain_id),
        });
        if let Some(contract) = &self.domain.verifying_contract {
            domain["verifyingContract"] = json!(contract);
        }
        json!({
            "domain": domain,
            "types": self.types,
            "primaryType": self.primary_type,
            "message": self.message,
        })
    }
}

impl From<&AuthEnvelope> for TypedPayload {
    fn from(envelope: &AuthEnvelope) -> Self {
        Self::authentication(
            envelope.domain.clone(),
            envelope.types.authentication.clone(),
            json!({ "challenge": envelope.message.challenge }),
        )
    }
}
