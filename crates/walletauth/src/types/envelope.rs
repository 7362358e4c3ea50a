/*
[INPUT]:  Signing domain and challenge token
[OUTPUT]: EIP-712 authentication envelope in its JSON wire shape
[POS]:    Data layer - payload shared by issuer, wallet and verifier
[UPDATE]: When the Authentication schema or domain fields change
*/

use serde::{Deserialize, Serialize};

pub const AUTHENTICATION_TYPE: &str = "Authentication";
pub const EIP712_DOMAIN_TYPE: &str = "EIP712Domain";

/// EIP-712 signing context
///
/// Part of the signed payload, so issuer and verifier must agree on it
/// field for field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Domain {
    pub name: String,
    pub version: String,
    pub chain_id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verifying_contract: Option<String>,
}

impl Domain {
    pub fn new(name: impl Into<String>, version: impl Into<String>, chain_id: u64) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            chain_id,
            verifying_contract: None,
        }
    }

    pub fn with_verifying_contract(mut self, contract: impl Into<String>) -> Self {
        self.verifying_contract = Some(contract.into());
        self
    }

    /// `EIP712Domain` field list matching the populated fields
    pub fn type_fields(&self) -> Vec<TypeField> {
        let mut fields = vec![
            TypeField::new("name", "string"),
            TypeField::new("version", "string"),
            TypeField::new("chainId", "uint256"),
        ];
        if self.verifying_contract.is_some() {
            fields.push(TypeField::new("verifyingContract", "address"));
        }
        fields
    }
}

/// One `{name, type}` entry of a struct definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeField {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl TypeField {
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthTypes {
    #[serde(rename = "EIP712Domain")]
    pub eip712_domain: Vec<TypeField>,
    #[serde(rename = "Authentication")]
    pub authentication: Vec<TypeField>,
}

impl AuthTypes {
    /// Canonical schema: `Authentication { string challenge }`
    pub fn for_domain(domain: &Domain) -> Self {
        Self {
            eip712_domain: domain.type_fields(),
            authentication: vec![TypeField::new("challenge", "string")],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthMessage {
    pub challenge: String,
}

/// Typed-data envelope a wallet signs to answer a challenge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthEnvelope {
    pub domain: Domain,
    pub types: AuthTypes,
    pub primary_type: String,
    pub message: AuthMessage,
}

impl AuthEnvelope {
    pub fn new(domain: Domain, challenge: impl Into<String>) -> Self {
        let types = AuthTypes::for_domain(&domain);
        Self {
            domain,
            types,
            primary_type: AUTHENTICATION_TYPE.to_string(),
            message: AuthMessage {
                challenge: challenge.into(),
            },
        }
    }

    pub fn challenge(&self) -> &str {
        &self.message.challenge
    }
}
