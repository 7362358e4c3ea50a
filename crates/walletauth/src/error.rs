/*
[INPUT]:  Error sources (token codec, signature recovery, provider RPC, store, HTTP)
[OUTPUT]: Structured error types for the verifier and the wallet client
[POS]:    Error handling layer - unified error types for entire crate
[UPDATE]: When adding new error sources or changing the verification taxonomy
*/

use thiserror::Error;

/// Terminal outcome of a failed challenge verification.
///
/// Each variant is a distinct observable: callers alert and rate-limit on
/// the kind, so the variants must never be folded into a boolean.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerifyError {
    /// Envelope is missing its domain or message
    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    /// Challenge token is undecodable, expired, or carries a malformed address
    #[error("Invalid challenge token: {0}")]
    InvalidToken(String),

    /// Signature cannot be recovered, or recovers to a malformed address
    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    /// Signature is valid but was produced by another account
    #[error("Signature mismatch: challenge issued to {expected}, signed by {recovered}")]
    SignatureMismatch { expected: String, recovered: String },
}

impl VerifyError {
    /// Stable label for metrics and alerting
    pub fn kind(&self) -> &'static str {
        match self {
            VerifyError::InvalidMessage(_) => "invalid_message",
            VerifyError::InvalidToken(_) => "invalid_token",
            VerifyError::InvalidSignature(_) => "invalid_signature",
            VerifyError::SignatureMismatch { .. } => "signature_mismatch",
        }
    }
}

/// Challenge issuance failures
#[derive(Error, Debug)]
pub enum IssueError {
    #[error("Invalid account address: {0}")]
    InvalidAddress(String),

    #[error("Challenge TTL must be greater than zero")]
    InvalidTtl,

    #[error(transparent)]
    Token(#[from] TokenError),
}

/// Token codec failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("Challenge token expired")]
    Expired,

    #[error("Challenge token rejected: {0}")]
    Invalid(String),

    #[error("Failed to sign challenge token: {0}")]
    Signing(String),
}

/// Signature recovery failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecoveryError {
    #[error("Typed data cannot be hashed: {0}")]
    TypedData(String),

    #[error("Malformed signature: {0}")]
    Signature(String),
}

/// Error returned by a wallet provider request (EIP-1193 style codes)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Provider error {code}: {message}")]
pub struct ProviderError {
    pub code: i64,
    pub message: String,
}

impl ProviderError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn user_rejected() -> Self {
        Self::new(4001, "User rejected the request")
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(4100, message)
    }

    pub fn unsupported_method(method: &str) -> Self {
        Self::new(4200, format!("Unsupported method: {method}"))
    }

    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(-32602, message)
    }
}

/// Persisted session store failures
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store contents are not valid JSON: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Challenge transport failures
#[derive(Error, Debug)]
pub enum TransportError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with a non-success status
    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// URL parsing failed
    #[error("Invalid URL: {0}")]
    UrlParse(#[from] url::ParseError),

    /// Response body did not match the expected shape
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl TransportError {
    /// Check if the error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            TransportError::Http(_) => true,
            TransportError::Api { status, .. } => *status >= 500 || *status == 429,
            TransportError::UrlParse(_) | TransportError::InvalidResponse(_) => false,
        }
    }
}

/// Main error type for the wallet client side
#[derive(Error, Debug)]
pub enum WalletError {
    /// Signing or chain-id call while no provider is connected
    #[error("No active wallet session")]
    NoActiveSession,

    /// Provider rejected the account request or returned no accounts
    #[error("Wallet connection failed: {reason}")]
    ConnectionFailed { reason: String },

    /// Reconnect target is not among the discovered providers
    #[error("Unknown wallet provider: {uuid}")]
    UnknownProvider { uuid: String },

    /// Provider request failed after the session was established
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// Challenge transport failed
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Persisted store failed
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Serialization/deserialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Provider answered with an unexpected payload
    #[error("Invalid provider response: {0}")]
    InvalidResponse(String),
}

impl WalletError {
    /// Check if the error belongs to the session taxonomy
    pub fn is_session_error(&self) -> bool {
        matches!(
            self,
            WalletError::NoActiveSession
                | WalletError::ConnectionFailed { .. }
                | WalletError::UnknownProvider { .. }
        )
    }

    /// Check if the error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            WalletError::Transport(err) => err.is_retryable(),
            _ => false,
        }
    }
}

/// Result type alias for wallet client operations
pub type Result<T> = std::result::Result<T, WalletError>;
