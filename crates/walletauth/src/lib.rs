/*
[INPUT]:  Crate modules and public type definitions
[OUTPUT]: Public walletauth crate surface
[POS]:    Crate root - module wiring
[UPDATE]: When public modules or exports change
*/

pub mod auth;
pub mod error;
pub mod http;
pub mod types;
pub mod wallet;

// Re-export commonly used types from auth
pub use auth::{
    AuthClient,
    ChallengeIssuer,
    ChallengeTransport,
    ChallengeVerifier,
    Eip712Recovery,
    JwtTokenService,
    SignatureRecovery,
    TokenService,
};

pub use error::{
    IssueError,
    ProviderError,
    RecoveryError,
    Result,
    StoreError,
    TokenError,
    TransportError,
    VerifyError,
    WalletError,
};

// Re-export commonly used types from http
pub use http::{ClientConfig, HttpChallengeTransport};

// Re-export all types
pub use types::*;

// Re-export commonly used types from wallet
pub use wallet::{
    AnnouncementChannel,
    InProcessChannel,
    JsonFileStore,
    LocalWalletProvider,
    MemoryStore,
    ProviderInfo,
    ProviderRecord,
    ProviderRegistry,
    SessionStore,
    WalletProvider,
    WalletSession,
};
