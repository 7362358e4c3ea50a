/*
[INPUT]:  Challenge tokens, typed-data signatures and a challenge transport
[OUTPUT]: Issued envelopes, verified addresses and the client login flow
[POS]:    Auth layer - challenge/response authentication on both sides
[UPDATE]: When auth flow, token codec or recovery scheme changes
*/

pub mod client;
pub mod issuer;
pub mod recovery;
pub mod token;
pub mod verifier;

pub use client::{AuthClient, ChallengeTransport};
pub use issuer::{ChallengeIssuer, DEFAULT_CHALLENGE_TTL_SECS};
pub use recovery::{Eip712Recovery, SignatureRecovery};
pub use token::{ChallengeClaims, JwtTokenService, TokenService};
pub use verifier::ChallengeVerifier;
