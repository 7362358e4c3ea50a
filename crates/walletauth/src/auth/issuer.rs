/*
[INPUT]:  Account address, signing domain and TTL
[OUTPUT]: Authentication envelope embedding a fresh challenge token
[POS]:    Auth layer - server side, challenge issuance
[UPDATE]: When the Authentication schema or TTL policy changes
*/

use std::sync::Arc;

use tracing::debug;

use crate::auth::token::TokenService;
use crate::error::IssueError;
use crate::types::{AuthEnvelope, Domain, is_valid_address};

/// Default challenge lifetime
pub const DEFAULT_CHALLENGE_TTL_SECS: u64 = 30;

/// Builds challenge envelopes
///
/// Holds no per-challenge state. Every call asks the token service for a
/// new token; nothing is cached.
#[derive(Clone)]
pub struct ChallengeIssuer {
    tokens: Arc<dyn TokenService>,
}

impl ChallengeIssuer {
    pub fn new(tokens: Arc<dyn TokenService>) -> Self {
        Self { tokens }
    }

    /// Issue a challenge with [`DEFAULT_CHALLENGE_TTL_SECS`]
    pub fn issue_default(
        &self,
        address: &str,
        domain: &Domain,
    ) -> Result<AuthEnvelope, IssueError> {
        self.issue(address, domain, DEFAULT_CHALLENGE_TTL_SECS)
    }

    pub fn issue(
        &self,
        address: &str,
        domain: &Domain,
        ttl_seconds: u64,
    ) -> Result<AuthEnvelope, IssueError> {
        if !is_valid_address(address) {
            return Err(IssueError::InvalidAddress(address.to_string()));
        }
        if ttl_seconds == 0 {
            return Err(IssueError::InvalidTtl);
        }

        let challenge = self.tokens.sign(address, ttl_seconds)?;
        debug!(
            address = %address,
            domain = %domain.name,
            chain_id = domain.chain_id,
            ttl_seconds,
            "challenge issued"
        );

        Ok(AuthEnvelope::new(domain.clone(), challenge))
    }
}
