/*
[INPUT]:  YAML configuration file and WALLETAUTH__* environment overrides
[OUTPUT]: Parsed CLI configuration
[POS]:    Configuration layer - signing domain, token secret, verifier endpoint
[UPDATE]: When adding new configuration options
*/

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use walletauth::Domain;
use walletauth::auth::DEFAULT_CHALLENGE_TTL_SECS;
use walletauth::http::ClientConfig;

const ENV_PREFIX: &str = "WALLETAUTH";
const ENV_SEPARATOR: &str = "__";

/// Top-level configuration for the walletauth CLI
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CliConfig {
    /// Signing domain embedded in every challenge
    pub domain: DomainConfig,
    /// Challenge token settings
    pub token: TokenConfig,
    /// Remote verifier used by `login`
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DomainConfig {
    pub name: String,
    pub version: String,
    pub chain_id: u64,
    #[serde(default)]
    pub verifying_contract: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TokenConfig {
    /// HMAC secret shared by issuer and verifier
    pub secret: String,
    #[serde(default = "default_ttl_seconds")]
    pub ttl_seconds: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_ttl_seconds() -> u64 {
    DEFAULT_CHALLENGE_TTL_SECS
}

fn default_timeout_secs() -> u64 {
    30
}

impl DomainConfig {
    pub fn to_domain(&self) -> Domain {
        let domain = Domain::new(&self.name, &self.version, self.chain_id);
        match &self.verifying_contract {
            Some(contract) => domain.with_verifying_contract(contract),
            None => domain,
        }
    }
}

impl ServerConfig {
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            timeout: Duration::from_secs(self.timeout_secs),
            ..ClientConfig::default()
        }
    }
}

impl CliConfig {
    /// Load configuration from a file, then apply environment overrides
    ///
    /// `WALLETAUTH__TOKEN__SECRET=...` overrides `token.secret`.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config: Self = Config::builder()
            .add_source(File::from(path))
            .add_source(Environment::with_prefix(ENV_PREFIX).separator(ENV_SEPARATOR))
            .build()
            .with_context(|| format!("read config {}", path.display()))?
            .try_deserialize()
            .context("parse config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.token.secret.trim().is_empty() {
            bail!("token.secret must not be empty");
        }
        if self.token.ttl_seconds == 0 {
            bail!("token.ttl_seconds must be greater than zero");
        }
        if self.domain.name.trim().is_empty() {
            bail!("domain.name must not be empty");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn write_config(content: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("walletauth-cli-config-{}.yaml", uuid::Uuid::new_v4()));
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_load_with_defaults() {
        let path = write_config(
            r#"
domain:
  name: App
  version: "1"
  chain_id: 1
token:
  secret: s3cret
"#,
        );

        let config = CliConfig::from_file(&path).unwrap();
        assert_eq!(config.token.ttl_seconds, 30);
        assert_eq!(config.server.timeout_secs, 30);
        assert!(config.server.base_url.is_none());
        assert_eq!(config.domain.to_domain(), Domain::new("App", "1", 1));

        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_verifying_contract_carried_into_domain() {
        let path = write_config(
            r#"
domain:
  name: App
  version: "2"
  chain_id: 137
  verifying_contract: "0xCcCCccccCCCCcCCCCCCcCcCccCcCCCcCcccccccC"
token:
  secret: s3cret
  ttl_seconds: 60
server:
  base_url: http://localhost:8080
  timeout_secs: 5
"#,
        );

        let config = CliConfig::from_file(&path).unwrap();
        let domain = config.domain.to_domain();
        assert_eq!(
            domain.verifying_contract.as_deref(),
            Some("0xCcCCccccCCCCcCCCCCCcCcCccCcCCCcCcccccccC")
        );
        assert_eq!(domain.chain_id, 137);
        assert_eq!(config.server.client_config().timeout, Duration::from_secs(5));

        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_rejects_empty_secret_and_zero_ttl() {
        let path = write_config(
            r#"
domain: { name: App, version: "1", chain_id: 1 }
token: { secret: "", ttl_seconds: 30 }
"#,
        );
        assert!(CliConfig::from_file(&path).is_err());
        std::fs::remove_file(path).unwrap();

        let path = write_config(
            r#"
domain: { name: App, version: "1", chain_id: 1 }
token: { secret: s3cret, ttl_seconds: 0 }
"#,
        );
        assert!(CliConfig::from_file(&path).is_err());
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_missing_file_is_error() {
        assert!(CliConfig::from_file("/nonexistent/walletauth.yaml").is_err());
    }
}
