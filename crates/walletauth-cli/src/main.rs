/*
[INPUT]:  CLI arguments and YAML configuration file
[OUTPUT]: Envelopes, signatures and verification results on stdout
[POS]:    Binary entry point
[UPDATE]: When changing CLI flags, subcommands, or startup flow
*/

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use walletauth_cli::{CliConfig, commands};

#[derive(Parser, Debug)]
#[command(name = "walletauth", version, about = "Wallet challenge/response authentication")]
struct Cli {
    #[arg(long = "config", value_name = "PATH")]
    config_path: PathBuf,
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    log_level: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Issue a challenge envelope for an address
    Issue {
        #[arg(long)]
        address: String,
        /// Overrides token.ttl_seconds
        #[arg(long)]
        ttl: Option<u64>,
    },
    /// Sign an envelope file with a local private key
    Sign {
        #[arg(long = "private-key", env = "WALLETAUTH_PRIVATE_KEY", hide_env_values = true)]
        private_key: String,
        #[arg(long, value_name = "FILE")]
        envelope: PathBuf,
    },
    /// Verify a signed envelope file
    Verify {
        #[arg(long, value_name = "FILE")]
        envelope: PathBuf,
        #[arg(long)]
        signature: String,
    },
    /// Authenticate a local private key against server.base_url
    Login {
        #[arg(long = "private-key", env = "WALLETAUTH_PRIVATE_KEY", hide_env_values = true)]
        private_key: String,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Cli::parse();
    init_tracing(&args.log_level)?;

    let config = CliConfig::from_file(&args.config_path).context("load config")?;
    info!(
        config_path = %args.config_path.display(),
        domain = %config.domain.name,
        chain_id = config.domain.chain_id,
        "configuration loaded"
    );

    match args.command {
        Command::Issue { address, ttl } => {
            let envelope = commands::issue(&config, &address, ttl)?;
            println!("{}", serde_json::to_string_pretty(&envelope)?);
        }
        Command::Sign {
            private_key,
            envelope,
        } => {
            let envelope = commands::read_json(&envelope)?;
            let signature =
                commands::sign(&private_key, config.domain.chain_id, &envelope).await?;
            println!("{signature}");
        }
        Command::Verify {
            envelope,
            signature,
        } => {
            let envelope = commands::read_json(&envelope)?;
            match commands::verify(&config, &envelope, &signature) {
                Ok(address) => println!("{address}"),
                Err(err) => {
                    warn!(kind = err.kind(), error = %err, "verification failed");
                    println!("{}", err.kind());
                    return Ok(ExitCode::FAILURE);
                }
            }
        }
        Command::Login { private_key } => {
            let address = commands::login(&config, &private_key).await?;
            println!("{address}");
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn init_tracing(log_level: &str) -> Result<()> {
    let filter = EnvFilter::try_new(log_level).context("invalid log level")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow!(err))
        .context("initialize tracing subscriber")?;
    Ok(())
}
