/*
[INPUT]:  CLI arguments, YAML configuration file
[OUTPUT]: Challenges, session tokens, and identities printed as JSON
[POS]:    Binary entry point
[UPDATE]: When changing CLI flags, subcommands, or startup flow
*/

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use w3social_auth::{
    Address, AuthCoordinator, AuthError, AuthRequest, EvmWalletSigner, IdentityUpdate,
    SystemClock, WalletSigner, auth::TracingEventSink,
};
use w3social_auth_cli::{JsonFileStore, ServiceConfig, cli::init::run_init};

#[derive(Parser, Debug)]
#[command(name = "w3social-auth", version, about = "Wallet-signature authentication service")]
struct Cli {
    #[arg(long = "config", value_name = "PATH", default_value = "w3social-auth.yaml", global = true)]
    config_path: PathBuf,
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info", global = true)]
    log_level: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a fresh configuration with a random token secret
    Init {
        /// Defaults to the --config path
        #[arg(long, value_name = "PATH")]
        output: Option<PathBuf>,
        #[arg(long = "data-dir", value_name = "PATH")]
        data_dir: Option<PathBuf>,
        #[arg(long)]
        force: bool,
    },
    #[command(flatten)]
    Service(ServiceCommand),
}

/// Subcommands that operate on a loaded configuration
#[derive(Subcommand, Debug)]
enum ServiceCommand {
    /// Issue a challenge for an address
    Challenge {
        #[arg(long)]
        address: String,
    },
    /// Exchange a signed challenge for a session token
    Authenticate {
        #[arg(long)]
        address: String,
        #[arg(long)]
        message: String,
        #[arg(long)]
        signature: String,
    },
    /// Run the full exchange with a local private key
    Login {
        #[arg(long = "private-key", value_name = "HEX")]
        private_key: String,
    },
    /// Verify a session token and print its claims
    Verify {
        #[arg(long)]
        token: String,
    },
    /// Print the public identity for an address
    Profile {
        #[arg(long)]
        address: String,
    },
    /// Edit the token holder's profile
    UpdateProfile {
        #[arg(long)]
        token: String,
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        bio: Option<String>,
        #[arg(long = "avatar-url")]
        avatar_url: Option<String>,
        #[arg(long = "cover-url")]
        cover_url: Option<String>,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ChallengeOutput<'a> {
    address: &'a Address,
    nonce: &'a str,
    message: &'a str,
    expires_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionOutput<'a> {
    token: &'a str,
    expires_at: chrono::DateTime<chrono::Utc>,
    created: bool,
    identity: &'a w3social_auth::PublicIdentity,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(&args.log_level)?;

    let command = match args.command {
        Command::Init {
            output,
            data_dir,
            force,
        } => {
            let output = output.unwrap_or(args.config_path);
            run_init(&output, data_dir, force)?;
            println!("{}", output.display());
            return Ok(());
        }
        Command::Service(command) => command,
    };

    let config = ServiceConfig::from_file(&args.config_path).context("load config")?;
    info!(
        config_path = %args.config_path.display(),
        data_dir = %config.storage.data_dir.display(),
        "configuration loaded"
    );
    let coordinator = build_coordinator(&config).await?;

    match command {
        ServiceCommand::Challenge { address } => {
            let address = parse_address(&address)?;
            let nonce = coordinator
                .request_challenge(&address)
                .await
                .map_err(auth_failure)?;
            print_json(&ChallengeOutput {
                address: &nonce.address,
                nonce: &nonce.value,
                message: &nonce.message,
                expires_at: nonce.expires_at,
            })
        }
        ServiceCommand::Authenticate {
            address,
            message,
            signature,
        } => {
            let request = AuthRequest {
                wallet_address: address,
                message,
                signature,
            };
            let outcome = coordinator
                .authenticate_request(&request)
                .await
                .map_err(auth_failure)?;
            print_json(&SessionOutput {
                token: outcome.token.as_str(),
                expires_at: outcome.token.expires_at(),
                created: outcome.created,
                identity: &outcome.identity,
            })
        }
        ServiceCommand::Login { private_key } => {
            let wallet = EvmWalletSigner::new(&private_key).map_err(|err| anyhow!(err))?;
            let address = wallet.address();
            let nonce = coordinator
                .request_challenge(&address)
                .await
                .map_err(auth_failure)?;
            let signature = wallet
                .sign_message(&nonce.message)
                .await
                .map_err(auth_failure)?;
            debug!(address = %address, signature = ?signature, "challenge signed");

            let outcome = coordinator
                .authenticate(&address, &nonce.message, &signature)
                .await
                .map_err(auth_failure)?;
            print_json(&SessionOutput {
                token: outcome.token.as_str(),
                expires_at: outcome.token.expires_at(),
                created: outcome.created,
                identity: &outcome.identity,
            })
        }
        ServiceCommand::Verify { token } => {
            let claims = coordinator.verify_session(&token).map_err(auth_failure)?;
            print_json(&claims)
        }
        ServiceCommand::Profile { address } => {
            let address = parse_address(&address)?;
            let identity = coordinator.profile(&address).await.map_err(auth_failure)?;
            print_json(&identity)
        }
        ServiceCommand::UpdateProfile {
            token,
            username,
            bio,
            avatar_url,
            cover_url,
        } => {
            let update = IdentityUpdate {
                username,
                bio,
                avatar_url,
                cover_url,
            };
            let identity = coordinator
                .update_profile(&token, &update)
                .await
                .map_err(auth_failure)?;
            print_json(&identity)
        }
    }
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

async fn build_coordinator(config: &ServiceConfig) -> Result<AuthCoordinator> {
    let store = Arc::new(
        JsonFileStore::open(&config.storage.data_dir)
            .await
            .context("open storage")?,
    );
    let coordinator = AuthCoordinator::new(
        &config.auth,
        store.clone(),
        store,
        Arc::new(SystemClock),
    )
    .map_err(|err| anyhow!(err))
    .context("build coordinator")?
    .with_event_sink(Arc::new(TracingEventSink));

    let purged = coordinator
        .nonce_issuer()
        .purge_expired()
        .await
        .map_err(auth_failure)?;
    if purged > 0 {
        debug!(purged, "expired challenges removed");
    }
    Ok(coordinator)
}

fn parse_address(raw: &str) -> Result<Address> {
    raw.parse::<Address>()
        .map_err(|err| anyhow!(err))
        .context("invalid wallet address")
}

fn auth_failure(err: AuthError) -> anyhow::Error {
    anyhow!("{}: {err}", err.kind())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("serialize output")?;
    println!("{json}");
    Ok(())
}
