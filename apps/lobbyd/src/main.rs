use std::{path::PathBuf, sync::Arc, time::Duration};

use {
    anyhow::{Context, Result},
    async_trait::async_trait,
    clap::{Parser, Subcommand},
    tracing::info,
};

use {
    lobbykit_actions::{CosmeticService, NullCatalog},
    lobbykit_authflow::{AuthFlow, IdentityProvider, InitiateOutcome, PollOutcome},
    lobbykit_client::{ClientConnector, ClientError, SessionClient},
    lobbykit_commands::{AdminRoster, CommandRouter},
    lobbykit_common::AccountCredential,
    lobbykit_config::Config,
    lobbykit_pool::SessionPool,
    lobbykit_store::{CredentialStore, SqliteStore},
};

/// Session-pool daemon: operates a fleet of game-account sessions, routes
/// chat commands to them, and links end-user accounts through the identity
/// provider's device-authorization flow.
#[derive(Parser, Debug)]
#[command(version)]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(long, env = "LOBBYD_CONFIG", default_value = "lobbykit.toml")]
    config: PathBuf,

    /// Override the database URL from the configuration file.
    #[arg(long, env = "LOBBYD_DATABASE_URL")]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Launch every stored account session and serve chat commands (default).
    Run,
    /// Link an end-user account via the device-authorization flow.
    Link {
        /// End-user id to link.
        #[arg(long)]
        user: String,
    },
    /// Link with a one-time authorization code obtained in the browser.
    ManualLink {
        #[arg(long)]
        user: String,
        #[arg(long)]
        code: String,
    },
}

/// Stands in until the game transport adapter lands; every open reports the
/// missing transport so the daemon stays up with an empty pool.
// TODO: replace with the real game transport adapter once it lands.
struct OfflineConnector;

#[async_trait]
impl ClientConnector for OfflineConnector {
    async fn open(
        &self,
        _credential: &AccountCredential,
    ) -> std::result::Result<Arc<dyn SessionClient>, ClientError> {
        Err(ClientError::Transport(
            "no game transport configured".into(),
        ))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    dotenvy::dotenv().ok();
    let args = Args::parse();

    let mut config =
        Config::load_or_default(&args.config).context("failed to load configuration")?;
    if let Some(url) = args.database_url {
        config.database_url = url;
    }

    let store: Arc<dyn CredentialStore> = Arc::new(
        SqliteStore::connect(&config.database_url)
            .await
            .context("failed to open credential store")?,
    );

    match args.command.unwrap_or(Command::Run) {
        Command::Run => run(config, store).await,
        Command::Link { user } => link(config, store, &user).await,
        Command::ManualLink { user, code } => manual_link(config, store, &user, &code).await,
    }
}

async fn run(config: Config, store: Arc<dyn CredentialStore>) -> Result<()> {
    let roster = match &config.roster_path {
        Some(path) => Arc::new(AdminRoster::load(path.clone(), config.admins.clone())),
        None => Arc::new(AdminRoster::new(config.admins.clone())),
    };
    let router = Arc::new(CommandRouter::new(
        config.command_marker,
        roster,
        CosmeticService::new(Arc::new(NullCatalog)),
    ));
    let pool = SessionPool::new(
        Arc::new(OfflineConnector),
        router,
        config.friend_ceiling,
        Duration::from_millis(config.echo_window_ms),
    );

    let credentials = store
        .accounts()
        .await
        .context("failed to list stored accounts")?;
    info!(accounts = credentials.len(), "starting session pool");
    pool.launch_all(credentials, Duration::from_millis(config.launch_gap_ms))
        .await;

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("shutting down");
    pool.stop_all().await;
    Ok(())
}

async fn link(config: Config, store: Arc<dyn CredentialStore>, user: &str) -> Result<()> {
    let flow = AuthFlow::new(IdentityProvider::new(config.provider), store);

    let prompt = match flow.initiate(user).await {
        InitiateOutcome::Prompt(prompt) => prompt,
        InitiateOutcome::ManualFallback => {
            println!("The identity provider refused the device flow.");
            println!("Obtain a one-time authorization code in your browser, then run:");
            println!("  lobbyd manual-link --user {user} --code <code>");
            return Ok(());
        },
    };

    println!("Open {}", prompt.activation_url);
    println!(
        "and enter the code {} within {} seconds.",
        prompt.user_code,
        prompt.expires_in.as_secs()
    );

    // The poll cadence is ours to own; the flow only answers one round-trip
    // at a time.
    loop {
        tokio::time::sleep(prompt.poll_interval).await;
        match flow.poll(user).await {
            PollOutcome::Pending => continue,
            PollOutcome::Success(display_name) => {
                println!("Linked as {display_name}.");
                return Ok(());
            },
            PollOutcome::Expired => {
                println!("The code expired before it was approved. Run link again.");
                return Ok(());
            },
            PollOutcome::Denied => {
                println!("The authorization was denied.");
                return Ok(());
            },
            PollOutcome::Error(detail) => {
                println!("Poll failed ({detail}), retrying...");
            },
        }
    }
}

async fn manual_link(
    config: Config,
    store: Arc<dyn CredentialStore>,
    user: &str,
    code: &str,
) -> Result<()> {
    let flow = AuthFlow::new(IdentityProvider::new(config.provider), store);
    match flow.manual_login(user, code).await {
        PollOutcome::Success(display_name) => println!("Linked as {display_name}."),
        PollOutcome::Error(detail) => println!("Login failed: {detail}"),
        other => println!("Login failed: {other:?}"),
    }
    Ok(())
}
