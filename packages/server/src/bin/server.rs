//! Real-time chat relay for the ordertalk order backend.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin ordertalk-server
//! cargo run --bin ordertalk-server -- --host 0.0.0.0 --port 3000 \
//!     --jwt-secret change-me --directory ./directory.json
//! ```

use std::{path::PathBuf, sync::Arc, time::Duration};

use clap::Parser;
use ordertalk_server::{
    infrastructure::{
        auth::{InMemoryIdentityDirectory, JwtCredentialVerifier},
        liveness::LivenessConfig,
        registry::{InMemoryConnectionRegistry, RegistryConfig},
        repository::InMemoryMessageStore,
    },
    ui::{AppState, Server, ServerConfig},
    usecase::AuthenticateClientUseCase,
};
use ordertalk_shared::{logger::setup_logger, time::SystemClock};

#[derive(Parser, Debug)]
#[command(name = "ordertalk-server")]
#[command(about = "Real-time chat relay between users and admins", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, env = "ORDERTALK_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, env = "ORDERTALK_PORT", default_value = "8080")]
    port: u16,

    /// HS256 secret for bearer tokens; /ws/user and /ws/admin are refused without it
    #[arg(long, env = "ORDERTALK_JWT_SECRET", hide_env_values = true)]
    jwt_secret: Option<String>,

    /// JSON file listing known users and admins
    #[arg(long, env = "ORDERTALK_DIRECTORY")]
    directory: Option<PathBuf>,

    /// Seconds between liveness sweeps
    #[arg(long, env = "ORDERTALK_PING_INTERVAL_SECS", default_value = "10")]
    ping_interval_secs: u64,

    /// Seconds of silence before a connection is probed
    #[arg(long, env = "ORDERTALK_STALE_AFTER_SECS", default_value = "30")]
    stale_after_secs: u64,

    /// Maximum number of chat messages kept in memory
    #[arg(long, env = "ORDERTALK_HISTORY_CAPACITY", default_value = "1000")]
    history_capacity: usize,

    /// Evict a connection when a direct send to it fails
    #[arg(long, env = "ORDERTALK_EVICT_ON_DIRECT_FAILURE")]
    evict_on_direct_failure: bool,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(
        &["ordertalk-server", "ordertalk-shared", env!("CARGO_BIN_NAME")],
        "info",
    );

    let args = Args::parse();

    // Initialize dependencies in order:
    // 1. Clock / Registry / MessageStore
    // 2. Authentication (optional)
    // 3. AppState (UseCases)
    // 4. Server
    let clock = Arc::new(SystemClock);
    let registry = Arc::new(InMemoryConnectionRegistry::new(
        RegistryConfig {
            evict_on_direct_failure: args.evict_on_direct_failure,
        },
        clock.clone(),
    ));
    let store = Arc::new(InMemoryMessageStore::with_capacity(
        args.history_capacity,
        clock.clone(),
    ));

    let authenticate = match build_authentication(&args) {
        Ok(authenticate) => authenticate,
        Err(e) => {
            tracing::error!("Failed to load identity directory: {}", e);
            std::process::exit(1);
        }
    };

    let state = AppState::new(registry.clone(), store, clock.clone(), authenticate);
    let liveness = LivenessConfig {
        interval: Duration::from_secs(args.ping_interval_secs),
        stale_after: Duration::from_secs(args.stale_after_secs),
    };
    let config = ServerConfig {
        host: args.host,
        port: args.port,
    };

    let server = Server::new(state, registry, clock, liveness);
    if let Err(e) = server.run(&config).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

fn build_authentication(
    args: &Args,
) -> Result<Option<Arc<AuthenticateClientUseCase>>, Box<dyn std::error::Error>> {
    let Some(secret) = args.jwt_secret.as_deref() else {
        tracing::warn!("No JWT secret configured, role-scoped channels are disabled");
        return Ok(None);
    };

    let directory = match &args.directory {
        Some(path) => InMemoryIdentityDirectory::from_path(path)?,
        None => {
            tracing::warn!("No identity directory configured, every token will be rejected");
            InMemoryIdentityDirectory::default()
        }
    };
    tracing::info!("Identity directory loaded with {} entries", directory.len());

    Ok(Some(Arc::new(AuthenticateClientUseCase::new(
        Arc::new(JwtCredentialVerifier::new(secret)),
        Arc::new(directory),
    ))))
}
