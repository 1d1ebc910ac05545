use std::fs;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use devdir::auth::TokenGenerator;
use devdir::config::{DEFAULT_ALLOWED_DOMAINS, ServerConfig};
use devdir::github::GithubClient;
use devdir::server::{AppState, create_router};
use devdir::store::{SqliteStore, Store};

#[derive(Parser)]
#[command(name = "devdir")]
#[command(about = "A community directory server for student projects", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database schema
    Init {
        /// Data directory for the database
        #[arg(long, default_value = "./data")]
        data_dir: String,
    },

    /// Start the server
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(long, short, default_value = "8080")]
        port: u16,

        /// Data directory for the database
        #[arg(long, default_value = "./data")]
        data_dir: String,

        /// Email domain suffix that admits sign-ins; repeatable.
        /// Defaults to the community's school and alumni domains.
        #[arg(long = "allowed-domain")]
        allowed_domains: Vec<String>,

        /// GitHub API base URL
        #[arg(long, default_value = devdir::github::DEFAULT_API_URL)]
        github_api_url: String,
    },
}

fn run_init(data_dir: String) -> anyhow::Result<()> {
    let data_path: std::path::PathBuf = data_dir.into();
    fs::create_dir_all(&data_path)?;

    let db_path = data_path.join("devdir.db");
    let store = SqliteStore::new(&db_path)?;
    store.initialize()?;

    println!("Database initialized at {}", db_path.display());

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("devdir=info".parse()?))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { data_dir } => {
            run_init(data_dir)?;
        }
        Commands::Serve {
            host,
            port,
            data_dir,
            allowed_domains,
            github_api_url,
        } => {
            let allowed_domains = if allowed_domains.is_empty() {
                DEFAULT_ALLOWED_DOMAINS
                    .iter()
                    .map(|d| d.to_string())
                    .collect()
            } else {
                allowed_domains
            };

            let config = ServerConfig {
                host,
                port,
                data_dir: data_dir.into(),
                allowed_domains,
                github_api_url,
            };

            let store = SqliteStore::new(config.db_path())?;
            store.initialize()?;

            let state = Arc::new(AppState {
                store: Arc::new(store),
                github: GithubClient::new(config.github_api_url.clone()),
                tokens: TokenGenerator::new(),
                allowed_domains: config.allowed_domains.clone(),
            });

            let app = create_router(state);
            let addr = config.socket_addr()?;

            info!("Starting server on {}", addr);

            let listener = tokio::net::TcpListener::bind(addr).await?;
            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}
