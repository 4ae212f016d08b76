mod admin;
mod config;

use clap::{Parser, Subcommand};
use tracing::info;

use parley_api::AppStateInner;
use parley_api::tokens::JwtIssuer;
use parley_db::Database;

use crate::config::Config;

#[derive(Parser, Debug)]
#[command(name = "parley")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Defaults to `serve`
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API
    Serve,
    /// Operator commands against the database
    #[command(subcommand)]
    Admin(AdminCommand),
}

#[derive(Subcommand, Debug)]
enum AdminCommand {
    /// List every thread with its participants
    Threads,
    /// Delete a thread and all of its messages
    DeleteThread {
        /// Thread id
        id: i64,
    },
    /// Print an access token for a user
    Token {
        /// Username to issue the token for
        username: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging on stderr; admin commands print results on stdout
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "parley=debug,parley_api=debug,parley_db=info,tower_http=debug".into()
            }),
        )
        .init();

    match args.command {
        None | Some(Command::Serve) => serve().await,
        Some(Command::Admin(command)) => run_admin(command),
    }
}

fn run_admin(command: AdminCommand) -> anyhow::Result<()> {
    let mut out = std::io::stdout().lock();
    match command {
        AdminCommand::Threads => {
            let db = Database::open(&config::db_path_from_env())?;
            admin::list_threads(&db, &mut out)
        }
        AdminCommand::DeleteThread { id } => {
            let db = Database::open(&config::db_path_from_env())?;
            admin::delete_thread(&db, id, &mut out)
        }
        AdminCommand::Token { username } => {
            let config = Config::from_env()?;
            let db = Database::open(&config.db_path)?;
            let tokens = JwtIssuer::new(&config.tokens);
            admin::issue_token(&db, &tokens, &username, &mut out)
        }
    }
}

async fn serve() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    // Init database
    let db = Database::open(&config.db_path)?;

    let state = AppStateInner::new(db, &config.tokens, config.pagination);
    let app = parley_api::app(state);

    info!("Parley server listening on {}", config.addr);
    info!(
        "Page size {} (max {}), access token TTL {}s",
        config.pagination.default_limit,
        config.pagination.max_limit,
        config.tokens.access_ttl.as_secs()
    );

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(sigterm) => sigterm,
                Err(e) => {
                    tracing::warn!("Failed to install SIGTERM handler: {}", e);
                    ctrl_c.await.ok();
                    info!("Received Ctrl+C, shutting down...");
                    return;
                }
            };
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
