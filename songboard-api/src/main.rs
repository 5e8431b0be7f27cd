//! songboard-api - community song ranking service
//!
//! Serves the leaderboard, accepts song suggestions and exposes the admin
//! moderation endpoints over a JSON API backed by SQLite.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use songboard_common::auth::hash_password;
use songboard_common::config::{database_path, resolve_root_folder, AdminConfig, TomlConfig, ROOT_FOLDER_ENV};
use songboard_common::db::init_database;
use songboard_common::seed::demo_songs;
use songboard_common::{NewUser, Role};
use songboard_api::repository::{
    SongRepository, SqliteSongRepository, SqliteUserRepository, UserRepository,
};
use songboard_api::{build_router, AppState};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Command-line arguments for songboard-api
#[derive(Parser, Debug)]
#[command(name = "songboard-api")]
#[command(about = "Community song ranking service")]
#[command(version)]
struct Args {
    /// Port to listen on (overrides config file)
    #[arg(short, long, env = "SONGBOARD_PORT")]
    port: Option<u16>,

    /// Address to bind (overrides config file)
    #[arg(long, env = "SONGBOARD_HOST")]
    host: Option<String>,

    /// Folder holding songboard.db
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// Path to a TOML config file
    #[arg(short, long, env = "SONGBOARD_CONFIG")]
    config: Option<PathBuf>,

    /// Load the demo catalogue when the song table is empty
    #[arg(long)]
    seed_demo: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Config is read before tracing is installed so its log level can apply
    let config = TomlConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting songboard-api v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let root_folder = resolve_root_folder(args.root_folder.as_deref(), ROOT_FOLDER_ENV, &config);
    let db_path = database_path(&root_folder);
    info!("Database path: {}", db_path.display());

    let pool = init_database(&db_path)
        .await
        .context("Failed to initialize database")?;

    if let Some(admin) = &config.admin {
        ensure_admin(&SqliteUserRepository::new(pool.clone()), admin).await?;
    }

    if args.seed_demo {
        seed_demo(&SqliteSongRepository::new(pool.clone())).await?;
    }

    let state = AppState::from_pool(pool, &config).context("Failed to create metadata resolver")?;
    let app = build_router(state);

    let host = args.host.unwrap_or(config.server.host);
    let port = args.port.unwrap_or(config.server.port);
    let listener = tokio::net::TcpListener::bind((host.as_str(), port))
        .await
        .with_context(|| format!("Failed to bind to {}:{}", host, port))?;
    let addr: SocketAddr = listener.local_addr()?;
    info!("songboard-api listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Create the configured administrator unless the email is already registered
async fn ensure_admin(users: &SqliteUserRepository, admin: &AdminConfig) -> Result<()> {
    if users.find_by_email(&admin.email).await?.is_some() {
        info!("Administrator {} already exists", admin.email);
        return Ok(());
    }

    let password_hash = hash_password(&admin.password)?;
    let user = users
        .create(NewUser {
            name: admin.name.clone(),
            email: admin.email.clone(),
            password_hash,
            role: Role::Admin,
        })
        .await?;

    info!(user_id = user.id, "Created administrator {}", user.email);
    Ok(())
}

async fn seed_demo(songs: &SqliteSongRepository) -> Result<()> {
    let existing = songs.count().await?;
    if existing > 0 {
        warn!("Skipping demo seed: {} songs already stored", existing);
        return Ok(());
    }

    let demo = demo_songs();
    let total = demo.len();
    for song in demo {
        songs.create(song).await?;
    }
    info!("Seeded {} demo songs", total);
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
