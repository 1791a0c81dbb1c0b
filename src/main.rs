use anyhow::{Context, Result};
use std::{env, io::ErrorKind, net::SocketAddr, path::Path};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use user_service::{
    AppState,
    config::{self, AppConfig, CliAction},
    db, routes,
};

#[tokio::main]
async fn main() -> Result<()> {
    // --- Env file, before anything reads the environment ---
    let requested_env = env::var("APP_ENV").unwrap_or_else(|_| "dev".into());
    let env_file = config::load_env_file(Path::new("."), &requested_env);

    init_tracing();
    match &env_file {
        Ok(Some(path)) => tracing::info!("Loaded environment from {}", path.display()),
        Ok(None) => tracing::warn!(
            "No .env.{} / .env.local / .env.dev found, using defaults",
            requested_env
        ),
        Err(err) => tracing::warn!("Env file not loaded: {:#}", err),
    }

    // --- Parse config + CLI action ---
    let (cfg, action) = AppConfig::from_env_and_args()?;
    tracing::debug!("Loaded config: {:?}", cfg);

    // --- Initialize SQLite connection ---
    let db = db::connect(&cfg.database_url).await?;

    // --- One-shot actions ---
    match action {
        CliAction::Migrate => {
            db::run_migrations(&db).await?;
            tracing::info!("Database migration complete.");
            return Ok(());
        }
        CliAction::CreateAdmin {
            user_name,
            password,
        } => {
            db::run_migrations(&db).await?;
            let state = AppState::new(cfg, db);
            let (user, created) = state
                .users
                .ensure_admin(&user_name, &password)
                .await
                .context("creating administrator")?;
            if created {
                tracing::info!(user_id = user.user_id, "Administrator {} created", user.user_name);
            } else {
                tracing::info!(user_id = user.user_id, "User {} promoted to administrator", user.user_name);
            }
            return Ok(());
        }
        CliAction::Serve => {}
    }

    if cfg.db_init {
        db::run_migrations(&db).await?;
    }

    cfg.print_summary();
    let addr = cfg.addr();
    let port = cfg.port;
    let host = cfg.host.clone();
    let app = routes::build_app(AppState::new(cfg, db));

    // --- Start server ---
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(anyhow::Error::new(err).context(format!("binding {}", addr))),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// `RUST_LOG` wins; otherwise `LOG_LEVEL`. Production logs are JSON lines.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into());
        EnvFilter::new(level.to_ascii_lowercase())
    });

    let production = env::var("APP_ENV").is_ok_and(|v| v.eq_ignore_ascii_case("pro"));
    if production {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
