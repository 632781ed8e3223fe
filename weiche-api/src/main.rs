use std::net::SocketAddr;
use thiserror::Error;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use weiche_api::{
    config::{ConfigError, Env},
    server::{self, ServerState},
};
use weiche_db::client::{DbClient, DbError};

#[derive(Debug, Error)]
enum InitError {
    #[error("Error parsing .env file: {0}")]
    Dotenv(#[from] dotenvy::Error),
    #[error("Error parsing environment: {0}")]
    Envy(#[from] envy::Error),
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("Error connecting to the database: {0}")]
    Db(#[from] DbError),
    #[error("Error binding tcp listener: {0}")]
    TcpBind(std::io::Error),
    #[error("Error serving server: {0}")]
    TcpServe(std::io::Error),
}

fn install_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "weiche_api=debug,\
                weiche_common=debug,\
                weiche_db=debug,\
                tower_http=debug,axum::rejection=trace,sqlx=debug"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn get_env() -> Result<Env, InitError> {
    if let Err(e) = dotenvy::dotenv() {
        if e.not_found() {
            debug!("No .dotenv file found");
        } else {
            return Err(e.into());
        }
    }

    envy::from_env().map_err(InitError::from)
}

async fn connect_db(env: &Env) -> Result<DbClient, InitError> {
    let db_client = match &env.database_url {
        Some(database_url) => {
            DbClient::connect(database_url, env.worker_id, env.process_id).await?
        }
        None => {
            info!("DATABASE_URL is not set, keeping everything in memory");
            DbClient::in_memory(env.worker_id, env.process_id)
        }
    };

    Ok(db_client)
}

/// Resolves on ctrl-c. If ctrl-c cannot be listened for, the server runs until
/// killed.
async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received ctrl-c, shutting down"),
        Err(err) => {
            error!(%err, "Could not listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), InitError> {
    install_tracing();
    let env = get_env()?;
    let settings = env.settings()?;
    let db_client = connect_db(&env).await?;

    let tracing_layer = TraceLayer::new_for_http();
    let app = server::app(ServerState::new(db_client, settings)).layer(tracing_layer);

    let server_address = SocketAddr::new(env.server_address, env.server_port);
    let listener = tokio::net::TcpListener::bind(server_address)
        .await
        .map_err(InitError::TcpBind)?;
    info!(%server_address, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(InitError::TcpServe)?;

    Ok(())
}
