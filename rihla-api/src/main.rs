use anyhow::Context;
use rihla_api::{app, ApiSettings, AppState, AuthConfig};
use rihla_shared::{Language, PageLimits};
use std::net::SocketAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rihla_api=debug,rihla_core=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = rihla_store::app_config::Config::load().context("Failed to load config")?;
    tracing::info!("Starting Rihla API on port {}", config.server.port);

    let db = rihla_store::DbClient::new(&config.database.url, config.database.max_connections)
        .await
        .context("Failed to connect to Postgres")?;
    db.migrate().await.context("Failed to run migrations")?;

    let default_language: Language = config
        .content
        .default_language
        .parse()
        .context("Invalid content.default_language")?;

    let settings = ApiSettings {
        page_limits: PageLimits {
            default_limit: config.pagination.default_limit,
            max_limit: config.pagination.max_limit,
        },
        default_language,
        expose_error_details: config.api.expose_error_details,
    };
    let auth = AuthConfig {
        secret: config.auth.session_secret.clone(),
        expiration: config.auth.session_ttl_seconds,
    };

    let app = app(AppState::postgres(&db, auth, settings));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.context("Failed to bind listener")?;
    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
