//! Club Site Backend server.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use clubsite_backend::auth::hash_password;
use clubsite_backend::config::{Config, LogFormat};
use clubsite_backend::db::{self, Repository};
use clubsite_backend::mailer::LogMailer;
use clubsite_backend::media::{HostedMediaStore, MediaStore, UnconfiguredMediaStore};
use clubsite_backend::{create_router, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let registry = tracing_subscriber::registry().with(env_filter);
    match config.log_format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }

    tracing::info!("Starting Club Site Backend");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Bind address: {}", config.bind_addr);

    if config.service_token.is_none() {
        tracing::info!("No service token configured (CLUB_SERVICE_TOKEN); only member logins are accepted");
    }

    // Initialize database
    let pool = db::init_database(&config.db_path).await?;
    let repo = Arc::new(Repository::new(pool));

    if let Some(admin) = &config.bootstrap_admin {
        let created = repo
            .ensure_admin(&admin.email, &hash_password(&admin.password)?)
            .await?;
        if created {
            tracing::info!(email = %admin.email, "Created bootstrap administrator");
        }
    }

    let media: Arc<dyn MediaStore> = match &config.media {
        Some(media_config) => {
            tracing::info!("Media host: {}", media_config.base_url);
            Arc::new(HostedMediaStore::new(media_config.clone())?)
        }
        None => {
            tracing::warn!("No media host configured (CLUB_MEDIA_*). Image uploads are disabled!");
            Arc::new(UnconfiguredMediaStore)
        }
    };

    // Create application state
    let state = AppState {
        repo,
        media,
        mailer: Arc::new(LogMailer),
        config: Arc::new(config.clone()),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
