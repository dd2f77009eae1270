use auth_service::{cli, server, AppContext, AuthResult, ServerConfig};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> AuthResult<()> {
    let matches = cli::new().get_matches();
    let path = matches
        .get_one::<PathBuf>("path")
        .cloned()
        .unwrap_or_else(|| PathBuf::from("."));
    let name = matches
        .get_one::<String>("name")
        .cloned()
        .unwrap_or_else(|| ".env".to_string());

    let config = ServerConfig::load(&path, &name)?;

    // Initialize logging
    let filter = EnvFilter::try_new(&config.logging.level)
        .unwrap_or_else(|_| EnvFilter::new(auth_service::config::DEFAULT_LOG_FILTER));
    let registry = tracing_subscriber::registry().with(filter);
    if config.logging.json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    if !path.join(&name).exists() {
        tracing::warn!(
            "Config file {} not found, using environment only",
            path.join(&name).display()
        );
    }

    tracing::info!("Starting auth-service v{}", env!("CARGO_PKG_VERSION"));

    let ctx = AppContext::new(config).await.map_err(|e| {
        tracing::error!("Failed to initialize: {}", e);
        e
    })?;

    server::serve(ctx).await?;

    Ok(())
}
