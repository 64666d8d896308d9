use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use routebind::{Server, ServerConfig, api};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = ServerConfig::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        addr = %config.addr,
        max_request_size = config.max_request_size,
        "routebind v{} starting",
        env!("CARGO_PKG_VERSION")
    );

    let router = api::router()?;
    let server = Server::bind(&config).await?;
    server.serve(router).await?;
    Ok(())
}
