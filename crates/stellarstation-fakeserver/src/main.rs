use tracing::{info, warn};

use stellarstation_fakeserver::auth::JwtAuthorizer;
use stellarstation_fakeserver::config::FakeServerConfig;
use stellarstation_fakeserver::server;
use stellarstation_fakeserver::service::FakeStellarStationService;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = FakeServerConfig::from_env();

    let authorizer = match &config.public_key_path {
        Some(path) => JwtAuthorizer::from_file(path, &config.issuer, &config.audience)?,
        None => {
            warn!("STELLARSTATION_FAKESERVER_PUBLIC_KEY not set, accepting unauthenticated calls");
            JwtAuthorizer::disabled()
        }
    };

    let addr = format!("0.0.0.0:{}", config.port);
    info!(
        addr = %addr,
        auth = authorizer.is_enabled(),
        issuer = %config.issuer,
        audience = %config.audience,
        satellites = ?config.satellites,
        "fake StellarStation API ready"
    );

    server::serve_tcp(&addr, FakeStellarStationService::new(&config), authorizer).await
}
