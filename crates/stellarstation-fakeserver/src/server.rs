use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::Server;

use crate::auth::JwtAuthorizer;
use crate::proto::stellar_station_service_server::StellarStationServiceServer;
use crate::service::FakeStellarStationService;

/// Serve the fake API on `addr` until the process exits.
pub async fn serve_tcp(
    addr: &str,
    service: FakeStellarStationService,
    authorizer: JwtAuthorizer,
) -> Result<(), Box<dyn std::error::Error>> {
    let listener = TcpListener::bind(addr).await?;
    serve_with_listener(listener, service, authorizer).await?;
    Ok(())
}

/// Serve the fake API on an already-bound listener.
///
/// Binding to port 0 first lets callers learn the ephemeral port before the
/// server starts accepting.
pub async fn serve_with_listener(
    listener: TcpListener,
    service: FakeStellarStationService,
    authorizer: JwtAuthorizer,
) -> Result<(), tonic::transport::Error> {
    Server::builder()
        .add_service(StellarStationServiceServer::with_interceptor(service, authorizer))
        .serve_with_incoming(TcpListenerStream::new(listener))
        .await
}
