use tonic::service::interceptor::InterceptedService;
use tonic::transport::Channel;
use tracing::debug;

use crate::channel::{AuthenticatedChannel, BearerAuth, MAX_MESSAGE_SIZE};
use crate::proto::stellar_station_service_client::StellarStationServiceClient;
use crate::proto::{ListUpcomingAvailablePassesRequest, ListUpcomingAvailablePassesResponse};

/// Something that can list upcoming passes for a satellite.
#[tonic::async_trait]
pub trait PassLister {
    async fn list_upcoming_passes(
        &mut self,
        satellite_id: &str,
    ) -> Result<ListUpcomingAvailablePassesResponse, ClientError>;
}

/// Client for the `ListUpcomingAvailablePasses` RPC.
pub struct PassClient {
    inner: StellarStationServiceClient<InterceptedService<Channel, BearerAuth>>,
}

impl PassClient {
    pub fn new(channel: &AuthenticatedChannel) -> Self {
        let inner = StellarStationServiceClient::with_interceptor(channel.channel(), channel.auth())
            .max_decoding_message_size(MAX_MESSAGE_SIZE)
            .max_encoding_message_size(MAX_MESSAGE_SIZE);
        Self { inner }
    }
}

#[tonic::async_trait]
impl PassLister for PassClient {
    async fn list_upcoming_passes(
        &mut self,
        satellite_id: &str,
    ) -> Result<ListUpcomingAvailablePassesResponse, ClientError> {
        let request = ListUpcomingAvailablePassesRequest {
            satellite_id: satellite_id.to_string(),
        };

        let response = self
            .inner
            .list_upcoming_available_passes(request)
            .await
            .map_err(|status| ClientError::Rpc {
                satellite_id: satellite_id.to_string(),
                status,
            })?
            .into_inner();

        debug!(satellite_id, passes = response.pass.len(), "listed upcoming passes");
        Ok(response)
    }
}

#[derive(Debug)]
pub enum ClientError {
    Rpc {
        satellite_id: String,
        status: tonic::Status,
    },
}

impl ClientError {
    pub fn code(&self) -> tonic::Code {
        match self {
            ClientError::Rpc { status, .. } => status.code(),
        }
    }
}

impl std::fmt::Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientError::Rpc {
                satellite_id,
                status,
            } => write!(
                f,
                "failed to list upcoming passes for satellite {}: {}: {}",
                satellite_id,
                status.code(),
                status.message()
            ),
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ClientError::Rpc { status, .. } => Some(status),
        }
    }
}
