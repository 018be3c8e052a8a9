use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tonic::metadata::MetadataValue;
use tonic::service::Interceptor;
use tonic::transport::{Channel, ClientTlsConfig, Endpoint};
use tonic::{Request, Status};
use tracing::{debug, info};

use crate::config::Config;
use crate::credentials::{CredentialError, JwtSigner, ServiceAccountKey, TokenSource};

/// Maximum size of a single gRPC message in either direction (512 MiB).
///
/// Applied to both encoding and decoding on every client built from an
/// [`AuthenticatedChannel`].
pub const MAX_MESSAGE_SIZE: usize = 512 * 1024 * 1024;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

const USER_AGENT: &str = concat!("stellarstation-passes/", env!("CARGO_PKG_VERSION"));

/// A parsed API address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiAddress {
    /// Full URI including scheme, e.g. `https://api.stellarstation.com:443`.
    pub uri: String,
    /// JWT audience: scheme and host without port.
    pub audience: String,
    pub tls: bool,
}

impl ApiAddress {
    /// Parse an address, assuming `https` when no scheme is given
    /// (`api.stellarstation.com:443`).
    pub fn parse(address: &str) -> Result<Self, ChannelError> {
        let address = address.trim();
        let with_scheme = if address.contains("://") {
            address.to_string()
        } else {
            format!("https://{}", address)
        };

        let uri: http::Uri = with_scheme
            .parse()
            .map_err(|e| ChannelError::InvalidAddress(format!("{}: {}", address, e)))?;

        let scheme = uri.scheme_str().unwrap_or_default().to_string();
        let tls = match scheme.as_str() {
            "https" => true,
            "http" => false,
            other => {
                return Err(ChannelError::InvalidAddress(format!(
                    "{}: unsupported scheme {:?}",
                    address, other
                )))
            }
        };
        let host = uri
            .host()
            .ok_or_else(|| ChannelError::InvalidAddress(format!("{}: missing host", address)))?;

        Ok(Self {
            audience: format!("{}://{}", scheme, host),
            uri: with_scheme,
            tls,
        })
    }

    fn host(&self) -> &str {
        let rest = self.audience.split("://").nth(1).unwrap_or_default();
        rest.trim_start_matches('[').trim_end_matches(']')
    }
}

/// Attaches `authorization: Bearer <jwt>` to every outgoing call.
#[derive(Clone)]
pub struct BearerAuth {
    tokens: Arc<TokenSource>,
}

impl BearerAuth {
    pub fn new(tokens: Arc<TokenSource>) -> Self {
        Self { tokens }
    }
}

impl Interceptor for BearerAuth {
    fn call(&mut self, mut request: Request<()>) -> Result<Request<()>, Status> {
        let token = self
            .tokens
            .token()
            .map_err(|e| Status::unauthenticated(e.to_string()))?;
        let value: MetadataValue<_> = format!("Bearer {}", token)
            .parse()
            .map_err(|_| Status::unauthenticated("access token is not valid metadata"))?;
        request.metadata_mut().insert("authorization", value);
        Ok(request)
    }
}

/// A connected channel plus the credentials used to authorize calls on it.
#[derive(Clone)]
pub struct AuthenticatedChannel {
    channel: Channel,
    auth: BearerAuth,
    address: ApiAddress,
}

impl AuthenticatedChannel {
    pub fn channel(&self) -> Channel {
        self.channel.clone()
    }

    pub fn auth(&self) -> BearerAuth {
        self.auth.clone()
    }

    pub fn address(&self) -> &ApiAddress {
        &self.address
    }
}

/// Load credentials and open a channel to the API.
///
/// The key file is read synchronously before any network activity, so a
/// missing or malformed key fails without attempting a connection.
pub async fn connect<P: AsRef<Path>>(
    api_address: &str,
    api_key_path: P,
) -> Result<AuthenticatedChannel, ChannelError> {
    let account = ServiceAccountKey::from_file(api_key_path)?;
    let address = ApiAddress::parse(api_address)?;
    let signer = JwtSigner::new(&account, &address.audience)?;
    debug!(client_email = %account.client_email, audience = %address.audience, "loaded service account");

    let endpoint = endpoint_for(&address)?;
    let channel = endpoint
        .connect()
        .await
        .map_err(|e| ChannelError::Connect(format!("{}: {}", address.uri, e)))?;

    info!(uri = %address.uri, tls = address.tls, "connected to StellarStation API");

    Ok(AuthenticatedChannel {
        channel,
        auth: BearerAuth::new(Arc::new(TokenSource::new(signer))),
        address,
    })
}

/// Same as [`connect`], taking the address and key path from `config`.
pub async fn connect_with_config(config: &Config) -> Result<AuthenticatedChannel, ChannelError> {
    connect(&config.api_address, &config.api_key_path).await
}

fn endpoint_for(address: &ApiAddress) -> Result<Endpoint, ChannelError> {
    let endpoint = Channel::from_shared(address.uri.clone())
        .map_err(|e| ChannelError::InvalidAddress(format!("{}: {}", address.uri, e)))?
        .user_agent(USER_AGENT)
        .map_err(|e| ChannelError::InvalidAddress(e.to_string()))?
        .connect_timeout(CONNECT_TIMEOUT);

    if !address.tls {
        return Ok(endpoint);
    }

    let tls = ClientTlsConfig::new()
        .with_native_roots()
        .domain_name(address.host());
    endpoint
        .tls_config(tls)
        .map_err(|e| ChannelError::Tls(e.to_string()))
}

#[derive(Debug)]
pub enum ChannelError {
    Credential(CredentialError),
    InvalidAddress(String),
    Tls(String),
    Connect(String),
}

impl std::fmt::Display for ChannelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChannelError::Credential(e) => write!(f, "credential error: {}", e),
            ChannelError::InvalidAddress(msg) => write!(f, "invalid API address: {}", msg),
            ChannelError::Tls(msg) => write!(f, "TLS configuration error: {}", msg),
            ChannelError::Connect(msg) => write!(f, "connection error: {}", msg),
        }
    }
}

impl std::error::Error for ChannelError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ChannelError::Credential(e) => Some(e),
            _ => None,
        }
    }
}

impl From<CredentialError> for ChannelError {
    fn from(e: CredentialError) -> Self {
        ChannelError::Credential(e)
    }
}
