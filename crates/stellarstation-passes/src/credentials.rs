use std::path::Path;
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Lifetime of a self-signed access token.
const TOKEN_LIFETIME: Duration = Duration::from_secs(3600);

/// A cached token is re-minted once it is this close to expiry.
const REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// A service-account key file as downloaded from the StellarStation console.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    #[serde(rename = "type")]
    pub key_type: Option<String>,
    pub project_id: Option<String>,
    pub private_key_id: String,
    pub private_key: String,
    pub client_email: String,
    pub client_id: Option<String>,
    pub token_uri: Option<String>,
}

impl std::fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key_id", &self.private_key_id)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

impl ServiceAccountKey {
    /// Read and parse a key file. The file is closed before parsing starts.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, CredentialError> {
        let path = path.as_ref();
        let raw = std::fs::read(path)
            .map_err(|e| CredentialError::Read(path.display().to_string(), e))?;
        Self::from_slice(&raw)
    }

    pub fn from_slice(raw: &[u8]) -> Result<Self, CredentialError> {
        let key: ServiceAccountKey = serde_json::from_slice(raw).map_err(CredentialError::Parse)?;
        match key.key_type.as_deref() {
            None | Some("service_account") => Ok(key),
            Some(other) => Err(CredentialError::UnsupportedType(other.to_string())),
        }
    }
}

/// Claims of a self-signed JWT access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub iss: String,
    pub sub: String,
    pub aud: String,
    pub iat: u64,
    pub exp: u64,
}

/// A signed token and the unix time it expires at.
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub token: String,
    pub expires_at: u64,
}

/// Signs JWT access tokens with a service account's private key.
///
/// The API accepts these directly as bearer tokens; no exchange with an
/// OAuth2 token endpoint is involved.
pub struct JwtSigner {
    key: EncodingKey,
    key_id: String,
    client_email: String,
    audience: String,
}

impl JwtSigner {
    pub fn new(account: &ServiceAccountKey, audience: &str) -> Result<Self, CredentialError> {
        let key = EncodingKey::from_rsa_pem(account.private_key.as_bytes())
            .map_err(|e| CredentialError::InvalidKey(e.to_string()))?;
        Ok(Self {
            key,
            key_id: account.private_key_id.clone(),
            client_email: account.client_email.clone(),
            audience: audience.to_string(),
        })
    }

    pub fn audience(&self) -> &str {
        &self.audience
    }

    /// Sign a token issued at `issued_at` (unix seconds).
    pub fn sign_at(&self, issued_at: u64) -> Result<AccessToken, CredentialError> {
        let expires_at = issued_at + TOKEN_LIFETIME.as_secs();
        let claims = Claims {
            iss: self.client_email.clone(),
            sub: self.client_email.clone(),
            aud: self.audience.clone(),
            iat: issued_at,
            exp: expires_at,
        };

        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(self.key_id.clone());

        let token = jsonwebtoken::encode(&header, &claims, &self.key)
            .map_err(|e| CredentialError::Sign(e.to_string()))?;
        Ok(AccessToken { token, expires_at })
    }
}

/// Hands out bearer tokens, re-signing only when the cached one is about to
/// expire.
pub struct TokenSource {
    signer: JwtSigner,
    cached: Mutex<Option<AccessToken>>,
}

impl TokenSource {
    pub fn new(signer: JwtSigner) -> Self {
        Self {
            signer,
            cached: Mutex::new(None),
        }
    }

    pub fn audience(&self) -> &str {
        self.signer.audience()
    }

    pub fn token(&self) -> Result<String, CredentialError> {
        self.token_at(unix_now())
    }

    fn token_at(&self, now: u64) -> Result<String, CredentialError> {
        let mut cached = self.cached.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(token) = cached.as_ref() {
            if now + REFRESH_MARGIN.as_secs() < token.expires_at {
                return Ok(token.token.clone());
            }
        }

        let fresh = self.signer.sign_at(now)?;
        debug!(expires_at = fresh.expires_at, "minted service account access token");
        let token = fresh.token.clone();
        *cached = Some(fresh);
        Ok(token)
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[derive(Debug)]
pub enum CredentialError {
    Read(String, std::io::Error),
    Parse(serde_json::Error),
    UnsupportedType(String),
    InvalidKey(String),
    Sign(String),
}

impl std::fmt::Display for CredentialError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CredentialError::Read(path, e) => {
                write!(f, "failed to read API key file {}: {}", path, e)
            }
            CredentialError::Parse(e) => write!(f, "failed to parse API key file: {}", e),
            CredentialError::UnsupportedType(t) => {
                write!(f, "unsupported credential type: {}", t)
            }
            CredentialError::InvalidKey(msg) => write!(f, "invalid private key: {}", msg),
            CredentialError::Sign(msg) => write!(f, "failed to sign access token: {}", msg),
        }
    }
}

impl std::error::Error for CredentialError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CredentialError::Read(_, e) => Some(e),
            CredentialError::Parse(e) => Some(e),
            _ => None,
        }
    }
}
