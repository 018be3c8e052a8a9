use std::sync::Arc;

use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use tonic::service::Interceptor;
use tonic::{Request, Status};
use tracing::{debug, warn};

#[derive(Debug, Clone, Deserialize)]
struct Claims {
    sub: String,
}

/// Verifies `authorization: Bearer <jwt>` on every call.
///
/// Tokens must be RS256-signed by the key matching the configured public key,
/// issued by the expected service account, and addressed to the expected
/// audience.
#[derive(Clone)]
pub struct JwtAuthorizer {
    inner: Option<Arc<Verifier>>,
}

struct Verifier {
    key: DecodingKey,
    validation: Validation,
}

impl JwtAuthorizer {
    pub fn new(public_key_pem: &[u8], issuer: &str, audience: &str) -> Result<Self, AuthError> {
        let key = DecodingKey::from_rsa_pem(public_key_pem)
            .map_err(|e| AuthError::InvalidPublicKey(e.to_string()))?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[issuer]);
        validation.set_audience(&[audience]);

        Ok(Self {
            inner: Some(Arc::new(Verifier { key, validation })),
        })
    }

    pub fn from_file(path: &str, issuer: &str, audience: &str) -> Result<Self, AuthError> {
        let pem = std::fs::read(path).map_err(|e| AuthError::Read(path.to_string(), e))?;
        Self::new(&pem, issuer, audience)
    }

    /// Accepts every call.
    pub fn disabled() -> Self {
        Self { inner: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }

    fn verify(&self, request: &Request<()>) -> Result<(), Status> {
        let Some(verifier) = &self.inner else {
            return Ok(());
        };

        let header = request
            .metadata()
            .get("authorization")
            .ok_or_else(|| Status::unauthenticated("missing authorization header"))?
            .to_str()
            .map_err(|_| Status::unauthenticated("authorization header is not ASCII"))?;
        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| Status::unauthenticated("authorization is not a bearer token"))?;

        match jsonwebtoken::decode::<Claims>(token, &verifier.key, &verifier.validation) {
            Ok(data) => {
                debug!(sub = %data.claims.sub, "authorized call");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "rejected access token");
                Err(Status::unauthenticated(format!("invalid access token: {}", e)))
            }
        }
    }
}

impl Interceptor for JwtAuthorizer {
    fn call(&mut self, request: Request<()>) -> Result<Request<()>, Status> {
        self.verify(&request)?;
        Ok(request)
    }
}

#[derive(Debug)]
pub enum AuthError {
    Read(String, std::io::Error),
    InvalidPublicKey(String),
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::Read(path, e) => write!(f, "failed to read public key {}: {}", path, e),
            AuthError::InvalidPublicKey(msg) => write!(f, "invalid public key: {}", msg),
        }
    }
}

impl std::error::Error for AuthError {}
