//! Authenticated client for listing upcoming satellite passes from the
//! StellarStation API.

pub mod channel;
pub mod client;
pub mod config;
pub mod credentials;
pub mod runner;
pub mod window;

pub mod proto {
    tonic::include_proto!("stellarstation.api.v1");
}
