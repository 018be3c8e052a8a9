//! A fake StellarStation API server for local development and tests.
//!
//! Serves deterministic `ListUpcomingAvailablePasses` responses and checks
//! that callers sign their bearer tokens with the expected service account.

pub mod auth;
pub mod config;
pub mod server;
pub mod service;

pub mod proto {
    tonic::include_proto!("stellarstation.api.v1");
}
