//! Shrike: a small bastion control plane for a kernel tunnel device.
//!
//! The service owns one virtual tunnel device end to end. Clients present a
//! bearer token from a trusted issuer; admitted clients get a tunnel address,
//! a preshared key and the gateway's connection details. A background task
//! reclaims peers whose handshakes have gone stale.
pub mod api;
pub mod cli;
pub mod clock;
pub mod error;
pub mod gateway;
pub mod oidc;
pub mod settings;
pub mod stabilizer;
