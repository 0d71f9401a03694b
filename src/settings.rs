//! Shrike application settings
use std::time::Duration;

use ipnetwork::IpNetwork;

use crate::api::AuthzSettings;
use crate::gateway::GatewayConfig;
use crate::oidc::VerifierConfig;

pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const STANDARD_PORT_HTTP: u16 = 8400;
pub const DEFAULT_PORT_HTTP: &str = "8400";

pub const DEFAULT_DEVICE_NAME: &str = "shrike0";
pub const DEFAULT_WIREGUARD_PORT: &str = "51820";
pub const DEFAULT_PERSISTENT_KEEPALIVE: &str = "25";
pub const DEFAULT_STABILIZER_THRESHOLD: &str = "3";
pub const DEFAULT_CLEANUP_INTERVAL_SECONDS: &str = "60";
pub const DEFAULT_OIDC_TIMEOUT_SECONDS: &str = "10";
pub const DEFAULT_AUTHZ_CLAIM: &str = "repository_owner";

#[derive(Clone, Debug)]
pub struct Settings {
    // Server listen address
    pub listen_address: String,
    pub listen_port: u16,

    // Tunnel device
    pub device_name: String,
    pub wireguard_port: u16,
    pub cidr: IpNetwork,
    pub external_hostname: String,
    pub persistent_keepalive: u16,
    pub stabilizer_threshold: u32,
    pub cleanup_interval_seconds: u64,

    // Admission policy
    pub oidc_issuer: String,
    pub oidc_timeout_seconds: u64,
    pub authz_claim: String,
    pub authz_value: String,
}

impl Settings {
    pub fn gateway_config(&self) -> GatewayConfig {
        GatewayConfig {
            device_name: self.device_name.clone(),
            listen_port: self.wireguard_port,
            cidr: self.cidr,
            external_hostname: self.external_hostname.clone(),
            persistent_keepalive: self.persistent_keepalive,
            stabilizer_threshold: self.stabilizer_threshold,
        }
    }

    pub fn verifier_config(&self) -> VerifierConfig {
        VerifierConfig {
            request_timeout: Duration::from_secs(self.oidc_timeout_seconds),
            ..Default::default()
        }
    }

    pub fn authz_settings(&self) -> AuthzSettings {
        AuthzSettings {
            issuer: self.oidc_issuer.clone(),
            claim: self.authz_claim.clone(),
            allowed_value: self.authz_value.clone(),
        }
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_seconds)
    }
}
