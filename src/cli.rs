//! CLI for this application
//!
use ipnetwork::IpNetwork;
use url::Url;

use crate::settings;

#[derive(Clone, Debug, clap::Parser)]
pub struct Cli {
    // Server listen address
    #[clap(
        long,
        default_value = "0.0.0.0",
        env("SHRIKE_LISTEN_ADDRESS"),
        help = "IP Address to listen on"
    )]
    pub listen_address: String,

    // HTTP API listen port
    #[clap(
        long,
        default_value = settings::DEFAULT_PORT_HTTP,
        env("SHRIKE_HTTP_LISTEN_PORT"),
        help = "Port to bind Shrike HTTP API server to"
    )]
    pub listen_port: u16,

    // Virtual tunnel device name
    #[clap(
        long,
        default_value = settings::DEFAULT_DEVICE_NAME,
        env("SHRIKE_DEVICE_NAME"),
        help = "Name of the virtual tunnel device"
    )]
    pub device_name: String,

    // UDP port the tunnel device listens on
    #[clap(
        long,
        default_value = settings::DEFAULT_WIREGUARD_PORT,
        env("SHRIKE_WIREGUARD_PORT"),
        help = "UDP port for tunnel traffic"
    )]
    pub wireguard_port: u16,

    // Address block peers are allocated from
    #[clap(
        long,
        default_value = "10.117.0.0/24",
        env("SHRIKE_CIDR"),
        help = "CIDR block for tunnel addresses; the first address goes to the gateway itself"
    )]
    pub cidr: IpNetwork,

    // Hostname clients dial
    #[clap(
        long,
        env("SHRIKE_EXTERNAL_HOSTNAME"),
        help = "Externally reachable hostname handed to admitted peers"
    )]
    pub external_hostname: String,

    // Keepalive pushed to every peer
    #[clap(
        long,
        default_value = settings::DEFAULT_PERSISTENT_KEEPALIVE,
        env("SHRIKE_PERSISTENT_KEEPALIVE"),
        help = "Persistent keepalive interval in seconds, also the staleness cutoff"
    )]
    pub persistent_keepalive: u16,

    // Consecutive-scan confirmations before a stale peer is removed
    #[clap(
        long,
        default_value = settings::DEFAULT_STABILIZER_THRESHOLD,
        env("SHRIKE_STABILIZER_THRESHOLD"),
        help = "Scans a stale peer must survive before removal"
    )]
    pub stabilizer_threshold: u32,

    // How often the reclamation scan runs
    #[clap(
        long,
        default_value = settings::DEFAULT_CLEANUP_INTERVAL_SECONDS,
        env("SHRIKE_CLEANUP_INTERVAL_SECONDS"),
        help = "Seconds between peer reclamation scans"
    )]
    pub cleanup_interval_seconds: u64,

    // Trusted token issuer
    #[clap(
        long,
        env("SHRIKE_OIDC_ISSUER"),
        help = "Issuer URL tokens must come from (e.g., https://token.actions.githubusercontent.com)"
    )]
    pub oidc_issuer: Url,

    // Timeout on discovery/key fetches
    #[clap(
        long,
        default_value = settings::DEFAULT_OIDC_TIMEOUT_SECONDS,
        env("SHRIKE_OIDC_TIMEOUT_SECONDS"),
        help = "Timeout in seconds for issuer discovery requests"
    )]
    pub oidc_timeout_seconds: u64,

    // Which claim gates admission
    #[clap(
        long,
        default_value = settings::DEFAULT_AUTHZ_CLAIM,
        env("SHRIKE_AUTHZ_CLAIM"),
        help = "Token claim checked for admission"
    )]
    pub authz_claim: String,

    // Required value of that claim
    #[clap(
        long,
        env("SHRIKE_AUTHZ_VALUE"),
        help = "Required value of the admission claim"
    )]
    pub authz_value: String,
}

impl Cli {
    pub fn into_settings(self) -> settings::Settings {
        settings::Settings {
            listen_address: self.listen_address,
            listen_port: self.listen_port,
            device_name: self.device_name,
            wireguard_port: self.wireguard_port,
            cidr: self.cidr,
            external_hostname: self.external_hostname,
            persistent_keepalive: self.persistent_keepalive,
            stabilizer_threshold: self.stabilizer_threshold,
            cleanup_interval_seconds: self.cleanup_interval_seconds,
            oidc_issuer: self.oidc_issuer.as_str().trim_end_matches('/').to_string(),
            oidc_timeout_seconds: self.oidc_timeout_seconds,
            authz_claim: self.authz_claim,
            authz_value: self.authz_value,
        }
    }
}
