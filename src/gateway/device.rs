//! The network interface controller seam.
//!
//! `TunnelDevice` is everything the gateway needs from the kernel: virtual
//! device lifecycle, address/route programming and tunnel configuration
//! pushes. The production implementation lives in [`super::kernel`]; tests
//! substitute a recording mock behind the same trait.
use std::net::IpAddr;

use chrono::{DateTime, Utc};
use ipnetwork::IpNetwork;

use super::keys::{PublicKey, SecretKey};
use crate::error::Result;

/// One configuration push to the device.
///
/// `replace_peers: false` is an incremental update: peers in `add` are
/// created or updated, keys in `remove` are dropped, everything else on the
/// device is left alone. `replace_peers: true` wipes the peer table first.
#[derive(Debug, Default)]
pub struct DeviceUpdateSpec {
    pub private_key: Option<SecretKey>,
    pub listen_port: Option<u16>,
    pub replace_peers: bool,
    pub add: Vec<PeerSpec>,
    pub remove: Vec<PublicKey>,
}

impl DeviceUpdateSpec {
    /// The initial push after device creation: key material, listen port, and
    /// an explicit replace so no peer from a previous incarnation survives.
    pub fn clean_slate(private_key: SecretKey, listen_port: u16) -> Self {
        Self {
            private_key: Some(private_key),
            listen_port: Some(listen_port),
            replace_peers: true,
            ..Default::default()
        }
    }

    pub fn add_peer(peer: PeerSpec) -> Self {
        Self {
            add: vec![peer],
            ..Default::default()
        }
    }

    pub fn remove_peers(keys: Vec<PublicKey>) -> Self {
        Self {
            remove: keys,
            ..Default::default()
        }
    }
}

/// A single peer entry to push to the device.
#[derive(Debug)]
pub struct PeerSpec {
    pub public_key: PublicKey,
    pub preshared_key: SecretKey,
    pub persistent_keepalive: u16,
    /// Exclusive allowed-address list: the push replaces whatever allowed
    /// addresses the kernel had for this key with exactly this host network.
    pub allowed_ip: IpNetwork,
}

/// Live peer state as reported by the kernel.
#[derive(Clone, Debug)]
pub struct PeerSnapshot {
    pub public_key: PublicKey,
    pub persistent_keepalive: Option<u16>,
    /// Kernel-observed last handshake; `None` means the peer has never
    /// completed one.
    pub last_handshake: Option<DateTime<Utc>>,
}

pub trait TunnelDevice: Send + Sync {
    /// Whether a device with this name currently exists.
    fn exists(&self, name: &str) -> Result<bool>;

    /// Create a fresh tunnel-type device and resolve it to a live handle.
    fn create(&self, name: &str) -> Result<()>;

    /// Delete the device. Fails if it does not exist.
    fn delete(&self, name: &str) -> Result<()>;

    /// Assign an address with a host-only mask.
    fn assign_address(&self, name: &str, address: IpAddr) -> Result<()>;

    /// Bring the device administratively up.
    fn set_up(&self, name: &str) -> Result<()>;

    /// Install a route for the whole block via this device. Needed because
    /// the interface address uses a host-only mask, so the kernel derives no
    /// subnet route on its own.
    fn add_route(&self, name: &str, block: IpNetwork) -> Result<()>;

    /// Push tunnel configuration (keys, port, peer changes).
    fn apply(&self, name: &str, update: DeviceUpdateSpec) -> Result<()>;

    /// Read the live peer table.
    fn peers(&self, name: &str) -> Result<Vec<PeerSnapshot>>;
}
