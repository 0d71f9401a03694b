//! Gateway lifecycle manager.
//!
//! Owns the virtual tunnel device, the address pool and the peer set: creates
//! the device fresh on startup, admits peers with unique host addresses, and
//! reclaims peers whose handshakes have gone stale only after the stabilizer
//! has confirmed them across consecutive scans.
pub mod device;
pub mod kernel;
pub mod keys;
pub mod pool;

use std::collections::HashSet;
use std::net::IpAddr;
use std::sync::Arc;

use chrono::Duration;
use ipnetwork::IpNetwork;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::clock::Clock;
use crate::error::Result;
use crate::stabilizer::IterativeStabilizer;
use device::{DeviceUpdateSpec, PeerSpec, TunnelDevice};
use keys::{PublicKey, SecretKey};
use pool::{host_network, AddressPool};

/// Immutable gateway configuration.
#[derive(Clone, Debug)]
pub struct GatewayConfig {
    pub device_name: String,
    pub listen_port: u16,
    pub cidr: IpNetwork,
    pub external_hostname: String,
    pub persistent_keepalive: u16,
    pub stabilizer_threshold: u32,
}

/// The gateway's connection descriptor, enough for a client to build a
/// complete tunnel configuration.
#[derive(Clone, Debug, Serialize)]
pub struct ServerInfo {
    pub endpoint_host: String,
    pub endpoint_port: u16,
    pub gateway_ip: IpAddr,
    pub public_key: PublicKey,
}

impl ServerInfo {
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.endpoint_host, self.endpoint_port)
    }
}

/// What a freshly admitted peer gets back.
#[derive(Debug)]
pub struct PeerGrant {
    pub preshared_key: SecretKey,
    pub allowed_ip: IpNetwork,
    pub persistent_keepalive: u16,
    pub server: ServerInfo,
}

struct GatewayState {
    pool: AddressPool,
    stabilizer: IterativeStabilizer<PublicKey>,
}

pub struct Gateway {
    config: GatewayConfig,
    device: Box<dyn TunnelDevice>,
    clock: Arc<dyn Clock>,
    public_key: PublicKey,
    gateway_ip: IpAddr,
    // Admission and reclamation both mutate the kernel device; pool,
    // stabilizer and device pushes all go through this one lock.
    state: Mutex<GatewayState>,
}

impl Gateway {
    /// Bring up a fresh gateway. Every step here is fatal on failure; a
    /// half-initialized device is deliberately not recovered from.
    pub fn new(
        config: GatewayConfig,
        device: Box<dyn TunnelDevice>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let name = config.device_name.clone();

        // Never reuse an existing device: tunnel state and addresses cannot
        // be partially reset.
        if device.exists(&name)? {
            info!(device = %name, "device found, re-creating");
            device.delete(&name)?;
        }
        device.create(&name)?;

        let mut pool = AddressPool::new(config.cidr);
        // the first address out of the pool belongs to the interface itself
        let gateway_ip = pool.acquire()?;
        device.assign_address(&name, gateway_ip)?;
        device.set_up(&name)?;
        // the interface address is host-masked, so the kernel derives no
        // subnet route; install one for the whole block explicitly
        device.add_route(&name, config.cidr)?;

        // fresh ephemeral identity on every startup, never persisted
        let private_key = SecretKey::generate_private();
        let public_key = private_key.public_key();
        device.apply(
            &name,
            DeviceUpdateSpec::clean_slate(private_key, config.listen_port),
        )?;

        info!(
            device = %name,
            address = %gateway_ip,
            port = config.listen_port,
            "gateway initialized"
        );

        let stabilizer = IterativeStabilizer::new(config.stabilizer_threshold);
        Ok(Self {
            config,
            device,
            clock,
            public_key,
            gateway_ip,
            state: Mutex::new(GatewayState { pool, stabilizer }),
        })
    }

    /// Admit a peer: allocate an address, generate a preshared key and push
    /// an incremental update that touches no existing peer.
    ///
    /// Duplicate public keys are not detected; resubmitting one allocates a
    /// second independent address and peer entry.
    pub async fn add_peer(&self, public_key: PublicKey) -> Result<PeerGrant> {
        let preshared_key = SecretKey::generate_preshared();

        let mut state = self.state.lock().await;
        let address = state.pool.acquire()?;
        let allowed_ip = host_network(address);
        self.device.apply(
            &self.config.device_name,
            DeviceUpdateSpec::add_peer(PeerSpec {
                public_key: public_key.clone(),
                preshared_key: preshared_key.clone(),
                persistent_keepalive: self.config.persistent_keepalive,
                allowed_ip,
            }),
        )?;
        drop(state);

        info!(peer = %public_key, address = %allowed_ip, "added new peer");
        Ok(PeerGrant {
            preshared_key,
            allowed_ip,
            persistent_keepalive: self.config.persistent_keepalive,
            server: self.server_info(),
        })
    }

    /// One reclamation scan. A peer is a removal candidate if it has never
    /// completed a handshake or its last handshake predates its keepalive
    /// cutoff; only candidates the stabilizer confirms across consecutive
    /// scans are removed, in one batched push.
    ///
    /// Returns the number of peers removed. At most one scan is expected to
    /// be in flight per gateway.
    pub async fn cleanup_peers(&self) -> Result<usize> {
        let name = &self.config.device_name;
        let mut state = self.state.lock().await;

        // Snapshot before touching the stabilizer: a failed read returns
        // here and leaves debounce counts exactly as they were.
        let peers = self.device.peers(name)?;

        let now = self.clock.now();
        let mut candidates: HashSet<PublicKey> = HashSet::new();
        for peer in peers {
            let keepalive = peer
                .persistent_keepalive
                .unwrap_or(self.config.persistent_keepalive);
            let cutoff = now - Duration::seconds(i64::from(keepalive));
            let stale = match peer.last_handshake {
                None => true,
                Some(at) => at < cutoff,
            };
            if stale {
                candidates.insert(peer.public_key);
            }
        }
        debug!(count = candidates.len(), "stale peer candidates");

        let confirmed = state.stabilizer.iterate(&candidates);
        if confirmed.is_empty() {
            return Ok(0);
        }

        info!(count = confirmed.len(), "removing confirmed stale peers");
        let removed = confirmed.len();
        self.device
            .apply(name, DeviceUpdateSpec::remove_peers(confirmed))?;
        Ok(removed)
    }

    /// Tear down the virtual device. Not idempotent: a second call on an
    /// already-deleted device fails.
    pub async fn destroy(&self) -> Result<()> {
        let _state = self.state.lock().await;
        self.device.delete(&self.config.device_name)
    }

    /// Pure read of the gateway's connection descriptor.
    pub fn server_info(&self) -> ServerInfo {
        ServerInfo {
            endpoint_host: self.config.external_hostname.clone(),
            endpoint_port: self.config.listen_port,
            gateway_ip: self.gateway_ip,
            public_key: self.public_key.clone(),
        }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }
}
