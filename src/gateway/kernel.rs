//! Kernel-backed tunnel device.
//!
//! WireGuard configuration goes through the kernel's generic netlink
//! interface via `wireguard-control`; address, link-state and route
//! programming shell out to `ip(8)`.
use std::net::IpAddr;
use std::process::Command;

use chrono::{DateTime, Utc};
use ipnetwork::IpNetwork;
use tracing::debug;
use wireguard_control::{Backend, Device, DeviceUpdate, InterfaceName, PeerConfigBuilder};

use super::device::{DeviceUpdateSpec, PeerSnapshot, TunnelDevice};
use crate::error::{Result, ShrikeError};

#[derive(Clone, Copy, Debug)]
pub struct KernelDevice {
    backend: Backend,
}

impl KernelDevice {
    pub fn new() -> Self {
        Self {
            backend: Backend::Kernel,
        }
    }

    fn interface(&self, name: &str) -> Result<InterfaceName> {
        name.parse().map_err(|err| {
            ShrikeError::Device(format!("invalid interface name '{}': {:?}", name, err))
        })
    }

    fn run_ip(&self, args: &[&str]) -> Result<()> {
        debug!(command = %format!("ip {}", args.join(" ")), "programming interface");
        let output = Command::new("ip").args(args).output().map_err(|err| {
            ShrikeError::Device(format!("unable to run ip {}: {}", args.join(" "), err))
        })?;
        if !output.status.success() {
            return Err(ShrikeError::Device(format!(
                "ip {} failed: {}",
                args.join(" "),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(())
    }
}

impl Default for KernelDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl TunnelDevice for KernelDevice {
    fn exists(&self, name: &str) -> Result<bool> {
        let iface = self.interface(name)?;
        let devices = Device::list(self.backend)
            .map_err(|err| ShrikeError::Device(format!("unable to list devices: {}", err)))?;
        Ok(devices.contains(&iface))
    }

    fn create(&self, name: &str) -> Result<()> {
        let iface = self.interface(name)?;
        DeviceUpdate::new()
            .apply(&iface, self.backend)
            .map_err(|err| ShrikeError::Device(format!("unable to create device: {}", err)))?;
        // creation alone does not hand back a usable handle; re-resolve
        Device::get(&iface, self.backend)
            .map_err(|err| ShrikeError::Device(format!("unable to resolve created device: {}", err)))?;
        Ok(())
    }

    fn delete(&self, name: &str) -> Result<()> {
        let iface = self.interface(name)?;
        let device = Device::get(&iface, self.backend)
            .map_err(|err| ShrikeError::Device(format!("unable to resolve device: {}", err)))?;
        device
            .delete()
            .map_err(|err| ShrikeError::Device(format!("unable to delete device: {}", err)))
    }

    fn assign_address(&self, name: &str, address: IpAddr) -> Result<()> {
        let host_prefix = match address {
            IpAddr::V4(_) => 32,
            IpAddr::V6(_) => 128,
        };
        self.run_ip(&[
            "address",
            "add",
            &format!("{}/{}", address, host_prefix),
            "dev",
            name,
        ])
    }

    fn set_up(&self, name: &str) -> Result<()> {
        self.run_ip(&["link", "set", "up", "dev", name])
    }

    fn add_route(&self, name: &str, block: IpNetwork) -> Result<()> {
        self.run_ip(&["route", "add", &block.to_string(), "dev", name])
    }

    fn apply(&self, name: &str, spec: DeviceUpdateSpec) -> Result<()> {
        let iface = self.interface(name)?;
        let mut update = DeviceUpdate::new();
        if let Some(private_key) = &spec.private_key {
            update = update.set_private_key(private_key.as_key().clone());
        }
        if let Some(port) = spec.listen_port {
            update = update.set_listen_port(port);
        }
        if spec.replace_peers {
            update = update.replace_peers();
        }
        for peer in &spec.add {
            update = update.add_peer(
                PeerConfigBuilder::new(peer.public_key.as_key())
                    .set_preshared_key(peer.preshared_key.as_key().clone())
                    .set_persistent_keepalive_interval(peer.persistent_keepalive)
                    .replace_allowed_ips()
                    .add_allowed_ip(peer.allowed_ip.ip(), peer.allowed_ip.prefix()),
            );
        }
        for key in &spec.remove {
            update = update.remove_peer_by_key(key.as_key());
        }
        update
            .apply(&iface, self.backend)
            .map_err(|err| ShrikeError::Device(format!("unable to configure device: {}", err)))
    }

    fn peers(&self, name: &str) -> Result<Vec<PeerSnapshot>> {
        let iface = self.interface(name)?;
        let device = Device::get(&iface, self.backend)
            .map_err(|err| ShrikeError::Device(format!("unable to read device: {}", err)))?;
        Ok(device
            .peers
            .into_iter()
            .map(|peer| PeerSnapshot {
                public_key: peer.config.public_key.into(),
                persistent_keepalive: peer.config.persistent_keepalive_interval,
                last_handshake: peer.stats.last_handshake_time.map(DateTime::<Utc>::from),
            })
            .collect())
    }
}
