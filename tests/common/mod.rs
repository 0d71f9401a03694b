//! Shared test doubles: a recording tunnel device and a canned verifier.
#![allow(dead_code)]
use std::net::IpAddr;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ipnetwork::IpNetwork;

use shrike::clock::ManualClock;
use shrike::error::{Result, ShrikeError, VerifyError};
use shrike::gateway::device::{DeviceUpdateSpec, PeerSnapshot, TunnelDevice};
use shrike::gateway::keys::{PublicKey, SecretKey};
use shrike::gateway::{Gateway, GatewayConfig};
use shrike::oidc::claims::Claims;
use shrike::oidc::TokenVerifier;

/// Every call the gateway makes against the device, in order.
#[derive(Debug)]
pub enum DeviceOp {
    Exists(String),
    Create(String),
    Delete(String),
    AssignAddress(String, IpAddr),
    SetUp(String),
    AddRoute(String, IpNetwork),
    Apply(String, DeviceUpdateSpec),
    Peers(String),
}

#[derive(Default)]
struct MockDeviceState {
    ops: Vec<DeviceOp>,
    exists: bool,
    snapshots: Vec<PeerSnapshot>,
    fail_next_read: bool,
}

/// A tunnel device that records every call and serves scripted peer tables.
#[derive(Clone, Default)]
pub struct MockDevice {
    state: Arc<Mutex<MockDeviceState>>,
}

impl MockDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pretend a leftover device with this name already exists.
    pub fn with_existing_device() -> Self {
        let device = Self::new();
        device.state.lock().unwrap().exists = true;
        device
    }

    pub fn set_snapshots(&self, snapshots: Vec<PeerSnapshot>) {
        self.state.lock().unwrap().snapshots = snapshots;
    }

    pub fn fail_next_read(&self) {
        self.state.lock().unwrap().fail_next_read = true;
    }

    pub fn take_ops(&self) -> Vec<DeviceOp> {
        std::mem::take(&mut self.state.lock().unwrap().ops)
    }

    /// Public keys removed across all recorded pushes.
    pub fn removed_keys(&self) -> Vec<PublicKey> {
        self.state
            .lock()
            .unwrap()
            .ops
            .iter()
            .filter_map(|op| match op {
                DeviceOp::Apply(_, update) => Some(update.remove.clone()),
                _ => None,
            })
            .flatten()
            .collect()
    }
}

impl TunnelDevice for MockDevice {
    fn exists(&self, name: &str) -> Result<bool> {
        let mut state = self.state.lock().unwrap();
        state.ops.push(DeviceOp::Exists(name.to_string()));
        Ok(state.exists)
    }

    fn create(&self, name: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.exists = true;
        state.ops.push(DeviceOp::Create(name.to_string()));
        Ok(())
    }

    fn delete(&self, name: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if !state.exists {
            return Err(ShrikeError::Device(format!("no such device: {}", name)));
        }
        state.exists = false;
        state.ops.push(DeviceOp::Delete(name.to_string()));
        Ok(())
    }

    fn assign_address(&self, name: &str, address: IpAddr) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state
            .ops
            .push(DeviceOp::AssignAddress(name.to_string(), address));
        Ok(())
    }

    fn set_up(&self, name: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.ops.push(DeviceOp::SetUp(name.to_string()));
        Ok(())
    }

    fn add_route(&self, name: &str, block: IpNetwork) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.ops.push(DeviceOp::AddRoute(name.to_string(), block));
        Ok(())
    }

    fn apply(&self, name: &str, update: DeviceUpdateSpec) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.ops.push(DeviceOp::Apply(name.to_string(), update));
        Ok(())
    }

    fn peers(&self, name: &str) -> Result<Vec<PeerSnapshot>> {
        let mut state = self.state.lock().unwrap();
        if state.fail_next_read {
            state.fail_next_read = false;
            return Err(ShrikeError::Device("device read failed".to_string()));
        }
        state.ops.push(DeviceOp::Peers(name.to_string()));
        Ok(state.snapshots.clone())
    }
}

pub fn test_config() -> GatewayConfig {
    GatewayConfig {
        device_name: "shrike-test".to_string(),
        listen_port: 51820,
        cidr: "10.99.0.0/24".parse().unwrap(),
        external_hostname: "bastion.example".to_string(),
        persistent_keepalive: 25,
        stabilizer_threshold: 3,
    }
}

pub fn test_gateway(device: MockDevice, clock: Arc<ManualClock>) -> Gateway {
    Gateway::new(test_config(), Box::new(device), clock).expect("gateway init failed")
}

pub fn peer_key() -> PublicKey {
    SecretKey::generate_private().public_key()
}

pub fn snapshot(key: &PublicKey, last_handshake: Option<DateTime<Utc>>) -> PeerSnapshot {
    PeerSnapshot {
        public_key: key.clone(),
        persistent_keepalive: Some(25),
        last_handshake,
    }
}

/// A verifier that returns a fixed outcome, for exercising the HTTP layer
/// without an identity provider.
pub enum StubVerifier {
    Allow(Claims),
    Reject,
}

impl StubVerifier {
    pub fn allowing(claim: &str, value: &str) -> Self {
        let mut claims = Claims::default();
        claims.extra.insert(
            claim.to_string(),
            serde_json::Value::String(value.to_string()),
        );
        Self::Allow(claims)
    }

    pub fn allowing_claims(claims: Claims) -> Self {
        Self::Allow(claims)
    }

    pub fn rejecting() -> Self {
        Self::Reject
    }
}

#[async_trait]
impl TokenVerifier for StubVerifier {
    async fn verify_token(
        &self,
        _token: &str,
        _issuer: &str,
    ) -> std::result::Result<Claims, VerifyError> {
        match self {
            StubVerifier::Allow(claims) => Ok(claims.clone()),
            StubVerifier::Reject => Err(VerifyError::BadSignature),
        }
    }
}
