//! In-memory address allocator over one CIDR block.
//!
//! Addresses are handed out sequentially and never handed out twice; there is
//! no release operation. The first acquisition is always claimed by the
//! gateway interface itself before any peer allocation happens.
use std::fmt;
use std::net::IpAddr;

use ipnetwork::IpNetwork;

use crate::error::{Result, ShrikeError};

pub struct AddressPool {
    block: IpNetwork,
    addresses: Box<dyn Iterator<Item = IpAddr> + Send>,
}

impl AddressPool {
    pub fn new(block: IpNetwork) -> Self {
        let addresses: Box<dyn Iterator<Item = IpAddr> + Send> = match block {
            IpNetwork::V4(net) => {
                // network and broadcast addresses are not assignable,
                // except in /31 and /32 blocks where they do not exist
                let network = net.network();
                let broadcast = net.broadcast();
                let prefix = net.prefix();
                Box::new(
                    net.iter()
                        .filter(move |addr| prefix >= 31 || (*addr != network && *addr != broadcast))
                        .map(IpAddr::V4),
                )
            }
            IpNetwork::V6(net) => Box::new(net.iter().map(IpAddr::V6)),
        };
        Self { block, addresses }
    }

    pub fn block(&self) -> IpNetwork {
        self.block
    }

    /// Acquire the next free address from the block.
    pub fn acquire(&mut self) -> Result<IpAddr> {
        self.addresses.next().ok_or_else(|| {
            ShrikeError::AddressPool(format!("address block {} is exhausted", self.block))
        })
    }
}

impl fmt::Debug for AddressPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AddressPool")
            .field("block", &self.block)
            .finish()
    }
}

/// The host-only network for a single address (/32 or /128).
pub fn host_network(addr: IpAddr) -> IpNetwork {
    let prefix = match addr {
        IpAddr::V4(_) => 32,
        IpAddr::V6(_) => 128,
    };
    IpNetwork::new(addr, prefix).expect("host prefix is always valid")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_acquisitions_are_distinct() {
        let block: IpNetwork = "10.99.0.0/24".parse().unwrap();
        let mut pool = AddressPool::new(block);

        let mut seen = HashSet::new();
        for _ in 0..254 {
            let addr = pool.acquire().unwrap();
            assert!(block.contains(addr));
            assert!(seen.insert(addr), "{} was handed out twice", addr);
        }
    }

    #[test]
    fn test_network_and_broadcast_are_skipped() {
        let mut pool = AddressPool::new("192.168.4.0/30".parse().unwrap());
        assert_eq!(pool.acquire().unwrap().to_string(), "192.168.4.1");
        assert_eq!(pool.acquire().unwrap().to_string(), "192.168.4.2");
        assert!(pool.acquire().is_err());
    }

    #[test]
    fn test_exhaustion_fails() {
        let mut pool = AddressPool::new("10.0.0.0/29".parse().unwrap());
        for _ in 0..6 {
            pool.acquire().unwrap();
        }
        let err = pool.acquire().unwrap_err();
        assert!(err.to_string().contains("exhausted"));
    }

    #[test]
    fn test_v6_block() {
        let mut pool = AddressPool::new("fd00:73::/126".parse().unwrap());
        let mut seen = HashSet::new();
        for _ in 0..4 {
            assert!(seen.insert(pool.acquire().unwrap()));
        }
        assert!(pool.acquire().is_err());
    }

    #[test]
    fn test_host_network() {
        assert_eq!(
            host_network("10.0.0.7".parse().unwrap()).to_string(),
            "10.0.0.7/32"
        );
        assert_eq!(
            host_network("fd00::1".parse().unwrap()).to_string(),
            "fd00::1/128"
        );
    }
}
