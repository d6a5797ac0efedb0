use std::fmt::{
    Display,
    Formatter,
    Result as FmtResult,
};

use core::config::{
    DEFAULT_LEASE,
    DEFAULT_NETMASK,
};
use core::repr::Ipv4Address;

/// An address/netmask/gateway triple applied to an interface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Lease {
    pub addr: Ipv4Address,
    pub netmask: Ipv4Address,
    pub gateway: Ipv4Address,
}

impl Lease {
    pub fn new(addr: Ipv4Address, netmask: Ipv4Address, gateway: Ipv4Address) -> Lease {
        Lease {
            addr,
            netmask,
            gateway,
        }
    }

    /// Creates a lease where the interface is its own gateway.
    pub fn self_gateway(addr: Ipv4Address, netmask: Ipv4Address) -> Lease {
        Lease::new(addr, netmask, addr)
    }

    /// The fixed private network the downstream interface uses until an
    /// upstream address is known.
    pub fn default_downstream() -> Lease {
        *DEFAULT_LEASE
    }

    /// Derives the downstream lease from an upstream address.
    ///
    /// The upstream network is assumed to be a /24: the first three octets
    /// are kept and the host part is replaced with host_id. The upstream
    /// netmask is copied, or a /24 is used if the upstream has none. The
    /// derived address is its own gateway.
    pub fn derive(upstream_addr: Ipv4Address, upstream_netmask: Ipv4Address, host_id: u8) -> Lease {
        let octets = upstream_addr.octets();
        let addr = Ipv4Address::new([octets[0], octets[1], octets[2], host_id]);

        let netmask = if upstream_netmask.is_unspecified() {
            *DEFAULT_NETMASK
        } else {
            upstream_netmask
        };

        Lease::self_gateway(addr, netmask)
    }

    pub fn prefix_len(&self) -> u32 {
        self.netmask.prefix_len()
    }
}

impl Display for Lease {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        write!(f, "{}/{} gw {}", self.addr, self.prefix_len(), self.gateway)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ipv4(addr: &str) -> Ipv4Address {
        addr.parse().unwrap()
    }

    #[test]
    fn test_default_downstream() {
        let lease = Lease::default_downstream();
        assert_eq!(lease.addr, ipv4("192.168.42.1"));
        assert_eq!(lease.netmask, ipv4("255.255.255.0"));
        assert_eq!(lease.gateway, ipv4("192.168.42.1"));
    }

    #[test]
    fn test_derive_from_upstream() {
        let lease = Lease::derive(ipv4("10.0.0.42"), ipv4("255.255.255.0"), 253);
        assert_eq!(lease, Lease::self_gateway(ipv4("10.0.0.253"), ipv4("255.255.255.0")));
        assert_eq!(lease.gateway, ipv4("10.0.0.253"));
    }

    #[test]
    fn test_derive_keeps_upstream_netmask() {
        let lease = Lease::derive(ipv4("172.16.9.7"), ipv4("255.255.0.0"), 253);
        assert_eq!(lease.addr, ipv4("172.16.9.253"));
        assert_eq!(lease.netmask, ipv4("255.255.0.0"));
    }

    #[test]
    fn test_derive_without_upstream_netmask() {
        let lease = Lease::derive(ipv4("192.168.1.20"), Ipv4Address::UNSPECIFIED, 253);
        assert_eq!(lease.netmask, ipv4("255.255.255.0"));
    }

    #[test]
    fn test_display() {
        assert_eq!(
            Lease::default_downstream().to_string(),
            "192.168.42.1/24 gw 192.168.42.1"
        );
    }
}
