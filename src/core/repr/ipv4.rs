use std::fmt::{
    Display,
    Formatter,
    Result as FmtResult,
};
use std::net::Ipv4Addr as StdIpv4Addr;
use std::str::FromStr;

use byteorder::{
    ByteOrder,
    NetworkEndian,
};

/// [IPv4 address](https://en.wikipedia.org/wiki/IPv4) in network byte order.
///
/// Netmasks are represented with the same type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Address([u8; 4]);

impl Address {
    pub const UNSPECIFIED: Address = Address([0; 4]);

    /// Creates an IPv4 address from a network byte order buffer.
    pub fn new(addr: [u8; 4]) -> Address {
        Address(addr)
    }

    /// Returns the host order integer value of the address.
    pub fn as_u32(&self) -> u32 {
        NetworkEndian::read_u32(&self.0)
    }

    /// Returns a reference to the network byte order representation of the
    /// address.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn octets(&self) -> [u8; 4] {
        self.0
    }

    /// Checks if this is 0.0.0.0.
    pub fn is_unspecified(&self) -> bool {
        self.0 == [0; 4]
    }

    /// Interprets the address as a netmask and returns the number of leading
    /// one bits.
    pub fn prefix_len(&self) -> u32 {
        (!self.as_u32()).leading_zeros()
    }
}

impl From<StdIpv4Addr> for Address {
    fn from(addr: StdIpv4Addr) -> Address {
        Address(addr.octets())
    }
}

impl From<Address> for StdIpv4Addr {
    fn from(addr: Address) -> StdIpv4Addr {
        StdIpv4Addr::from(addr.0)
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        write!(f, "{}.{}.{}.{}", self.0[0], self.0[1], self.0[2], self.0[3])
    }
}

impl FromStr for Address {
    type Err = ();

    /// Parses an IPv4 address from an A.B.C.D style string.
    fn from_str(addr: &str) -> Result<Address, Self::Err> {
        let mut octets = [0; 4];
        let mut len = 0;

        for token in addr.split('.') {
            if len == 4 {
                return Err(());
            }
            octets[len] = token.parse::<u8>().map_err(|_| ())?;
            len += 1;
        }

        if len != 4 {
            return Err(());
        }

        Ok(Address(octets))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let addr = "10.0.0.42".parse::<Address>().unwrap();
        assert_eq!(addr, Address::new([10, 0, 0, 42]));
        assert_eq!(addr.to_string(), "10.0.0.42");
    }

    #[test]
    fn test_parse_malformed() {
        assert_matches!("10.0.0".parse::<Address>(), Err(()));
        assert_matches!("10.0.0.1.5".parse::<Address>(), Err(()));
        assert_matches!("10.0.0.256".parse::<Address>(), Err(()));
        assert_matches!("10.a.0.1".parse::<Address>(), Err(()));
    }

    #[test]
    fn test_u32_conversion() {
        let addr = Address::new([192, 168, 42, 1]);
        assert_eq!(addr.as_u32(), 0xC0A8_2A01);
    }

    #[test]
    fn test_prefix_len() {
        let netmask = Address::new([255, 255, 240, 0]);
        assert_eq!(netmask.prefix_len(), 20);
        assert_eq!(Address::UNSPECIFIED.prefix_len(), 0);
        assert_eq!(Address::new([255; 4]).prefix_len(), 32);
    }

    #[test]
    fn test_std_conversion() {
        let addr = Address::from(StdIpv4Addr::new(10, 1, 2, 3));
        assert_eq!(addr, Address::new([10, 1, 2, 3]));
        let std_addr: StdIpv4Addr = addr.into();
        assert_eq!(std_addr, StdIpv4Addr::new(10, 1, 2, 3));
    }
}
