use std::fmt::{
    Display,
    Formatter,
    Result as FmtResult,
};
use std::result::Result as StdResult;
use std::str::FromStr;

use byteorder::{
    ByteOrder,
    NetworkEndian,
};

use {
    Error,
    Result,
};

/// [MAC address](https://en.wikipedia.org/wiki/MAC_address) in network byte order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Address([u8; 6]);

impl Address {
    pub const BROADCAST: Address = Address([0xFF; 6]);

    /// Creates a MAC address from a network byte order buffer.
    pub fn new(addr: [u8; 6]) -> Address {
        Address(addr)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn octets(&self) -> [u8; 6] {
        self.0
    }

    pub fn is_multicast(&self) -> bool {
        (self.0[0] & 0b0000_0001) > 0
    }

    pub fn is_broadcast(&self) -> bool {
        self.0 == [0xFF; 6]
    }

    /// Checks if this is a locally administered address rather than one with
    /// an IEEE assigned OUI.
    pub fn is_local(&self) -> bool {
        (self.0[0] & 0b0000_0010) > 0
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            self.0[0], self.0[1], self.0[2], self.0[3], self.0[4], self.0[5],
        )
    }
}

impl FromStr for Address {
    type Err = ();

    /// Parses a MAC address from an a:b:c:d:e:f style string.
    fn from_str(addr: &str) -> StdResult<Address, Self::Err> {
        let mut bytes = [0; 6];
        let mut len = 0;

        for token in addr.split(':') {
            if len == 6 {
                return Err(());
            }
            bytes[len] = u8::from_str_radix(token, 16).map_err(|_| ())?;
            len += 1;
        }

        if len != 6 {
            return Err(());
        }

        Ok(Address(bytes))
    }
}

/// [https://en.wikipedia.org/wiki/EtherType](https://en.wikipedia.org/wiki/EtherType)
pub mod eth_types {
    pub const IPV4: u16 = 0x0800;

    pub const ARP: u16 = 0x0806;

    pub const IPV6: u16 = 0x86DD;
}

mod fields {
    use std::ops::Range;

    pub const DST_ADDR: Range<usize> = 0 .. 6;

    pub const SRC_ADDR: Range<usize> = 6 .. 12;

    pub const PAYLOAD_TYPE: Range<usize> = 12 .. 14;
}

/// Read only view of an Ethernet header, used to describe relayed frames.
#[derive(Debug)]
pub struct Frame<T: AsRef<[u8]>> {
    buffer: T,
}

impl<T: AsRef<[u8]>> Frame<T> {
    pub const HEADER_LEN: usize = 14;

    /// Tries to create an Ethernet frame view over a byte buffer.
    pub fn try_new(buffer: T) -> Result<Frame<T>> {
        if buffer.as_ref().len() < Self::HEADER_LEN {
            Err(Error::Malformed)
        } else {
            Ok(Frame { buffer })
        }
    }

    pub fn dst_addr(&self) -> Address {
        let mut bytes = [0; 6];
        bytes.copy_from_slice(&self.buffer.as_ref()[fields::DST_ADDR]);
        Address(bytes)
    }

    pub fn src_addr(&self) -> Address {
        let mut bytes = [0; 6];
        bytes.copy_from_slice(&self.buffer.as_ref()[fields::SRC_ADDR]);
        Address(bytes)
    }

    pub fn payload_type(&self) -> u16 {
        NetworkEndian::read_u16(&self.buffer.as_ref()[fields::PAYLOAD_TYPE])
    }

    pub fn len(&self) -> usize {
        self.buffer.as_ref().len()
    }
}

impl<T: AsRef<[u8]>> Display for Frame<T> {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        write!(
            f,
            "{} -> {} type 0x{:04x} len {}",
            self.src_addr(),
            self.dst_addr(),
            self.payload_type(),
            self.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_local() {
        let addr = Address::new([0x02, 0x00, 0x11, 0x22, 0x33, 0x44]);
        assert!(addr.is_local());
        assert!(!addr.is_multicast());
    }

    #[test]
    fn test_is_broadcast() {
        assert!(Address::BROADCAST.is_broadcast());
        assert!(Address::BROADCAST.is_multicast());
    }

    #[test]
    fn test_parse_and_display() {
        let addr = "02:00:11:22:33:44".parse::<Address>().unwrap();
        assert_eq!(addr, Address::new([0x02, 0x00, 0x11, 0x22, 0x33, 0x44]));
        assert_eq!(addr.to_string(), "02:00:11:22:33:44");
        assert_matches!("02:00:11:22:33".parse::<Address>(), Err(()));
        assert_matches!("02:00:11:22:33:44:55".parse::<Address>(), Err(()));
        assert_matches!("zz:00:11:22:33:44".parse::<Address>(), Err(()));
    }

    #[test]
    fn test_frame_header() {
        let mut buffer = vec![0; 60];
        buffer[0 .. 6].copy_from_slice(&[0xFF; 6]);
        buffer[6 .. 12].copy_from_slice(&[0x02, 0, 0, 0, 0, 1]);
        buffer[12] = 0x08;
        buffer[13] = 0x06;

        let frame = Frame::try_new(&buffer[..]).unwrap();
        assert!(frame.dst_addr().is_broadcast());
        assert_eq!(frame.src_addr(), Address::new([0x02, 0, 0, 0, 0, 1]));
        assert_eq!(frame.payload_type(), eth_types::ARP);
        assert_eq!(frame.len(), 60);
    }

    #[test]
    fn test_frame_too_short() {
        assert_matches!(Frame::try_new(&[0u8; 13][..]), Err(Error::Malformed));
    }
}
