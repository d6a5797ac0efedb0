//! Addresses and frame headers.
//!
//! The bridge relays frames unmodified, so the `repr` module only provides
//! what is needed to describe leases and to log the frames crossing it.

pub mod ethernet;
pub mod ipv4;

pub use self::ethernet::{
    eth_types,
    Address as EthernetAddress,
    Frame as EthernetFrame,
};
pub use self::ipv4::Address as Ipv4Address;
