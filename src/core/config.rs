//! Compile time identity and tunables of the bridge.

use std::time::Duration;

use core::lease::Lease;
use core::repr::{
    EthernetAddress,
    Ipv4Address,
};
use core::retry::RetryPolicy;

/// Name of the upstream network, overridable at build time.
pub const UPSTREAM_SSID: &'static str = match option_env!("USRBRIDGE_SSID") {
    Some(ssid) => ssid,
    None => "usrbridge-upstream",
};

/// Passphrase of the upstream network, overridable at build time.
pub const UPSTREAM_PASSPHRASE: &'static str = match option_env!("USRBRIDGE_PASSPHRASE") {
    Some(passphrase) => passphrase,
    None => "usrbridge-passphrase",
};

/// Locally administered hardware address presented to the attached host.
pub const DOWNSTREAM_MAC: [u8; 6] = [0x02, 0x00, 0x11, 0x22, 0x33, 0x44];

/// Host part of a downstream address derived from the upstream network.
pub const DERIVED_HOST_ID: u8 = 253;

lazy_static! {
    /// Netmask used whenever no other is known.
    pub static ref DEFAULT_NETMASK: Ipv4Address = {
        Ipv4Address::new([255, 255, 255, 0])
    };

    /// Downstream lease before any upstream address is known.
    pub static ref DEFAULT_LEASE: Lease = {
        Lease::self_gateway(Ipv4Address::new([192, 168, 42, 1]), *DEFAULT_NETMASK)
    };
}

/// Runtime view of every bridge tunable.
#[derive(Clone, Debug)]
pub struct Config {
    pub ssid: &'static str,
    pub passphrase: &'static str,
    /// Hardware address handed to the downstream transport.
    pub mac: EthernetAddress,
    pub default_lease: Lease,
    pub derived_host_id: u8,
    /// Fallback cadence of readiness checks between attach signals.
    pub poll_interval: Duration,
    /// Readiness wait after the transport signals link attach.
    pub attach_timeout: Duration,
    /// Readiness wait when the bridge starts.
    pub startup_timeout: Duration,
    pub stop_policy: RetryPolicy,
    pub set_policy: RetryPolicy,
    pub start_policy: RetryPolicy,
    /// Pause between a recovery stop and the retried operation.
    pub conflict_backoff: Duration,
    pub reconnect_delay: Duration,
    pub segment_len: usize,
    pub pool_segments: usize,
    /// Depth of the hand-off queue into the network context.
    pub mailbox_len: usize,
    /// Deliver inbound frames from the transport's own context instead of
    /// handing them off. Only for builds without a hand-off primitive.
    pub direct_input: bool,
    pub mtu: usize,
    pub max_frame_len: usize,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            ssid: UPSTREAM_SSID,
            passphrase: UPSTREAM_PASSPHRASE,
            mac: EthernetAddress::new(DOWNSTREAM_MAC),
            default_lease: *DEFAULT_LEASE,
            derived_host_id: DERIVED_HOST_ID,
            poll_interval: Duration::from_millis(100),
            attach_timeout: Duration::from_millis(5000),
            startup_timeout: Duration::from_millis(2000),
            stop_policy: RetryPolicy::from_millis(8, 120),
            set_policy: RetryPolicy::from_millis(8, 150),
            start_policy: RetryPolicy::from_millis(8, 200),
            conflict_backoff: Duration::from_millis(150),
            reconnect_delay: Duration::from_millis(500),
            segment_len: 512,
            pool_segments: 64,
            mailbox_len: 32,
            direct_input: false,
            mtu: 1500,
            max_frame_len: 1514,
        }
    }
}
