//! The network stack as seen from the bridge.

use std::fmt::{
    Display,
    Formatter,
    Result as FmtResult,
};

use core::lease::Lease;
use core::repr::EthernetAddress;
use core::storage::PacketBuf;
use Result;

/// Structural state of a stack interface.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkState {
    Down,
    /// Attached to the stack, but transmit entry points not yet bound.
    Attaching,
    Ready,
}

/// Lifecycle of the address service (DHCP server) on an interface.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ServiceState {
    Stopped,
    Starting,
    Running,
    Unknown,
}

/// Diagnostic snapshot of an interface attached to the stack.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attachment {
    pub name: String,
    pub num: u8,
    pub flags: u32,
    pub mtu: usize,
    pub hw_addr: EthernetAddress,
    pub output_bound: bool,
    pub link_output_bound: bool,
    pub input_bound: bool,
}

impl Attachment {
    /// An interface is ready once both its output and link output entry
    /// points are bound.
    pub fn is_ready(&self) -> bool {
        self.output_bound && self.link_output_bound
    }

    pub fn link_state(&self) -> LinkState {
        if self.is_ready() {
            LinkState::Ready
        } else {
            LinkState::Attaching
        }
    }
}

fn bound(is_bound: bool) -> &'static str {
    if is_bound {
        "bound"
    } else {
        "NULL"
    }
}

impl Display for Attachment {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        write!(
            f,
            "name='{}' num={} flags=0x{:08x} mtu={} hwaddr={} output={} linkoutput={} input={}",
            self.name,
            self.num,
            self.flags,
            self.mtu,
            self.hw_addr,
            bound(self.output_bound),
            bound(self.link_output_bound),
            bound(self.input_bound),
        )
    }
}

/// Managed view of one network stack interface and its address service.
///
/// The bridge only calls the mutating methods from the network processing
/// context, and never calls into the same interface concurrently.
pub trait Netif: Send {
    /// Returns the interface attached to the stack, if any.
    fn attachment(&self) -> Option<Attachment>;

    fn link_state(&self) -> LinkState {
        match self.attachment() {
            Some(attachment) => attachment.link_state(),
            None => LinkState::Down,
        }
    }

    /// Hands a received frame to the stack's input entry point. The frame is
    /// consumed whether or not the stack accepts it.
    fn input(&mut self, frame: PacketBuf) -> Result<()>;

    /// Returns the IP configuration currently applied, if any.
    fn ip_info(&self) -> Option<Lease>;

    /// Applies a lease through the managed API.
    ///
    /// # Errors
    ///
    /// `Error::Conflict` if the address service is not stopped.
    fn set_ip_info(&mut self, lease: &Lease) -> Result<()>;

    /// Writes a lease straight into the low level interface state, bypassing
    /// the managed API and its service checks.
    fn set_addr_direct(&mut self, lease: &Lease);

    fn service_state(&self) -> ServiceState;

    /// Stops the address service.
    ///
    /// # Errors
    ///
    /// `Error::AlreadyStopped` if there was nothing to stop.
    fn service_stop(&mut self) -> Result<()>;

    /// Starts the address service.
    ///
    /// # Errors
    ///
    /// `Error::Conflict` if the service is not fully stopped.
    fn service_start(&mut self) -> Result<()>;

    /// Enables address translation for traffic leaving through this
    /// interface.
    fn enable_napt(&mut self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attachment(output_bound: bool, link_output_bound: bool) -> Attachment {
        Attachment {
            name: String::from("us"),
            num: 2,
            flags: 0x2a,
            mtu: 1500,
            hw_addr: EthernetAddress::new([0x02, 0x00, 0x11, 0x22, 0x33, 0x44]),
            output_bound,
            link_output_bound,
            input_bound: true,
        }
    }

    #[test]
    fn test_ready_needs_both_entry_points() {
        assert_eq!(attachment(true, true).link_state(), LinkState::Ready);
        assert_eq!(attachment(true, false).link_state(), LinkState::Attaching);
        assert_eq!(attachment(false, true).link_state(), LinkState::Attaching);
    }

    #[test]
    fn test_display() {
        assert_eq!(
            attachment(true, false).to_string(),
            "name='us' num=2 flags=0x0000002a mtu=1500 hwaddr=02:00:11:22:33:44 \
             output=bound linkoutput=NULL input=bound"
        );
    }
}
