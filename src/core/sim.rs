//! Simulated collaborators for driving the bridge without hardware.
//!
//! `SimNetif` behaves like a managed stack interface: addresses can only be
//! set through the managed API while the address service is stopped, stopping
//! a stopped service reports `Error::AlreadyStopped` and starting a running
//! one reports `Error::Conflict`. `Faults` scripts failures on top of that.

use std::sync::{
    Arc,
    Mutex,
};
use std::thread;

use core::lease::Lease;
use core::lock;
use core::netif::{
    Attachment,
    Netif,
    ServiceState,
};
use core::relay::Transport;
use core::repr::EthernetAddress;
use core::storage::PacketBuf;
use core::upstream::Station;
use {
    Error,
    Result,
};

/// Scripted failures. Counters fail that many of the next calls, flags fail
/// every call.
#[derive(Clone, Debug, Default)]
pub struct Faults {
    pub stop_failures: usize,
    /// Every stop reports a conflict.
    pub stop_always_fails: bool,
    /// Set calls reporting a conflict regardless of the service state.
    pub set_conflicts: usize,
    pub set_failures: usize,
    pub set_always_fails: bool,
    pub start_failures: usize,
    pub start_always_fails: bool,
    pub reject_input: bool,
    pub napt_unsupported: bool,
}

/// Calls observed by a `SimNetif`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SimStats {
    pub stop_calls: usize,
    pub set_calls: usize,
    pub direct_writes: usize,
    pub start_calls: usize,
    pub services_started: usize,
    pub inputs: usize,
    pub input_bytes: usize,
    pub napt_enabled: usize,
    /// Leases written through either the managed API or directly.
    pub address_writes: usize,
}

#[derive(Debug)]
struct State {
    attachment: Option<Attachment>,
    lease: Option<Lease>,
    service: ServiceState,
    faults: Faults,
    stats: SimStats,
    received: Vec<Vec<u8>>,
    mutators: Vec<String>,
}

impl State {
    fn mutated(&mut self) {
        let name = thread::current().name().unwrap_or("unnamed").to_string();
        self.mutators.push(name);
    }
}

/// Simulated stack interface. Clones share state, so a test can keep one
/// while the bridge owns another.
#[derive(Clone, Debug)]
pub struct SimNetif {
    name: String,
    hw_addr: EthernetAddress,
    state: Arc<Mutex<State>>,
}

fn take_fault(count: &mut usize) -> bool {
    if *count > 0 {
        *count -= 1;
        true
    } else {
        false
    }
}

impl SimNetif {
    /// Creates a detached interface with a stopped address service.
    pub fn new(name: &str, hw_addr: EthernetAddress) -> SimNetif {
        SimNetif {
            name: String::from(name),
            hw_addr,
            state: Arc::new(Mutex::new(State {
                attachment: None,
                lease: None,
                service: ServiceState::Stopped,
                faults: Faults::default(),
                stats: SimStats::default(),
                received: Vec::new(),
                mutators: Vec::new(),
            })),
        }
    }

    /// Attaches the interface to the stack, with or without its output entry
    /// points bound.
    pub fn attach(&self, bound: bool) {
        lock(&self.state).attachment = Some(Attachment {
            name: self.name.clone(),
            num: 0,
            flags: 0,
            mtu: 1500,
            hw_addr: self.hw_addr,
            output_bound: bound,
            link_output_bound: bound,
            input_bound: true,
        });
    }

    /// Binds the output entry points of an attached interface.
    pub fn bind(&self) {
        let mut state = lock(&self.state);
        if let Some(ref mut attachment) = state.attachment {
            attachment.output_bound = true;
            attachment.link_output_bound = true;
        }
    }

    pub fn detach(&self) {
        lock(&self.state).attachment = None;
    }

    pub fn set_faults(&self, faults: Faults) {
        lock(&self.state).faults = faults;
    }

    pub fn stats(&self) -> SimStats {
        lock(&self.state).stats
    }

    pub fn lease(&self) -> Option<Lease> {
        lock(&self.state).lease
    }

    pub fn service_state(&self) -> ServiceState {
        lock(&self.state).service
    }

    pub fn set_service_state(&self, service: ServiceState) {
        lock(&self.state).service = service;
    }

    /// Returns the name of the thread behind every address or service
    /// change, in call order.
    pub fn mutation_threads(&self) -> Vec<String> {
        lock(&self.state).mutators.clone()
    }

    /// Returns the contents of every frame the stack accepted.
    pub fn received(&self) -> Vec<Vec<u8>> {
        lock(&self.state).received.clone()
    }
}

impl Netif for SimNetif {
    fn attachment(&self) -> Option<Attachment> {
        lock(&self.state).attachment.clone()
    }

    fn input(&mut self, frame: PacketBuf) -> Result<()> {
        let mut state = lock(&self.state);
        state.stats.inputs += 1;

        if state.faults.reject_input {
            return Err(Error::Unknown("input rejected"));
        }

        state.stats.input_bytes += frame.len();
        state.received.push(frame.to_vec());
        Ok(())
    }

    fn ip_info(&self) -> Option<Lease> {
        lock(&self.state).lease
    }

    fn set_ip_info(&mut self, lease: &Lease) -> Result<()> {
        let mut state = lock(&self.state);
        state.mutated();
        state.stats.set_calls += 1;

        if take_fault(&mut state.faults.set_conflicts) || state.service != ServiceState::Stopped {
            return Err(Error::Conflict);
        }
        if state.faults.set_always_fails || take_fault(&mut state.faults.set_failures) {
            return Err(Error::Unknown("set address failed"));
        }

        state.lease = Some(*lease);
        state.stats.address_writes += 1;
        Ok(())
    }

    fn set_addr_direct(&mut self, lease: &Lease) {
        let mut state = lock(&self.state);
        state.mutated();
        state.lease = Some(*lease);
        state.stats.direct_writes += 1;
        state.stats.address_writes += 1;
    }

    fn service_state(&self) -> ServiceState {
        lock(&self.state).service
    }

    fn service_stop(&mut self) -> Result<()> {
        let mut state = lock(&self.state);
        state.mutated();
        state.stats.stop_calls += 1;

        if state.faults.stop_always_fails {
            return Err(Error::Conflict);
        }
        if take_fault(&mut state.faults.stop_failures) {
            return Err(Error::Unknown("stop failed"));
        }

        match state.service {
            ServiceState::Stopped => Err(Error::AlreadyStopped),
            _ => {
                state.service = ServiceState::Stopped;
                Ok(())
            }
        }
    }

    fn service_start(&mut self) -> Result<()> {
        let mut state = lock(&self.state);
        state.mutated();
        state.stats.start_calls += 1;

        if state.faults.start_always_fails || take_fault(&mut state.faults.start_failures) {
            return Err(Error::Unknown("start failed"));
        }

        match state.service {
            ServiceState::Stopped => {
                state.service = ServiceState::Running;
                state.stats.services_started += 1;
                Ok(())
            }
            _ => Err(Error::Conflict),
        }
    }

    fn enable_napt(&mut self) -> Result<()> {
        let mut state = lock(&self.state);
        state.mutated();
        if state.faults.napt_unsupported {
            return Err(Error::Unknown("napt unsupported"));
        }

        state.stats.napt_enabled += 1;
        Ok(())
    }
}

/// Simulated upstream station that records connection attempts.
#[derive(Clone, Debug, Default)]
pub struct SimStation {
    attempts: Arc<Mutex<Vec<(String, String)>>>,
}

impl SimStation {
    pub fn new() -> SimStation {
        SimStation::default()
    }

    pub fn attempts(&self) -> usize {
        lock(&self.attempts).len()
    }

    /// Returns the network name and passphrase of the latest attempt.
    pub fn credentials(&self) -> Option<(String, String)> {
        lock(&self.attempts).last().cloned()
    }
}

impl Station for SimStation {
    fn connect(&mut self, ssid: &str, passphrase: &str) -> Result<()> {
        lock(&self.attempts).push((ssid.to_string(), passphrase.to_string()));
        Ok(())
    }
}

#[derive(Debug)]
struct Wire {
    ready: bool,
    sent: Vec<Vec<u8>>,
}

/// Simulated downstream transport recording every frame it sends.
#[derive(Clone, Debug)]
pub struct SimTransport {
    wire: Arc<Mutex<Wire>>,
}

impl SimTransport {
    /// Creates a transport that is ready to send.
    pub fn new() -> SimTransport {
        SimTransport {
            wire: Arc::new(Mutex::new(Wire {
                ready: true,
                sent: Vec::new(),
            })),
        }
    }

    pub fn set_ready(&self, ready: bool) {
        lock(&self.wire).ready = ready;
    }

    pub fn sent(&self) -> Vec<Vec<u8>> {
        lock(&self.wire).sent.clone()
    }
}

impl Transport for SimTransport {
    fn ready(&self) -> bool {
        lock(&self.wire).ready
    }

    fn send(&mut self, frame: &[u8]) -> Result<()> {
        let mut wire = lock(&self.wire);
        if !wire.ready {
            return Err(Error::Busy);
        }

        wire.sent.push(frame.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::repr::Ipv4Address;

    fn lease() -> Lease {
        Lease::self_gateway(
            Ipv4Address::new([192, 168, 7, 1]),
            Ipv4Address::new([255, 255, 255, 0]),
        )
    }

    #[test]
    fn test_service_lifecycle() {
        let mut netif = SimNetif::new("sim", EthernetAddress::new([0x02, 0, 0, 0, 0, 9]));

        assert_matches!(netif.service_stop(), Err(Error::AlreadyStopped));
        assert_matches!(netif.service_start(), Ok(()));
        assert_matches!(netif.service_start(), Err(Error::Conflict));
        assert_matches!(netif.set_ip_info(&lease()), Err(Error::Conflict));
        assert_matches!(netif.service_stop(), Ok(()));
        assert_matches!(netif.set_ip_info(&lease()), Ok(()));
        assert_eq!(netif.ip_info(), Some(lease()));
    }

    #[test]
    fn test_faults_are_consumed() {
        let mut netif = SimNetif::new("sim", EthernetAddress::new([0x02, 0, 0, 0, 0, 9]));
        netif.set_faults(Faults {
            start_failures: 2,
            ..Faults::default()
        });

        assert_matches!(netif.service_start(), Err(Error::Unknown(_)));
        assert_matches!(netif.service_start(), Err(Error::Unknown(_)));
        assert_matches!(netif.service_start(), Ok(()));
        assert_eq!(netif.stats().start_calls, 3);
        assert_eq!(netif.stats().services_started, 1);
    }

    #[test]
    fn test_attach_and_bind() {
        let netif = SimNetif::new("sim", EthernetAddress::new([0x02, 0, 0, 0, 0, 9]));
        assert!(netif.attachment().is_none());

        netif.attach(false);
        assert!(!netif.attachment().unwrap().is_ready());

        netif.bind();
        assert!(netif.attachment().unwrap().is_ready());

        netif.detach();
        assert!(netif.attachment().is_none());
    }
}
