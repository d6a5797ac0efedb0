//! Upstream link management.
//!
//! The upstream station reports its connectivity as `Event`s. The manager
//! reconnects after every disconnect, without giving up, and re-provisions
//! the downstream interface whenever the upstream acquires an address.

use std::sync::mpsc::Receiver;
use std::sync::Arc;

use core::config::Config;
use core::interface::Interface;
use core::lease::Lease;
use core::provision;
use core::repr::Ipv4Address;
use core::tcpip::Handle;
use core::time::Env;
use Result;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Event {
    /// The station was started and may connect.
    Start,
    /// The association was lost, with the reason reported by the radio.
    Disconnected(u16),
    AddressAcquired {
        addr: Ipv4Address,
        netmask: Ipv4Address,
        gateway: Ipv4Address,
    },
}

/// The wireless client interface's connection control.
pub trait Station: Send {
    /// Starts a connection attempt to the network named ssid. Completion is
    /// reported asynchronously through events.
    fn connect(&mut self, ssid: &str, passphrase: &str) -> Result<()>;
}

pub struct LinkManager<E: Env> {
    station: Box<Station>,
    upstream: Arc<Interface>,
    downstream: Arc<Interface>,
    net: Handle,
    config: Config,
    env: E,
    connect_attempts: usize,
    upstream_lease: Option<Lease>,
}

impl<E: Env> LinkManager<E> {
    pub fn new(
        station: Box<Station>,
        upstream: Arc<Interface>,
        downstream: Arc<Interface>,
        net: Handle,
        config: Config,
        env: E,
    ) -> LinkManager<E> {
        LinkManager {
            station,
            upstream,
            downstream,
            net,
            config,
            env,
            connect_attempts: 0,
            upstream_lease: None,
        }
    }

    pub fn handle(&mut self, event: Event) {
        match event {
            Event::Start => {
                info!("Upstream started, connecting to '{}'.", self.config.ssid);
                self.connect();
            }
            Event::Disconnected(reason) => {
                warn!(
                    "Upstream disconnected (reason {}), reconnecting in {:?}.",
                    reason, self.config.reconnect_delay
                );
                self.env.sleep(self.config.reconnect_delay);
                self.connect();
            }
            Event::AddressAcquired {
                addr,
                netmask,
                gateway,
            } => {
                let upstream = Lease::new(addr, netmask, gateway);
                info!("Upstream acquired {}.", upstream);
                self.upstream_lease = Some(upstream);

                let interface = self.upstream.clone();
                let res = self.net
                    .call(move || interface.with_netif(|netif| netif.enable_napt()))
                    .and_then(|res| res);
                if let Err(err) = res {
                    warn!("Failed to enable address translation upstream: {:?}.", err);
                }

                let lease = Lease::derive(addr, netmask, self.config.derived_host_id);
                info!("Derived downstream lease {}.", lease);

                let res = provision::spawn(
                    self.downstream.clone(),
                    self.net.clone(),
                    lease,
                    self.config.attach_timeout,
                    self.config.clone(),
                    self.env.clone(),
                );
                if let Err(err) = res {
                    error!("Failed to provision downstream with {}: {:?}.", lease, err);
                }
            }
        }
    }

    fn connect(&mut self) {
        self.connect_attempts += 1;
        debug!("Upstream connection attempt {}.", self.connect_attempts);
        let res = self.station
            .connect(self.config.ssid, self.config.passphrase);
        if let Err(err) = res {
            warn!("Upstream connection attempt failed to start: {:?}.", err);
        }
    }

    /// Handles events until every sender is gone.
    pub fn run(&mut self, events: Receiver<Event>) {
        for event in events.iter() {
            self.handle(event);
        }
        debug!("Upstream event source closed.");
    }

    pub fn connect_attempts(&self) -> usize {
        self.connect_attempts
    }

    /// Returns the address most recently acquired upstream.
    pub fn upstream_lease(&self) -> Option<Lease> {
        self.upstream_lease
    }
}
