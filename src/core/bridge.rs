//! The bridge context.
//!
//! A `Bridge` owns both interfaces, the frame relay and the network
//! processing context, and is the entry point for the downstream transport:
//! it receives and transmits frames, supplies the hardware address, and
//! takes the link attach signal.

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use core::config::Config;
use core::interface::{
    Interface,
    Request,
    Role,
    Status,
};
use core::netif::Netif;
use core::provision;
use core::relay::{
    Counters,
    Delivery,
    Relay,
    Transport,
};
use core::repr::EthernetAddress;
use core::storage::{
    PacketBuf,
    Pool,
};
use core::tcpip::NetContext;
use core::time::Env;
use core::upstream::{
    LinkManager,
    Station,
};
use Result;

pub struct Bridge<E: Env> {
    config: Config,
    env: E,
    upstream: Arc<Interface>,
    downstream: Arc<Interface>,
    relay: Relay,
    // Dropped last, stops and joins the network processing thread.
    net: NetContext,
}

impl<E: Env> Bridge<E> {
    /// Creates a bridge over the given stack interfaces and downstream
    /// transport, and starts the network processing context.
    ///
    /// # Errors
    ///
    /// An IO error if the network processing context could not be started.
    pub fn new(
        config: Config,
        env: E,
        upstream: Box<Netif>,
        downstream: Box<Netif>,
        transport: Box<Transport>,
    ) -> Result<Bridge<E>> {
        let net = NetContext::spawn(config.mailbox_len)?;
        let delivery = if config.direct_input {
            warn!("Delivering inbound frames directly from the transport context.");
            Delivery::Direct
        } else {
            Delivery::Handoff(net.handle())
        };

        let upstream = Arc::new(Interface::new(Role::Upstream, upstream));
        let downstream = Arc::new(Interface::new(Role::Downstream, downstream));
        let relay = Relay::new(
            downstream.clone(),
            transport,
            Pool::new(config.segment_len, config.pool_segments),
            delivery,
            config.max_frame_len,
        );

        Ok(Bridge {
            config,
            env,
            upstream,
            downstream,
            relay,
            net,
        })
    }

    /// Provisions the default lease on the downstream interface, waiting a
    /// short while for it to become ready.
    pub fn start(&self) -> Result<Option<JoinHandle<()>>> {
        info!(
            "Bridge starting, downstream mac {}, default lease {}.",
            self.config.mac, self.config.default_lease
        );
        self.provision(self.config.default_lease, self.config.startup_timeout)
    }

    /// Handles the transport's link attach signal: wakes readiness waits and
    /// provisions the downstream interface with its current target, or the
    /// default lease if there is none yet. The target is read in the same
    /// step that queues it, so a lease requested concurrently is never
    /// replaced by a stale one.
    pub fn link_attached(&self) -> Result<Option<JoinHandle<()>>> {
        info!("Downstream link attached.");
        self.downstream.notify_attached();

        let current = Request::Current {
            default: self.config.default_lease,
        };
        self.provision(current, self.config.attach_timeout)
    }

    fn provision<R: Into<Request>>(
        &self,
        request: R,
        wait: Duration,
    ) -> Result<Option<JoinHandle<()>>> {
        provision::spawn(
            self.downstream.clone(),
            self.net.handle(),
            request,
            wait,
            self.config.clone(),
            self.env.clone(),
        )
    }

    /// Bridges a frame from the attached host into the stack.
    pub fn receive(&self, bytes: &[u8]) -> bool {
        self.relay.receive(bytes)
    }

    /// Sends a frame from the stack to the attached host. Returns the number
    /// of bytes written.
    pub fn transmit(&self, frame: PacketBuf) -> usize {
        self.relay.transmit(frame)
    }

    /// Returns the hardware address the transport presents to the host.
    pub fn mac_address(&self) -> [u8; 6] {
        self.config.mac.octets()
    }

    /// Creates the manager for upstream connectivity events.
    pub fn link_manager(&self, station: Box<Station>) -> LinkManager<E> {
        LinkManager::new(
            station,
            self.upstream.clone(),
            self.downstream.clone(),
            self.net.handle(),
            self.config.clone(),
            self.env.clone(),
        )
    }

    /// Waits until every frame handed off so far has been delivered.
    pub fn flush(&self) -> Result<()> {
        self.net.handle().call(|| ())
    }

    pub fn status(&self) -> Status {
        self.downstream.status()
    }

    pub fn counters(&self) -> Counters {
        self.relay.counters()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn upstream(&self) -> &Arc<Interface> {
        &self.upstream
    }

    pub fn downstream(&self) -> &Arc<Interface> {
        &self.downstream
    }

    pub fn relay(&self) -> &Relay {
        &self.relay
    }
}
