//! Frame relay between the downstream transport and the network stack.
//!
//! Frames cross the boundary exactly once in each direction. Inbound, the
//! relay copies the transport's bytes into a pool allocated `PacketBuf` whose
//! ownership then moves to the stack. Outbound, the relay takes ownership of
//! the stack's `PacketBuf`, copies it out and frees it before the transport
//! is even asked to send.

use std::sync::{
    Arc,
    Mutex,
};

use core::interface::Interface;
use core::lock;
use core::netif::LinkState;
use core::storage::{
    PacketBuf,
    Pool,
};
use core::tcpip::Handle;
use {
    Error,
    Result,
};

/// The downstream transport, e.g. a USB network function or a TAP device.
pub trait Transport: Send {
    /// Returns true if the transport can accept a frame right now.
    fn ready(&self) -> bool;

    /// Sends a complete frame to the attached host.
    fn send(&mut self, frame: &[u8]) -> Result<()>;
}

/// How inbound frames reach the stack's input entry point.
#[derive(Clone)]
pub enum Delivery {
    /// Post the frame to the network processing context.
    Handoff(Handle),
    /// Call input from the transport's own context. Only safe where the
    /// stack tolerates input from any context.
    Direct,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Counters {
    pub rx_frames: usize,
    pub rx_bytes: usize,
    /// Inbound frames dropped before reaching the stack.
    pub rx_dropped: usize,
    /// Inbound frames the stack refused after a hand-off.
    pub rx_rejected: usize,
    pub tx_frames: usize,
    pub tx_bytes: usize,
    pub tx_dropped: usize,
}

pub struct Relay {
    downstream: Arc<Interface>,
    transport: Mutex<Box<Transport>>,
    pool: Pool,
    delivery: Delivery,
    max_frame_len: usize,
    counters: Arc<Mutex<Counters>>,
}

impl Relay {
    pub fn new(
        downstream: Arc<Interface>,
        transport: Box<Transport>,
        pool: Pool,
        delivery: Delivery,
        max_frame_len: usize,
    ) -> Relay {
        Relay {
            downstream,
            transport: Mutex::new(transport),
            pool,
            delivery,
            max_frame_len,
            counters: Arc::new(Mutex::new(Counters::default())),
        }
    }

    /// Bridges a frame received from the attached host into the stack.
    /// Returns false if the frame was dropped, dropped frames are never
    /// retried.
    pub fn receive(&self, bytes: &[u8]) -> bool {
        match self.try_receive(bytes) {
            Ok(()) => {
                let mut counters = lock(&self.counters);
                counters.rx_frames += 1;
                counters.rx_bytes += bytes.len();
                true
            }
            Err(err) => {
                debug!("Dropping inbound frame of {} bytes: {:?}.", bytes.len(), err);
                lock(&self.counters).rx_dropped += 1;
                false
            }
        }
    }

    fn try_receive(&self, bytes: &[u8]) -> Result<()> {
        if bytes.is_empty() || bytes.len() > self.max_frame_len {
            return Err(Error::Malformed);
        }

        if self.downstream.with_netif(|netif| netif.link_state()) != LinkState::Ready {
            return Err(Error::NotReady);
        }

        let mut frame = self.pool.alloc(bytes.len())?;
        frame.copy_from_slice(bytes)?;

        match self.delivery {
            Delivery::Handoff(ref handle) => {
                let downstream = self.downstream.clone();
                let counters = self.counters.clone();
                handle.callback(move || {
                    if let Err(err) = downstream.with_netif(|netif| netif.input(frame)) {
                        warn!("{} input rejected frame: {:?}.", downstream.role(), err);
                        lock(&counters).rx_rejected += 1;
                    }
                })
            }
            Delivery::Direct => self.downstream.with_netif(|netif| netif.input(frame)),
        }
    }

    /// Sends a frame from the stack to the attached host, taking ownership of
    /// it. Returns the number of bytes written, 0 if the frame was dropped.
    pub fn transmit(&self, frame: PacketBuf) -> usize {
        let len = frame.len();
        match self.try_transmit(frame) {
            Ok(written) => {
                let mut counters = lock(&self.counters);
                counters.tx_frames += 1;
                counters.tx_bytes += written;
                written
            }
            Err(err) => {
                debug!("Dropping outbound frame of {} bytes: {:?}.", len, err);
                lock(&self.counters).tx_dropped += 1;
                0
            }
        }
    }

    fn try_transmit(&self, frame: PacketBuf) -> Result<usize> {
        let mut transport = lock(&self.transport);
        if !transport.ready() {
            return Err(Error::Busy);
        }

        let mut buffer = vec![0; frame.len()];
        let written = frame.copy_to_slice(&mut buffer)?;
        drop(frame);

        transport.send(&buffer[.. written])?;
        Ok(written)
    }

    pub fn counters(&self) -> Counters {
        *lock(&self.counters)
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }
}
