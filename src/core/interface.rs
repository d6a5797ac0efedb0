//! Shared handle on one bridge interface.
//!
//! An `Interface` owns the stack view of an interface, the attach signal the
//! readiness wait blocks on, and the provisioning slot that keeps at most one
//! provisioning run outstanding.

use std::fmt::{
    Display,
    Formatter,
    Result as FmtResult,
};
use std::sync::{
    Condvar,
    Mutex,
};
use std::time::Duration;

use core::lease::Lease;
use core::lock;
use core::netif::Netif;
use core::provision::Outcome;
use core::time::Env;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    /// The wireless client side, which obtains its address from the upstream
    /// network.
    Upstream,
    /// The side presented to the directly attached host.
    Downstream,
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        match *self {
            Role::Upstream => write!(f, "upstream"),
            Role::Downstream => write!(f, "downstream"),
        }
    }
}

/// What a provisioning trigger asks for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Request {
    /// Provision exactly this lease.
    Lease(Lease),
    /// Provision the most recently requested lease, or default if none was
    /// requested yet.
    Current { default: Lease },
}

impl From<Lease> for Request {
    fn from(lease: Lease) -> Request {
        Request::Lease(lease)
    }
}

#[derive(Debug, Default)]
struct Slot {
    running: bool,
    pending: Option<Lease>,
    target: Option<Lease>,
    outcome: Option<Outcome>,
}

/// Provisioning status as last recorded on an interface.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Status {
    /// Most recently requested lease.
    pub target: Option<Lease>,
    /// Outcome of the most recently finished provisioning run.
    pub outcome: Option<Outcome>,
    pub running: bool,
}

pub struct Interface {
    role: Role,
    netif: Mutex<Box<Netif>>,
    generation: Mutex<u64>,
    attached: Condvar,
    slot: Mutex<Slot>,
    idle: Condvar,
}

impl Interface {
    pub fn new(role: Role, netif: Box<Netif>) -> Interface {
        Interface {
            role,
            netif: Mutex::new(netif),
            generation: Mutex::new(0),
            attached: Condvar::new(),
            slot: Mutex::new(Slot::default()),
            idle: Condvar::new(),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// Runs f with exclusive access to the stack view of the interface.
    pub fn with_netif<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut Box<Netif>) -> R,
    {
        let mut netif = lock(&self.netif);
        f(&mut netif)
    }

    /// Wakes every task waiting for this interface to become ready.
    pub fn notify_attached(&self) {
        let mut generation = lock(&self.generation);
        *generation += 1;
        debug!("{} attach signal (generation {}).", self.role, *generation);
        self.attached.notify_all();
    }

    /// Returns the number of attach signals raised so far.
    pub fn generation(&self) -> u64 {
        *lock(&self.generation)
    }

    /// Blocks until an attach signal newer than seen is raised or timeout
    /// passes, returning the latest generation.
    pub fn wait_signal<E: Env>(&self, env: &E, seen: u64, timeout: Duration) -> u64 {
        let generation = lock(&self.generation);
        if *generation != seen {
            return *generation;
        }

        let (generation, _) = env.wait_timeout(&self.attached, generation, timeout);
        *generation
    }

    pub fn status(&self) -> Status {
        let slot = lock(&self.slot);
        Status {
            target: slot.target,
            outcome: slot.outcome,
            running: slot.running,
        }
    }

    /// Resolves request against the current target and records the result
    /// as the new target. Returns the lease and true if the caller should
    /// start a run, false if a run is already outstanding and the lease was
    /// queued for it instead.
    pub(crate) fn begin_provisioning(&self, request: Request) -> (Lease, bool) {
        let mut slot = lock(&self.slot);
        let lease = match request {
            Request::Lease(lease) => lease,
            Request::Current { default } => slot.target.unwrap_or(default),
        };
        slot.target = Some(lease);

        if slot.running {
            if let Some(replaced) = slot.pending.replace(lease) {
                debug!("{} pending lease {} superseded by {}.", self.role, replaced, lease);
            }
            (lease, false)
        } else {
            slot.running = true;
            (lease, true)
        }
    }

    /// Records the outcome of a finished run. Returns the lease queued while
    /// it ran, in which case the run must continue with it.
    pub(crate) fn finish_provisioning(&self, outcome: Option<Outcome>) -> Option<Lease> {
        let mut slot = lock(&self.slot);
        if outcome.is_some() {
            slot.outcome = outcome;
        }

        let pending = slot.pending.take();
        if pending.is_none() {
            slot.running = false;
            self.idle.notify_all();
        }
        pending
    }

    /// Blocks until no provisioning run is outstanding or timeout passes.
    /// Returns true if the interface is idle.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let slot = lock(&self.slot);
        let res = self.idle.wait_timeout_while(slot, timeout, |slot| slot.running);
        let (slot, _) = match res {
            Ok(waited) => waited,
            Err(err) => err.into_inner(),
        };
        !slot.running
    }
}
