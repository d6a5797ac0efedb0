//! Address provisioning for one interface.
//!
//! A provisioning run walks a fixed sequence of phases:
//!
//! ```text
//! StoppingService -> SettingAddress -> StartingService -> Done
//!        |                 |                 ^
//!        +-----------------+-> FallbackDirect+
//! ```
//!
//! Every managed API interaction is bounded by a `RetryPolicy`. When the
//! managed API cannot stop the address service or apply the lease, the lease
//! is written straight into the interface and the run ends `Degraded` at
//! best. Runs never error out, a run that cannot start the address service
//! ends `Failed` and leaves the interface on whatever address it has.
//!
//! Interface mutations are posted to the network processing context and
//! waited for, the provisioning task itself only reads.

use std::sync::Arc;
use std::thread::{
    self,
    JoinHandle,
};
use std::time::Duration;

use core::config::Config;
use core::interface::{
    Interface,
    Request,
};
use core::lease::Lease;
use core::netif::{
    Netif,
    ServiceState,
};
use core::readiness;
use core::tcpip::Handle;
use core::time::Env;
use {
    Error,
    Result,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The lease was applied through the managed API and the address service
    /// is running.
    Applied,
    /// The lease was written directly, bypassing the managed API, and the
    /// address service is running.
    Degraded,
    /// The address service could not be started.
    Failed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    StoppingService,
    SettingAddress,
    FallbackDirect,
    StartingService,
    Done(Outcome),
}

/// Record of one provisioning run.
#[derive(Clone, Debug)]
pub struct Sequence {
    pub lease: Lease,
    /// Phases in the order they were entered, ending with `Phase::Done`.
    pub phases: Vec<Phase>,
    pub degraded: bool,
}

impl Sequence {
    pub fn outcome(&self) -> Option<Outcome> {
        match self.phases.last() {
            Some(&Phase::Done(outcome)) => Some(outcome),
            _ => None,
        }
    }

    /// Returns the number of times a phase was entered.
    pub fn entered(&self, phase: Phase) -> usize {
        self.phases.iter().filter(|entered| **entered == phase).count()
    }
}

/// Drives one interface to a target lease.
///
/// A provisioner must not run concurrently with another one for the same
/// interface, `spawn` enforces this.
pub struct Provisioner<'a, E: Env + 'a> {
    interface: &'a Arc<Interface>,
    net: Handle,
    config: &'a Config,
    env: &'a E,
}

impl<'a, E: Env> Provisioner<'a, E> {
    pub fn new(
        interface: &'a Arc<Interface>,
        net: Handle,
        config: &'a Config,
        env: &'a E,
    ) -> Provisioner<'a, E> {
        Provisioner {
            interface,
            net,
            config,
            env,
        }
    }

    pub fn ensure_lease(&self, lease: &Lease) -> Outcome {
        match self.run(lease).outcome() {
            Some(outcome) => outcome,
            None => Outcome::Failed,
        }
    }

    /// Runs the phase sequence for lease to completion.
    pub fn run(&self, lease: &Lease) -> Sequence {
        let role = self.interface.role();
        let mut sequence = Sequence {
            lease: *lease,
            phases: Vec::new(),
            degraded: false,
        };

        let mut phase = if self.is_applied(lease) {
            debug!("{} already running with {}.", role, lease);
            // A lease written directly stays degraded until a full run replaces it.
            match self.interface.status().outcome {
                Some(Outcome::Degraded) => Phase::Done(Outcome::Degraded),
                _ => Phase::Done(Outcome::Applied),
            }
        } else {
            Phase::StoppingService
        };

        loop {
            debug!("{} provisioning {}: {:?}.", role, lease, phase);
            sequence.phases.push(phase);

            phase = match phase {
                Phase::StoppingService => match self.stop_service() {
                    Ok(()) => Phase::SettingAddress,
                    Err(err) => {
                        warn!(
                            "{} address service did not stop ({:?}), writing {} directly.",
                            role, err, lease
                        );
                        Phase::FallbackDirect
                    }
                },
                Phase::SettingAddress => match self.set_address(lease) {
                    Ok(()) => Phase::StartingService,
                    Err(err) => {
                        warn!(
                            "{} managed API rejected {} ({:?}), writing it directly.",
                            role, lease, err
                        );
                        Phase::FallbackDirect
                    }
                },
                Phase::FallbackDirect => {
                    let direct = *lease;
                    if let Err(err) = self.on_net(move |netif| netif.set_addr_direct(&direct)) {
                        error!("{} direct write of {} failed: {:?}.", role, lease, err);
                    }
                    sequence.degraded = true;
                    Phase::StartingService
                }
                Phase::StartingService => match self.start_service() {
                    Ok(()) if sequence.degraded => Phase::Done(Outcome::Degraded),
                    Ok(()) => Phase::Done(Outcome::Applied),
                    Err(err) => {
                        error!(
                            "{} address service failed to start ({:?}), attached hosts may \
                             need a static address in {}.",
                            role, err, lease
                        );
                        Phase::Done(Outcome::Failed)
                    }
                },
                Phase::Done(outcome) => {
                    info!("{} provisioned {}: {:?}.", role, lease, outcome);
                    return sequence;
                }
            };
        }
    }

    /// Runs f against the interface on the network processing context.
    fn on_net<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut Box<Netif>) -> R + Send + 'static,
        R: Send + 'static,
    {
        let interface = self.interface.clone();
        self.net.call(move || interface.with_netif(f))
    }

    fn is_applied(&self, lease: &Lease) -> bool {
        self.interface.with_netif(|netif| {
            netif.ip_info() == Some(*lease) && netif.service_state() == ServiceState::Running
        })
    }

    fn stop_once(&self) -> Result<()> {
        match self.on_net(|netif| netif.service_stop()).and_then(|res| res) {
            Ok(()) | Err(Error::AlreadyStopped) => Ok(()),
            Err(err) => Err(err),
        }
    }

    fn set_once(&self, lease: &Lease) -> Result<()> {
        let lease = *lease;
        self.on_net(move |netif| netif.set_ip_info(&lease))
            .and_then(|res| res)
    }

    fn start_once(&self) -> Result<()> {
        self.on_net(|netif| netif.service_start())
            .and_then(|res| res)
    }

    /// Stops the address service after a conflict and waits for it to settle.
    fn recover_conflict(&self, op: &str) -> Result<()> {
        debug!(
            "{} {} conflicts with the address service, stopping it.",
            self.interface.role(),
            op
        );
        self.stop_once()?;
        self.env.sleep(self.config.conflict_backoff);
        Ok(())
    }

    fn stop_service(&self) -> Result<()> {
        self.config
            .stop_policy
            .run(self.env, "address service stop", |_| self.stop_once())
    }

    fn set_address(&self, lease: &Lease) -> Result<()> {
        self.config.set_policy.run(self.env, "set address", |_| {
            match self.set_once(lease) {
                Err(Error::Conflict) => {
                    self.recover_conflict("set address")?;
                    self.set_once(lease)
                }
                res => res,
            }
        })
    }

    fn start_service(&self) -> Result<()> {
        self.config
            .start_policy
            .run(self.env, "address service start", |_| match self.start_once() {
                Ok(()) => Ok(()),
                Err(err) => {
                    self.dump();
                    match err {
                        Error::Conflict => {
                            self.recover_conflict("address service start")?;
                            self.start_once()
                        }
                        err => Err(err),
                    }
                }
            })
    }

    fn dump(&self) {
        match self.interface.with_netif(|netif| netif.attachment()) {
            Some(attachment) => debug!("{} state: {}.", self.interface.role(), attachment),
            None => debug!("{} state: not attached.", self.interface.role()),
        }
    }
}

/// Provisions the requested lease on a dedicated task once the interface is
/// ready, waiting at most wait for readiness. Interface mutations run on the
/// network processing context behind net.
///
/// If a run is already outstanding for the interface, the lease is queued
/// for that run instead and no task is spawned. Leases queued while a run is
/// in progress are coalesced, only the latest is applied.
///
/// # Errors
///
/// An IO error if the task could not be spawned.
pub fn spawn<E, R>(
    interface: Arc<Interface>,
    net: Handle,
    request: R,
    wait: Duration,
    config: Config,
    env: E,
) -> Result<Option<JoinHandle<()>>>
where
    E: Env,
    R: Into<Request>,
{
    let (lease, start) = interface.begin_provisioning(request.into());
    if !start {
        info!(
            "{} provisioning in progress, queued {}.",
            interface.role(),
            lease
        );
        return Ok(None);
    }

    let task = interface.clone();
    let res = thread::Builder::new()
        .name(format!("provision-{}", interface.role()))
        .spawn(move || {
            let mut lease = lease;
            loop {
                readiness::wait_ready(&env, &task, wait, config.poll_interval);
                let outcome =
                    Provisioner::new(&task, net.clone(), &config, &env).ensure_lease(&lease);
                match task.finish_provisioning(Some(outcome)) {
                    Some(next) => lease = next,
                    None => break,
                }
            }
        });

    match res {
        Ok(handle) => Ok(Some(handle)),
        Err(err) => {
            error!("Failed to spawn {} provisioning: {:?}.", interface.role(), err);
            while let Some(dropped) = interface.finish_provisioning(None) {
                warn!("Dropping queued {} lease {}.", interface.role(), dropped);
            }
            Err(Error::from(err))
        }
    }
}
