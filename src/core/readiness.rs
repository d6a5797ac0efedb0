//! Waiting for an interface to become structurally ready.
//!
//! An interface can be attached to the stack before its transmit entry points
//! are bound. Writing addresses to such an interface silently misbehaves, so
//! every provisioning run first waits here.

use std::cmp;
use std::time::Duration;

use core::interface::Interface;
use core::netif::Attachment;
use core::time::Env;

/// Waits up to timeout for the interface to report both output entry points
/// bound. Attach signals wake the wait early, poll_interval bounds the time
/// between checks when no signal arrives.
///
/// Returns the last attachment seen, and whether it was ready. A timed out
/// wait is not an error, the caller proceeds with provisioning regardless.
pub fn wait_ready<E: Env>(
    env: &E,
    interface: &Interface,
    timeout: Duration,
    poll_interval: Duration,
) -> (Option<Attachment>, bool) {
    let start = env.now_instant();
    let mut seen = interface.generation();

    loop {
        let attachment = interface.with_netif(|netif| netif.attachment());

        match attachment {
            Some(ref attachment) if attachment.is_ready() => {
                info!("{} ready: {}.", interface.role(), attachment);
                return (Some(attachment.clone()), true);
            }
            Some(ref attachment) => {
                debug!("{} attached but not bound: {}.", interface.role(), attachment);
            }
            None => {
                debug!("{} not attached.", interface.role());
            }
        }

        let elapsed = env.now_instant() - start;
        if elapsed >= timeout {
            warn!(
                "{} not ready after {:?}, continuing anyway.",
                interface.role(),
                timeout
            );
            return (attachment, false);
        }

        let step = cmp::min(timeout - elapsed, poll_interval);
        seen = interface.wait_signal(env, seen, step);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    use core::interface::Role;
    use core::repr::EthernetAddress;
    use core::sim::SimNetif;
    use core::time::{
        MockEnv,
        SystemEnv,
    };

    fn interface(netif: &SimNetif) -> Interface {
        Interface::new(Role::Downstream, Box::new(netif.clone()))
    }

    fn sim() -> SimNetif {
        SimNetif::new("ds", EthernetAddress::new([0x02, 0, 0, 0, 0, 1]))
    }

    #[test]
    fn test_ready_immediately() {
        let env = MockEnv::new();
        let netif = sim();
        netif.attach(true);
        let interface = interface(&netif);
        let start = env.now_instant();

        let (attachment, ready) =
            wait_ready(&env, &interface, Duration::from_secs(2), Duration::from_millis(100));

        assert!(ready);
        assert!(attachment.unwrap().is_ready());
        assert_eq!(env.now_instant(), start);
    }

    #[test]
    fn test_unbound_times_out() {
        let env = MockEnv::new();
        let netif = sim();
        netif.attach(false);
        let interface = interface(&netif);
        let start = env.now_instant();

        let (attachment, ready) =
            wait_ready(&env, &interface, Duration::from_secs(2), Duration::from_millis(100));

        assert!(!ready);
        assert!(!attachment.unwrap().is_ready());
        assert_eq!(env.now_instant() - start, Duration::from_secs(2));
    }

    #[test]
    fn test_detached_times_out() {
        let env = MockEnv::new();
        let interface = interface(&sim());

        let (attachment, ready) =
            wait_ready(&env, &interface, Duration::from_millis(250), Duration::from_millis(100));

        assert!(!ready);
        assert_eq!(attachment, None);
    }

    #[test]
    fn test_signal_wakes_wait() {
        let netif = sim();
        netif.attach(false);
        let interface = Arc::new(interface(&netif));

        let waiter = {
            let interface = interface.clone();
            thread::spawn(move || {
                wait_ready(
                    &SystemEnv::new(),
                    &interface,
                    Duration::from_secs(10),
                    Duration::from_secs(10),
                )
            })
        };

        thread::sleep(Duration::from_millis(20));
        netif.bind();
        interface.notify_attached();

        let (_, ready) = waiter.join().unwrap();
        assert!(ready);
    }
}
