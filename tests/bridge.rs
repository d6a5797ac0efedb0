extern crate rand;
extern crate usrbridge;

mod context;

use std::time::Duration;

use usrbridge::core::config::Config;
use usrbridge::core::lease::Lease;
use usrbridge::core::netif::ServiceState;
use usrbridge::core::provision::Outcome;
use usrbridge::core::repr::Ipv4Address;
use usrbridge::core::sim::{
    Faults,
    SimStation,
};
use usrbridge::core::time::Env;
use usrbridge::core::upstream::Event;

use context::Attach;

fn default_lease() -> Lease {
    Lease::new(
        Ipv4Address::new([192, 168, 42, 1]),
        Ipv4Address::new([255, 255, 255, 0]),
        Ipv4Address::new([192, 168, 42, 1]),
    )
}

#[test]
fn default_lease_before_upstream() {
    context::run(|context| {
        context.bridge.start().unwrap().unwrap().join().unwrap();

        assert_eq!(context.downstream.lease(), Some(default_lease()));
        assert_eq!(context.downstream.service_state(), ServiceState::Running);

        let status = context.bridge.status();
        assert_eq!(status.target, Some(default_lease()));
        assert_eq!(status.outcome, Some(Outcome::Applied));
        assert!(!status.running);
    });
}

#[test]
fn start_twice_is_idempotent() {
    context::run(|context| {
        context.bridge.start().unwrap().unwrap().join().unwrap();
        context.bridge.start().unwrap().unwrap().join().unwrap();

        let stats = context.downstream.stats();
        assert_eq!(stats.services_started, 1);
        assert_eq!(stats.address_writes, 1);
        assert_eq!(context.downstream.lease(), Some(default_lease()));
    });
}

#[test]
fn start_proceeds_when_never_ready() {
    context::run_with(
        Config::default(),
        Attach::Unbound,
        Faults::default(),
        |context| {
            let start = context.env.now_instant();
            context.bridge.start().unwrap().unwrap().join().unwrap();

            assert!(context.env.now_instant() - start >= Duration::from_secs(2));
            assert_eq!(context.downstream.lease(), Some(default_lease()));
        },
    );
}

#[test]
fn link_attach_provisions_default_lease() {
    context::run_with(
        Config::default(),
        Attach::Detached,
        Faults::default(),
        |context| {
            context.downstream.attach(true);
            context.bridge.link_attached().unwrap().unwrap().join().unwrap();

            assert_eq!(context.bridge.downstream().generation(), 1);
            assert_eq!(context.downstream.lease(), Some(default_lease()));
            assert_eq!(context.bridge.status().outcome, Some(Outcome::Applied));
        },
    );
}

#[test]
fn link_attach_keeps_derived_lease() {
    context::run(|context| {
        let mut manager = context.bridge.link_manager(Box::new(SimStation::new()));
        manager.handle(Event::AddressAcquired {
            addr: Ipv4Address::new([10, 0, 0, 42]),
            netmask: Ipv4Address::new([255, 255, 255, 0]),
            gateway: Ipv4Address::new([10, 0, 0, 1]),
        });
        assert!(context.bridge.downstream().wait_idle(Duration::from_secs(10)));

        if let Some(handle) = context.bridge.link_attached().unwrap() {
            handle.join().unwrap();
        }

        let derived = Lease::new(
            Ipv4Address::new([10, 0, 0, 253]),
            Ipv4Address::new([255, 255, 255, 0]),
            Ipv4Address::new([10, 0, 0, 253]),
        );
        assert_eq!(context.downstream.lease(), Some(derived));
        assert_eq!(context.downstream.stats().services_started, 1);
    });
}

#[test]
fn lease_queued_during_startup_wins() {
    context::run_with(
        Config::default(),
        Attach::Unbound,
        Faults::default(),
        |context| {
            context.bridge.start().unwrap();

            let mut manager = context.bridge.link_manager(Box::new(SimStation::new()));
            manager.handle(Event::AddressAcquired {
                addr: Ipv4Address::new([172, 16, 4, 20]),
                netmask: Ipv4Address::new([255, 255, 255, 0]),
                gateway: Ipv4Address::new([172, 16, 4, 1]),
            });

            assert!(context.bridge.downstream().wait_idle(Duration::from_secs(10)));
            assert_eq!(
                context.downstream.lease().map(|lease| lease.addr),
                Some(Ipv4Address::new([172, 16, 4, 253]))
            );
            assert_eq!(context.downstream.service_state(), ServiceState::Running);
        },
    );
}

#[test]
fn link_attach_during_startup_keeps_queued_lease() {
    context::run_with(
        Config::default(),
        Attach::Unbound,
        Faults::default(),
        |context| {
            context.bridge.start().unwrap();

            let mut manager = context.bridge.link_manager(Box::new(SimStation::new()));
            manager.handle(Event::AddressAcquired {
                addr: Ipv4Address::new([172, 16, 4, 20]),
                netmask: Ipv4Address::new([255, 255, 255, 0]),
                gateway: Ipv4Address::new([172, 16, 4, 1]),
            });

            context.downstream.bind();
            if let Some(handle) = context.bridge.link_attached().unwrap() {
                handle.join().unwrap();
            }
            assert!(context.bridge.downstream().wait_idle(Duration::from_secs(10)));

            let derived = Lease::new(
                Ipv4Address::new([172, 16, 4, 253]),
                Ipv4Address::new([255, 255, 255, 0]),
                Ipv4Address::new([172, 16, 4, 253]),
            );
            assert_eq!(context.bridge.status().target, Some(derived));
            assert_eq!(context.downstream.lease(), Some(derived));
            assert_eq!(context.downstream.service_state(), ServiceState::Running);
        },
    );
}

#[test]
fn always_conflicting_stop_degrades() {
    let faults = Faults {
        stop_always_fails: true,
        ..Faults::default()
    };

    context::run_with(Config::default(), Attach::Ready, faults, |context| {
        context.bridge.start().unwrap().unwrap().join().unwrap();

        let stats = context.downstream.stats();
        assert_eq!(stats.stop_calls, context.bridge.config().stop_policy.max_attempts);
        assert_eq!(stats.set_calls, 0);
        assert_eq!(stats.direct_writes, 1);
        assert_eq!(context.downstream.lease(), Some(default_lease()));
        assert_eq!(context.bridge.status().outcome, Some(Outcome::Degraded));
    });
}

#[test]
fn restart_after_degraded_stays_degraded() {
    let faults = Faults {
        stop_always_fails: true,
        ..Faults::default()
    };

    context::run_with(Config::default(), Attach::Ready, faults, |context| {
        let policy = context.bridge.config().stop_policy;

        context.bridge.start().unwrap().unwrap().join().unwrap();
        context.bridge.start().unwrap().unwrap().join().unwrap();

        assert_eq!(context.bridge.status().outcome, Some(Outcome::Degraded));
        let stats = context.downstream.stats();
        assert_eq!(stats.stop_calls, policy.max_attempts);
        assert_eq!(stats.direct_writes, 1);
        assert_eq!(
            context.env.slept(),
            policy.backoff * (policy.max_attempts as u32 - 1)
        );
    });
}

#[test]
fn failed_start_is_reported_in_status() {
    let faults = Faults {
        start_always_fails: true,
        ..Faults::default()
    };

    context::run_with(Config::default(), Attach::Ready, faults, |context| {
        context.bridge.start().unwrap().unwrap().join().unwrap();

        let status = context.bridge.status();
        assert_eq!(status.outcome, Some(Outcome::Failed));
        assert!(!status.running);
        assert_eq!(context.downstream.lease(), Some(default_lease()));
    });
}

#[test]
fn mac_address() {
    context::run(|context| {
        assert_eq!(
            context.bridge.mac_address(),
            [0x02, 0x00, 0x11, 0x22, 0x33, 0x44]
        );
    });
}
