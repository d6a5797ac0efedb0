#![allow(dead_code)]

use rand::{
    self,
    Rng,
};

use usrbridge::core::bridge::Bridge;
use usrbridge::core::config::Config;
use usrbridge::core::repr::EthernetAddress;
use usrbridge::core::sim::{
    Faults,
    SimNetif,
    SimTransport,
};
use usrbridge::core::time::MockEnv;

/// A bridge over simulated interfaces, along with handles on each of them.
pub struct Context {
    pub bridge: Bridge<MockEnv>,
    pub env: MockEnv,
    pub upstream: SimNetif,
    pub downstream: SimNetif,
    pub transport: SimTransport,
}

/// Downstream interface state when a test starts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Attach {
    Detached,
    Unbound,
    Ready,
}

/// Runs f against a bridge with the default configuration and a ready
/// downstream interface.
pub fn run<F, R>(f: F) -> R
where
    F: FnOnce(&mut Context) -> R,
{
    run_with(Config::default(), Attach::Ready, Faults::default(), f)
}

/// Runs f against a bridge built from config, with the downstream interface
/// in the attach state and misbehaving according to faults.
pub fn run_with<F, R>(config: Config, attach: Attach, faults: Faults, f: F) -> R
where
    F: FnOnce(&mut Context) -> R,
{
    let env = MockEnv::new();
    let upstream = SimNetif::new("us", EthernetAddress::new([0x02, 0, 0, 0, 0, 0x01]));
    let downstream = SimNetif::new("ds", config.mac);
    let transport = SimTransport::new();

    upstream.attach(true);
    match attach {
        Attach::Detached => {}
        Attach::Unbound => downstream.attach(false),
        Attach::Ready => downstream.attach(true),
    }
    downstream.set_faults(faults);

    let bridge = Bridge::new(
        config,
        env.clone(),
        Box::new(upstream.clone()),
        Box::new(downstream.clone()),
        Box::new(transport.clone()),
    ).unwrap();

    f(&mut Context {
        bridge,
        env,
        upstream,
        downstream,
        transport,
    })
}

/// Creates a frame of len random bytes.
pub fn random_frame(len: usize) -> Vec<u8> {
    let mut rng = rand::thread_rng();
    (0 .. len).map(|_| rng.gen::<u8>()).collect()
}
