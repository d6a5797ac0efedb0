#[macro_use]
extern crate clap;
extern crate env_logger;
extern crate rand;
extern crate usrbridge;

use std::time::Duration;

use rand::Rng;

use usrbridge::core::bridge::Bridge;
use usrbridge::core::config::Config;
use usrbridge::core::repr::{
    EthernetAddress,
    Ipv4Address,
};
use usrbridge::core::sim::{
    Faults,
    SimNetif,
    SimStation,
    SimTransport,
};
use usrbridge::core::storage::PacketBuf;
use usrbridge::core::time::SystemEnv;
use usrbridge::core::upstream::Event;

/// Runs the bridge against simulated interfaces: startup, link attach, a
/// flaky upstream and some traffic in both directions.
fn main() {
    env_logger::init();

    let matches = clap_app!(sim_bridge =>
        (@arg CONFLICT: --conflict "Make every address service stop conflict")
        (@arg FRAMES: --frames +takes_value "Frames to relay in each direction (default 16)")
    ).get_matches();

    let frames = matches
        .value_of("FRAMES")
        .unwrap_or("16")
        .parse::<usize>()
        .expect("Bad frame count!");

    let config = Config::default();
    let upstream = SimNetif::new("us", EthernetAddress::new([0x02, 0, 0, 0, 0, 0x01]));
    let downstream = SimNetif::new("ds", config.mac);
    let transport = SimTransport::new();
    upstream.attach(true);
    downstream.attach(false);

    if matches.is_present("CONFLICT") {
        downstream.set_faults(Faults {
            stop_always_fails: true,
            ..Faults::default()
        });
    }

    let bridge = Bridge::new(
        config.clone(),
        SystemEnv::new(),
        Box::new(upstream),
        Box::new(downstream.clone()),
        Box::new(transport.clone()),
    ).expect("Starting bridge");

    bridge.start().unwrap();

    // The downstream binds a moment after the host plugs in.
    std::thread::sleep(Duration::from_millis(300));
    downstream.bind();
    bridge.link_attached().unwrap();
    bridge.downstream().wait_idle(Duration::from_secs(30));
    println!("Default lease: {:?}", bridge.status());

    let mut manager = bridge.link_manager(Box::new(SimStation::new()));
    manager.handle(Event::Start);
    manager.handle(Event::Disconnected(201));
    manager.handle(Event::AddressAcquired {
        addr: Ipv4Address::new([10, 0, 0, 42]),
        netmask: Ipv4Address::new([255, 255, 255, 0]),
        gateway: Ipv4Address::new([10, 0, 0, 1]),
    });
    bridge.downstream().wait_idle(Duration::from_secs(30));
    println!(
        "Derived lease: {:?} after {} connection attempts",
        bridge.status(),
        manager.connect_attempts()
    );

    let mut rng = rand::thread_rng();
    for _ in 0 .. frames {
        let len = rng.gen_range(14, config.max_frame_len + 1);
        let bytes: Vec<u8> = (0 .. len).map(|_| rng.gen()).collect();
        bridge.receive(&bytes);
        bridge.transmit(PacketBuf::from_vec(bytes));
    }
    bridge.flush().unwrap();

    println!(
        "Relayed: {:?}, stack received {} frames, host received {} frames, pool {:?}",
        bridge.counters(),
        downstream.received().len(),
        transport.sent().len(),
        bridge.relay().pool().stats(),
    );
}
