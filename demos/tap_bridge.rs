#[macro_use]
extern crate clap;
extern crate env_logger;
extern crate get_if_addrs;
extern crate usrbridge;

use std::net::IpAddr as StdIpAddr;
use std::sync::mpsc;
use std::thread;

use usrbridge::core::bridge::Bridge;
use usrbridge::core::config::{
    Config,
    DEFAULT_NETMASK,
};
use usrbridge::core::repr::{
    EthernetAddress,
    EthernetFrame,
    Ipv4Address,
};
use usrbridge::core::sim::{
    SimNetif,
    SimStation,
};
use usrbridge::core::time::SystemEnv;
use usrbridge::core::upstream::Event;
use usrbridge::linux::Tap;

/// Gets the IPv4 address of a host interface.
fn ifr_addr(ifr_name: &str) -> Ipv4Address {
    for interface in get_if_addrs::get_if_addrs().unwrap() {
        if interface.name == ifr_name {
            if let StdIpAddr::V4(ipv4_addr) = interface.ip() {
                return Ipv4Address::from(ipv4_addr);
            }
        }
    }

    panic!("IPv4 address for '{}' not found!", ifr_name);
}

/// Bridges frames read from a Linux TAP into a simulated stack. The address
/// of a host interface stands in for the address acquired upstream.
fn main() {
    env_logger::init();

    let matches = clap_app!(tap_bridge =>
        (@arg TAP: --tap +takes_value "TAP interface the host side is attached to (default tap0)")
        (@arg UPSTREAM: --upstream +takes_value "Host interface whose IPv4 address is used as the upstream address")
    ).get_matches();

    let tap_name = matches.value_of("TAP").unwrap_or("tap0");
    let tap = Tap::new(tap_name).expect("Opening TAP");
    let mut reader = tap.try_clone().expect("Cloning TAP");
    let mtu = tap.max_transmission_unit();

    let config = Config::default();
    let upstream = SimNetif::new("us", EthernetAddress::new([0x02, 0, 0, 0, 0, 0x01]));
    let downstream = SimNetif::new("ds", config.mac);
    upstream.attach(true);
    downstream.attach(false);

    println!(
        "Bridge: (TAP = {}, MTU = {}, MAC = {})",
        tap_name, mtu, config.mac,
    );

    let bridge = Bridge::new(
        config.clone(),
        SystemEnv::new(),
        Box::new(upstream),
        Box::new(downstream.clone()),
        Box::new(tap),
    ).expect("Starting bridge");
    bridge.start().expect("Provisioning default lease");

    // The TAP is up as soon as it's open.
    downstream.bind();
    bridge.link_attached().expect("Provisioning on attach");

    let (events, rx) = mpsc::channel();
    let mut manager = bridge.link_manager(Box::new(SimStation::new()));
    thread::spawn(move || manager.run(rx));

    events.send(Event::Start).unwrap();
    if let Some(ifr_name) = matches.value_of("UPSTREAM") {
        let addr = ifr_addr(ifr_name);
        let octets = addr.octets();
        events
            .send(Event::AddressAcquired {
                addr,
                netmask: *DEFAULT_NETMASK,
                gateway: Ipv4Address::new([octets[0], octets[1], octets[2], 1]),
            })
            .unwrap();
    }

    // Whole frames up to the TAP's MTU, so oversized ones reach the relay
    // and are rejected there instead of being cut short by the read.
    let mut buffer = vec![0; mtu + EthernetFrame::<&[u8]>::HEADER_LEN];
    loop {
        let len = reader.recv(&mut buffer).expect("Reading TAP");
        let frame = &buffer[.. len];

        let accepted = bridge.receive(frame);
        match EthernetFrame::try_new(frame) {
            Ok(frame) => println!("{} accepted={}", frame, accepted),
            Err(_) => println!("Runt frame of {} bytes, accepted={}", len, accepted),
        }

        let counters = bridge.counters();
        if (counters.rx_frames + counters.rx_dropped) % 100 == 0 {
            println!("{:?} {:?}", bridge.status(), counters);
        }
    }
}
