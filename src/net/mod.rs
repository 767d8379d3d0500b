//! Packet-level wire formats and per-protocol state: Ethernet, ARP,
//! IPv4, route table, ICMP.

pub mod arp;
pub mod ethernet;
pub mod icmp;
pub mod ipv4;
pub mod route;
pub mod udp;
