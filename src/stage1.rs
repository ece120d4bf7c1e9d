use crate::error::Error;
use crate::structs::*;

use pnet_packet::ip::IpNextHeaderProtocols;
use rand_core::*;
use rand_distr::{Distribution, Standard, Uniform};
use std::net::Ipv4Addr;

const MAX_PACKETS: u32 = 100_000;
const MAX_BYTES_PER_PACKET: u32 = 300;
const MIN_FLOW_DURATION_SECS: u32 = 1;
const MAX_FLOW_DURATION_SECS: u32 = 60;
const MAX_TCP_FLAGS: u8 = 255;

pub const TCP: u8 = IpNextHeaderProtocols::Tcp.0;
pub const UDP: u8 = IpNextHeaderProtocols::Udp.0;

/// Stage 1: generate the statistics of one flow.
///
/// Every value is drawn from the RNG given by the caller, so the synthesizer itself has no
/// mutable state.
#[derive(Debug, Clone)]
pub struct FlowSynthesizer {
    addresses: Vec<Ipv4Addr>,
    address_distrib: Uniform<usize>,
    packets_distrib: Uniform<u32>,
    bytes_per_packet_distrib: Uniform<u32>,
    start_offset_distrib: Uniform<u32>,
    duration_distrib: Uniform<u32>,
    tcp_flags_distrib: Uniform<u8>,
}

impl FlowSynthesizer {
    /// Create a synthesizer drawing addresses from `addresses`. The pool must not be empty
    /// nor contain 0.0.0.0.
    pub fn new(addresses: Vec<Ipv4Addr>) -> Result<Self, Error> {
        if addresses.is_empty() {
            return Err(Error::EmptyAddressPool);
        }
        if let Some(ip) = addresses.iter().find(|ip| ip.is_unspecified()) {
            return Err(Error::UnusableAddress(*ip));
        }
        Ok(FlowSynthesizer {
            address_distrib: Uniform::new(0, addresses.len()),
            addresses,
            packets_distrib: Uniform::new(0, MAX_PACKETS),
            bytes_per_packet_distrib: Uniform::new(0, MAX_BYTES_PER_PACKET),
            start_offset_distrib: Uniform::new(MIN_FLOW_DURATION_SECS, MAX_FLOW_DURATION_SECS),
            duration_distrib: Uniform::new(0, MAX_FLOW_DURATION_SECS),
            tcp_flags_distrib: Uniform::new(0, MAX_TCP_FLAGS),
        })
    }

    fn random_address(&self, rng: &mut impl RngCore) -> Ipv4Addr {
        self.addresses[self.address_distrib.sample(rng)]
    }

    /// Generate one flow record relative to the exporter uptime `uptime_millis`.
    ///
    /// The flow starts between 1 and 59 seconds before the uptime and lasts less than a
    /// minute. Right after startup the start may precede the uptime origin: `first` then
    /// wraps around like a negative 32-bit value.
    pub fn synthesize_record(&self, rng: &mut impl RngCore, uptime_millis: u32) -> NetflowRecord {
        let src_addr = self.random_address(rng);
        let dst_addr = self.random_address(rng);

        let d_pkts = self.packets_distrib.sample(rng);
        let d_octets = d_pkts * self.bytes_per_packet_distrib.sample(rng);

        let first =
            uptime_millis.wrapping_sub(self.start_offset_distrib.sample(rng) * 1000);
        let last = first.wrapping_add(self.duration_distrib.sample(rng) * 1000);

        let src_port: u16 = Standard.sample(rng);
        let dst_port: u16 = Standard.sample(rng);

        let is_tcp: bool = Standard.sample(rng);
        let (prot, tcp_flags) = if is_tcp {
            (TCP, self.tcp_flags_distrib.sample(rng))
        } else {
            (UDP, 0)
        };

        NetflowRecord {
            src_addr,
            dst_addr,
            d_pkts,
            d_octets,
            first,
            last,
            src_port,
            dst_port,
            tcp_flags,
            prot,
            ..Default::default()
        }
    }
}
