use crate::error::Error;
use crate::stage0::PduScheduler;
use crate::stage2::PduEncoder;
use crate::structs::MAX_PDU_SIZE;
use crate::ui::Stats;

use rand_core::*;
use std::net::{SocketAddrV4, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

/// Granularity of the pause between two PDUs, so that a stop request is honored quickly
const SLEEP_STEP: Duration = Duration::from_millis(100);

/// A trait for the destinations of the PDUs
pub trait Exporter {
    /// Send one PDU as a single datagram and return the number of bytes sent
    fn send(&self, pdu: &[u8]) -> Result<usize, Error>;
}

/// Stage 3: send the PDUs to a collector over UDP.
///
/// The socket is bound once and kept until the exporter is dropped.
#[derive(Debug)]
pub struct UdpExporter {
    socket: UdpSocket,
    collector: SocketAddrV4,
}

impl UdpExporter {
    pub fn new(bind: SocketAddrV4, collector: SocketAddrV4) -> Result<Self, Error> {
        let socket = UdpSocket::bind(bind)
            .map_err(|source| Error::TransportUnavailable { addr: bind, source })?;
        log::info!(
            "Exporting from {} to collector {collector}",
            socket.local_addr().map_or(bind.to_string(), |a| a.to_string())
        );
        Ok(UdpExporter { socket, collector })
    }

    pub fn get_collector(&self) -> SocketAddrV4 {
        self.collector
    }
}

impl Exporter for UdpExporter {
    fn send(&self, pdu: &[u8]) -> Result<usize, Error> {
        match self.socket.send_to(pdu, self.collector) {
            Ok(sent) if sent == pdu.len() => Ok(sent),
            Ok(sent) => Err(Error::SendFailure {
                sent,
                expected: pdu.len(),
                source: None,
            }),
            Err(e) => Err(Error::SendFailure {
                sent: 0,
                expected: pdu.len(),
                source: Some(e),
            }),
        }
    }
}

fn sleep_while_running(pause: Duration, running: &AtomicBool) {
    let mut remaining = pause;
    while !remaining.is_zero() && running.load(Ordering::Relaxed) {
        let step = remaining.min(SLEEP_STEP);
        thread::sleep(step);
        remaining -= step;
    }
}

/// Runs the generation loop until `running` is cleared or the target of `stats` is reached.
///
/// Each iteration draws a flow count, encodes a PDU in a buffer reused for the whole run,
/// sends it and waits for a random pause. A failed send is logged and counted but does not
/// stop the generation. Encoding errors are returned.
pub fn run(
    rng: &mut impl RngCore,
    s0: &PduScheduler,
    s2: &PduEncoder,
    exporter: &impl Exporter,
    stats: &Stats,
    running: &AtomicBool,
) -> Result<(), Error> {
    let mut buffer = [0u8; MAX_PDU_SIZE];
    while running.load(Ordering::Relaxed) && !stats.should_stop() {
        let flow_count = s0.next_flow_count(rng);
        let len = s2.encode(&mut buffer, flow_count, rng)?;
        match exporter.send(&buffer[..len]) {
            Ok(sent) => {
                log::debug!("PDU with {flow_count} flows sent ({sent} bytes)");
                stats.increase(flow_count, sent);
            }
            Err(e) => {
                log::warn!("{}", e.report());
                stats.increase_failed();
            }
        }
        let pause = s0.next_pause(rng);
        if !stats.should_stop() {
            sleep_while_running(pause, running);
        }
    }
    Ok(())
}
