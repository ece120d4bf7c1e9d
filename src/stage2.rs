use crate::error::Error;
use crate::stage1::FlowSynthesizer;
use crate::structs::*;

use rand_core::*;
use rand_distr::{Distribution, Uniform};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

const NANOS_PER_SEC: u32 = 1_000_000_000;

/// Stage 2: assemble a NetFlow v5 PDU in a buffer provided by the caller
#[derive(Debug, Clone)]
pub struct PduEncoder {
    synthesizer: FlowSynthesizer,
    start_ts: Duration,
    nsecs_distrib: Uniform<u32>,
}

impl PduEncoder {
    /// `start_ts` is the start of the generator, as a duration since the Unix epoch. It is
    /// the origin of the uptime written in the PDUs.
    pub fn new(synthesizer: FlowSynthesizer, start_ts: Duration) -> Self {
        PduEncoder {
            synthesizer,
            start_ts,
            nsecs_distrib: Uniform::new(0, NANOS_PER_SEC),
        }
    }

    /// Encode a PDU of `record_count` records at the current time
    pub fn encode(
        &self,
        buffer: &mut [u8],
        record_count: usize,
        rng: &mut impl RngCore,
    ) -> Result<usize, Error> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        self.encode_at(buffer, record_count, now, rng)
    }

    /// Encode a PDU of `record_count` records as if the current time were `now`, and return
    /// the number of bytes written, i.e. the size of the datagram to send.
    ///
    /// The usable capacity is the size of `buffer`, capped to `MAX_PDU_SIZE`. Nothing is
    /// written if the PDU does not fit.
    pub fn encode_at(
        &self,
        buffer: &mut [u8],
        record_count: usize,
        now: Duration,
        rng: &mut impl RngCore,
    ) -> Result<usize, Error> {
        if record_count == 0 {
            return Err(Error::InvalidRecordCount(record_count));
        }
        let capacity = buffer.len().min(MAX_PDU_SIZE);
        let required = pdu_size(record_count);
        if required > capacity {
            return Err(Error::CapacityExceeded { required, capacity });
        }

        // one uptime for the whole PDU so that all the records share the same time reference
        let sys_uptime = now.saturating_sub(self.start_ts).as_millis() as u32;

        for (i, chunk) in buffer[HEADER_SIZE..required]
            .chunks_exact_mut(RECORD_SIZE)
            .enumerate()
        {
            let record = self.synthesizer.synthesize_record(rng, sys_uptime);
            log::trace!("Record {i}: {:?}", record);
            record.write_to(chunk);
        }

        let header = NetflowHeader {
            version: NETFLOW_VERSION,
            count: record_count as u16,
            sys_uptime,
            unix_secs: now.as_secs() as u32,
            // not the actual clock, to check the collector tolerance
            unix_nsecs: self.nsecs_distrib.sample(rng),
            flow_sequence: 0,
        };
        header.write_to(&mut buffer[..HEADER_SIZE]);

        Ok(required)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage1::{TCP, UDP};
    use hex_literal::hex;
    use rand_pcg::Pcg32;
    use std::net::Ipv4Addr;

    const T: Duration = Duration::from_secs(1_700_000_000);

    fn encoder() -> PduEncoder {
        let s1 = FlowSynthesizer::new(vec![
            Ipv4Addr::new(127, 0, 0, 1),
            Ipv4Addr::new(192, 168, 1, 100),
            Ipv4Addr::new(192, 168, 1, 101),
            Ipv4Addr::new(192, 168, 1, 102),
        ])
        .unwrap();
        PduEncoder::new(s1, T)
    }

    #[test]
    fn test_size_for_all_counts() {
        let s2 = encoder();
        let mut rng = Pcg32::seed_from_u64(5);
        let mut buffer = [0u8; MAX_PDU_SIZE];
        for count in 1..=MAX_RECORDS {
            let len = s2
                .encode_at(&mut buffer, count, T + Duration::from_secs(90), &mut rng)
                .unwrap();
            assert_eq!(len, 24 + 48 * count);
            let pdu = decode_pdu(&buffer[..len]).unwrap();
            assert_eq!(pdu.header.version, 5);
            assert_eq!(pdu.header.count as usize, count);
            assert_eq!(pdu.records.len(), count);
            assert_eq!(pdu.header.flow_sequence, 0);
            assert!(pdu.header.unix_nsecs < NANOS_PER_SEC);
            for r in pdu.records {
                assert!(r.first <= r.last);
                if r.prot != TCP {
                    assert_eq!(r.prot, UDP);
                    assert_eq!(r.tcp_flags, 0);
                }
                if r.d_pkts == 0 {
                    assert_eq!(r.d_octets, 0);
                } else {
                    assert_eq!(r.d_octets % r.d_pkts, 0);
                    assert!(r.d_octets / r.d_pkts < 300);
                }
            }
        }
    }

    #[test]
    fn test_capacity() {
        let s2 = encoder();
        let mut rng = Pcg32::seed_from_u64(5);
        let mut buffer = [0u8; MAX_PDU_SIZE];
        assert_eq!(s2.encode_at(&mut buffer, 30, T, &mut rng).unwrap(), 1464);
        assert!(matches!(
            s2.encode_at(&mut buffer, 31, T, &mut rng),
            Err(Error::CapacityExceeded {
                required: 1512,
                capacity: 1480
            })
        ));
        assert!(matches!(
            s2.encode_at(&mut buffer, 0, T, &mut rng),
            Err(Error::InvalidRecordCount(0))
        ));
        // a larger buffer does not raise the datagram limit
        let mut large = [0u8; 4096];
        assert!(matches!(
            s2.encode_at(&mut large, 31, T, &mut rng),
            Err(Error::CapacityExceeded { .. })
        ));
        // a small buffer is a hard limit too
        let mut small = [0u8; 100];
        assert_eq!(s2.encode_at(&mut small, 1, T, &mut rng).unwrap(), 72);
        assert!(matches!(
            s2.encode_at(&mut small, 2, T, &mut rng),
            Err(Error::CapacityExceeded {
                required: 120,
                capacity: 100
            })
        ));
    }

    #[test]
    fn test_nothing_written_on_error() {
        let s2 = encoder();
        let mut rng = Pcg32::seed_from_u64(5);
        let mut buffer = [0xaau8; 100];
        assert!(s2.encode_at(&mut buffer, 2, T, &mut rng).is_err());
        assert!(buffer.iter().all(|b| *b == 0xaa));
    }

    #[test]
    fn test_uptime_five_seconds() {
        let s2 = encoder();
        let mut rng = Pcg32::seed_from_u64(5);
        let mut buffer = [0u8; MAX_PDU_SIZE];
        let now = T + Duration::from_secs(5);
        let len = s2.encode_at(&mut buffer, 1, now, &mut rng).unwrap();
        assert_eq!(len, 72);
        let pdu = decode_pdu(&buffer[..len]).unwrap();
        assert_eq!(pdu.header.sys_uptime, 5000);
        assert_eq!(pdu.header.unix_secs, 1_700_000_005);
        // before the uptime origin, the wire value is a negative 32-bit integer
        let first = pdu.records[0].first as i32;
        assert!((5000 - 60_000..=5000 - 1000).contains(&first));
    }

    #[test]
    fn test_clock_before_start() {
        let s2 = encoder();
        let mut rng = Pcg32::seed_from_u64(5);
        let mut buffer = [0u8; MAX_PDU_SIZE];
        let len = s2
            .encode_at(&mut buffer, 1, T - Duration::from_secs(10), &mut rng)
            .unwrap();
        assert_eq!(decode_pdu(&buffer[..len]).unwrap().header.sys_uptime, 0);
    }

    #[test]
    fn test_known_stream() {
        // records first, then the header nanoseconds, all from the same stream
        let s2 = encoder();
        let mut rng = Pcg32::seed_from_u64(5);
        let mut buffer = [0u8; MAX_PDU_SIZE];
        let now = T + Duration::from_secs(5);
        let len = s2.encode_at(&mut buffer, 2, now, &mut rng).unwrap();
        assert_eq!(len, 120);
        assert_eq!(
            buffer[..HEADER_SIZE],
            hex!("00050002000013886553f1050cbf3f090000000000000000")
        );
        assert_eq!(
            buffer[HEADER_SIZE..72],
            hex!(
                "c0a801647f000001000000000000000000010591004b9beaffffd508fffff830"
                "a2dd90cc000011000000000000000000"
            )
        );
        assert_eq!(
            buffer[72..len],
            hex!(
                "c0a80166c0a80165000000000000000000016e6f019dab4fffff7360ffffbd98"
                "aa2da8a600c706000000000000000000"
            )
        );
        let pdu = decode_pdu(&buffer[..len]).unwrap();
        assert_eq!(pdu.header.unix_nsecs, 213_860_105);
        assert_eq!(pdu.records[0].first as i32, -11_000);
        assert_eq!(pdu.records[0].prot, UDP);
        assert_eq!(pdu.records[1].prot, TCP);
        assert_eq!(pdu.records[1].tcp_flags, 199);
    }

    #[test]
    fn test_deterministic() {
        let s2 = encoder();
        let mut rng1 = Pcg32::seed_from_u64(5);
        let mut rng2 = Pcg32::seed_from_u64(5);
        let mut buffer1 = [0u8; MAX_PDU_SIZE];
        let mut buffer2 = [0u8; MAX_PDU_SIZE];
        for i in 1..=20 {
            let now = T + Duration::from_millis(1234 * i as u64);
            let len1 = s2.encode_at(&mut buffer1, i, now, &mut rng1).unwrap();
            let len2 = s2.encode_at(&mut buffer2, i, now, &mut rng2).unwrap();
            assert_eq!(buffer1[..len1], buffer2[..len2]);
        }
        // another seed gives another stream
        let mut rng3 = Pcg32::seed_from_u64(6);
        let len3 = s2.encode_at(&mut buffer2, 20, T, &mut rng3).unwrap();
        let len1 = s2.encode_at(&mut buffer1, 20, T, &mut rng1).unwrap();
        assert_ne!(buffer1[..len1], buffer2[..len3]);
    }
}
