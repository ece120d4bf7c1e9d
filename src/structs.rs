use serde::Serialize;
use std::net::Ipv4Addr;

/// NetFlow protocol version written in every header
pub const NETFLOW_VERSION: u16 = 5;
/// Size of the PDU header on the wire
pub const HEADER_SIZE: usize = 24;
/// Size of a flow record on the wire
pub const RECORD_SIZE: usize = 48;
/// Largest UDP payload sent to a collector
pub const MAX_PDU_SIZE: usize = 1480;
/// Largest number of records that fit in `MAX_PDU_SIZE`
pub const MAX_RECORDS: usize = (MAX_PDU_SIZE - HEADER_SIZE) / RECORD_SIZE;

/// Size in bytes of a PDU carrying `record_count` records
pub const fn pdu_size(record_count: usize) -> usize {
    HEADER_SIZE + RECORD_SIZE * record_count
}

/// NetFlow v5 header, with host-order values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct NetflowHeader {
    pub version: u16,
    pub count: u16,
    pub sys_uptime: u32,
    pub unix_secs: u32,
    pub unix_nsecs: u32,
    pub flow_sequence: u32,
}

impl NetflowHeader {
    /// Serialize the header into the first `HEADER_SIZE` bytes of `buf`.
    /// The engine type, engine id and sampling interval are reserved and zeroed.
    ///
    /// Panics if `buf` is shorter than `HEADER_SIZE`.
    pub fn write_to(&self, buf: &mut [u8]) {
        buf[0..2].copy_from_slice(&self.version.to_be_bytes());
        buf[2..4].copy_from_slice(&self.count.to_be_bytes());
        buf[4..8].copy_from_slice(&self.sys_uptime.to_be_bytes());
        buf[8..12].copy_from_slice(&self.unix_secs.to_be_bytes());
        buf[12..16].copy_from_slice(&self.unix_nsecs.to_be_bytes());
        buf[16..20].copy_from_slice(&self.flow_sequence.to_be_bytes());
        buf[20..HEADER_SIZE].fill(0);
    }

    /// Decode a header from the start of `buf`
    pub fn read_from(buf: &[u8]) -> Option<Self> {
        let buf = buf.get(..HEADER_SIZE)?;
        Some(NetflowHeader {
            version: be_u16(buf, 0),
            count: be_u16(buf, 2),
            sys_uptime: be_u32(buf, 4),
            unix_secs: be_u32(buf, 8),
            unix_nsecs: be_u32(buf, 12),
            flow_sequence: be_u32(buf, 16),
        })
    }
}

/// NetFlow v5 flow record, with host-order values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NetflowRecord {
    pub src_addr: Ipv4Addr,
    pub dst_addr: Ipv4Addr,
    pub next_hop: Ipv4Addr,
    pub input: u16,
    pub output: u16,
    pub d_pkts: u32,
    pub d_octets: u32,
    pub first: u32,
    pub last: u32,
    pub src_port: u16,
    pub dst_port: u16,
    pub pad: u8,
    pub tcp_flags: u8,
    pub prot: u8,
    pub tos: u8,
    pub src_as: u16,
    pub dst_as: u16,
    pub src_mask: u8,
    pub dst_mask: u8,
    pub drops: u16,
}

impl Default for NetflowRecord {
    fn default() -> Self {
        NetflowRecord {
            src_addr: Ipv4Addr::UNSPECIFIED,
            dst_addr: Ipv4Addr::UNSPECIFIED,
            next_hop: Ipv4Addr::UNSPECIFIED,
            input: 0,
            output: 0,
            d_pkts: 0,
            d_octets: 0,
            first: 0,
            last: 0,
            src_port: 0,
            dst_port: 0,
            pad: 0,
            tcp_flags: 0,
            prot: 0,
            tos: 0,
            src_as: 0,
            dst_as: 0,
            src_mask: 0,
            dst_mask: 0,
            drops: 0,
        }
    }
}

impl NetflowRecord {
    /// Serialize the record into the first `RECORD_SIZE` bytes of `buf`.
    ///
    /// Panics if `buf` is shorter than `RECORD_SIZE`.
    pub fn write_to(&self, buf: &mut [u8]) {
        // Ipv4Addr octets are already in network order
        buf[0..4].copy_from_slice(&self.src_addr.octets());
        buf[4..8].copy_from_slice(&self.dst_addr.octets());
        buf[8..12].copy_from_slice(&self.next_hop.octets());
        buf[12..14].copy_from_slice(&self.input.to_be_bytes());
        buf[14..16].copy_from_slice(&self.output.to_be_bytes());
        buf[16..20].copy_from_slice(&self.d_pkts.to_be_bytes());
        buf[20..24].copy_from_slice(&self.d_octets.to_be_bytes());
        buf[24..28].copy_from_slice(&self.first.to_be_bytes());
        buf[28..32].copy_from_slice(&self.last.to_be_bytes());
        buf[32..34].copy_from_slice(&self.src_port.to_be_bytes());
        buf[34..36].copy_from_slice(&self.dst_port.to_be_bytes());
        buf[36] = self.pad;
        buf[37] = self.tcp_flags;
        buf[38] = self.prot;
        buf[39] = self.tos;
        buf[40..42].copy_from_slice(&self.src_as.to_be_bytes());
        buf[42..44].copy_from_slice(&self.dst_as.to_be_bytes());
        buf[44] = self.src_mask;
        buf[45] = self.dst_mask;
        buf[46..48].copy_from_slice(&self.drops.to_be_bytes());
    }

    /// Decode a record from the start of `buf`
    pub fn read_from(buf: &[u8]) -> Option<Self> {
        let buf = buf.get(..RECORD_SIZE)?;
        Some(NetflowRecord {
            src_addr: Ipv4Addr::from(be_u32(buf, 0)),
            dst_addr: Ipv4Addr::from(be_u32(buf, 4)),
            next_hop: Ipv4Addr::from(be_u32(buf, 8)),
            input: be_u16(buf, 12),
            output: be_u16(buf, 14),
            d_pkts: be_u32(buf, 16),
            d_octets: be_u32(buf, 20),
            first: be_u32(buf, 24),
            last: be_u32(buf, 28),
            src_port: be_u16(buf, 32),
            dst_port: be_u16(buf, 34),
            pad: buf[36],
            tcp_flags: buf[37],
            prot: buf[38],
            tos: buf[39],
            src_as: be_u16(buf, 40),
            dst_as: be_u16(buf, 42),
            src_mask: buf[44],
            dst_mask: buf[45],
            drops: be_u16(buf, 46),
        })
    }
}

/// A decoded PDU, as printed by the `inspect` command
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Pdu {
    pub header: NetflowHeader,
    pub records: Vec<NetflowRecord>,
}

/// Decode a whole PDU. Returns `None` if the payload length does not match
/// the record count announced in the header.
pub fn decode_pdu(buf: &[u8]) -> Option<Pdu> {
    let header = NetflowHeader::read_from(buf)?;
    if buf.len() != pdu_size(header.count as usize) {
        return None;
    }
    let records = buf[HEADER_SIZE..]
        .chunks_exact(RECORD_SIZE)
        .filter_map(NetflowRecord::read_from)
        .collect();
    Some(Pdu { header, records })
}

fn be_u16(buf: &[u8], offset: usize) -> u16 {
    u16::from_be_bytes([buf[offset], buf[offset + 1]])
}

fn be_u32(buf: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes([
        buf[offset],
        buf[offset + 1],
        buf[offset + 2],
        buf[offset + 3],
    ])
}
