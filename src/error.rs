use std::error::Error as StdError;
use std::io;
use std::net::{AddrParseError, Ipv4Addr, SocketAddrV4};

/// Errors raised while configuring, encoding or sending NetFlow PDUs
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("cannot parse \"{addr}\" into an IPv4 address")]
    AddressFormat {
        addr: String,
        #[source]
        source: AddrParseError,
    },
    #[error("{0} cannot be used as a flow address")]
    UnusableAddress(Ipv4Addr),
    #[error("the address pool is empty")]
    EmptyAddressPool,
    #[error("cannot read the configuration file {path}")]
    ConfigFile {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("ill-formed configuration file")]
    ConfigFormat(#[from] toml::de::Error),
    #[error("invalid record count {0}: a PDU holds between 1 and 30 records")]
    InvalidRecordCount(usize),
    #[error("a PDU of {required} bytes does not fit in {capacity} bytes")]
    CapacityExceeded { required: usize, capacity: usize },
    #[error("cannot bind the UDP socket to {addr}")]
    TransportUnavailable {
        addr: SocketAddrV4,
        #[source]
        source: io::Error,
    },
    #[error("only {sent} of {expected} bytes were sent")]
    SendFailure {
        sent: usize,
        expected: usize,
        #[source]
        source: Option<io::Error>,
    },
    #[error("cannot serialize the PDU")]
    Output(#[from] serde_json::Error),
}

impl Error {
    /// The message of the error followed by the messages of its sources
    pub fn report(&self) -> String {
        let mut message = self.to_string();
        let mut source = StdError::source(self);
        while let Some(s) = source {
            message.push_str(&format!(": {s}"));
            source = s.source();
        }
        message
    }
}
