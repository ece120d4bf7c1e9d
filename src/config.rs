use crate::error::Error;
use crate::structs::MAX_RECORDS;
use serde::Deserialize;
use std::net::{Ipv4Addr, SocketAddrV4};

pub const DEFAULT_SEED: u64 = 5;
pub const DEFAULT_SOURCE_PORT: u16 = 10000;
pub const DEFAULT_COLLECTOR_PORT: u16 = 2055;
pub const DEFAULT_MAX_PAUSE_SECS: u64 = 3;

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
struct Interface {
    ip: String,
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
struct CollectorToml {
    ip: Option<String>,
    port: Option<u16>,
    source_port: Option<u16>,
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
struct ConfigToml {
    seed: Option<u64>,
    max_flows_per_pdu: Option<usize>,
    max_pause_secs: Option<u64>,
    collector: Option<CollectorToml>,
    #[serde(default)]
    addresses: Vec<Interface>,
}

/// Validated generator configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub seed: u64,
    pub max_flows_per_pdu: usize,
    pub max_pause_secs: u64,
    pub collector: SocketAddrV4,
    pub source_port: u16,
    /// Pool the flow addresses are drawn from
    pub addresses: Vec<Ipv4Addr>,
}

impl Config {
    /// Local address the exporter socket is bound to
    pub fn bind_addr(&self) -> SocketAddrV4 {
        SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, self.source_port)
    }

    pub fn set_max_flows_per_pdu(&mut self, max_flows: usize) -> Result<(), Error> {
        if max_flows == 0 || max_flows > MAX_RECORDS {
            return Err(Error::InvalidRecordCount(max_flows));
        }
        self.max_flows_per_pdu = max_flows;
        Ok(())
    }
}

/// The built-in profile, with the test addresses of the original generator
pub fn default_config() -> Result<Config, Error> {
    import_config(include_str!("../default_config.toml"))
}

/// Parse an IPv4 address of the configuration
pub fn parse_address(addr: &str) -> Result<Ipv4Addr, Error> {
    addr.trim().parse().map_err(|source| Error::AddressFormat {
        addr: addr.to_string(),
        source,
    })
}

/// Imports and validates the configuration from a TOML string.
///
/// Every address of the pool must parse into a usable IPv4 address: a bad entry
/// aborts the import instead of leaking an undefined address into the records.
pub fn import_config(config: &str) -> Result<Config, Error> {
    let toml: ConfigToml = toml::from_str(config)?;

    let addresses = toml
        .addresses
        .iter()
        .map(|iface| parse_address(&iface.ip))
        .collect::<Result<Vec<Ipv4Addr>, Error>>()?;
    if addresses.is_empty() {
        return Err(Error::EmptyAddressPool);
    }
    if let Some(ip) = addresses.iter().find(|ip| ip.is_unspecified()) {
        return Err(Error::UnusableAddress(*ip));
    }

    let (collector_ip, collector_port, source_port) = match toml.collector {
        Some(c) => (
            c.ip.as_deref().map(parse_address).transpose()?,
            c.port,
            c.source_port,
        ),
        None => (None, None, None),
    };

    let mut config = Config {
        seed: toml.seed.unwrap_or(DEFAULT_SEED),
        max_flows_per_pdu: MAX_RECORDS,
        max_pause_secs: toml.max_pause_secs.unwrap_or(DEFAULT_MAX_PAUSE_SECS),
        collector: SocketAddrV4::new(
            collector_ip.unwrap_or(Ipv4Addr::LOCALHOST),
            collector_port.unwrap_or(DEFAULT_COLLECTOR_PORT),
        ),
        source_port: source_port.unwrap_or(DEFAULT_SOURCE_PORT),
        addresses,
    };
    if let Some(max_flows) = toml.max_flows_per_pdu {
        config.set_max_flows_per_pdu(max_flows)?;
    }
    log::info!("Configuration loaded");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = default_config().unwrap();
        assert_eq!(config.seed, DEFAULT_SEED);
        assert_eq!(config.max_flows_per_pdu, 30);
        assert_eq!(config.collector, "127.0.0.1:2055".parse().unwrap());
        assert_eq!(config.bind_addr(), "0.0.0.0:10000".parse().unwrap());
        assert_eq!(
            config.addresses,
            vec![
                Ipv4Addr::new(127, 0, 0, 1),
                Ipv4Addr::new(192, 168, 1, 100),
                Ipv4Addr::new(192, 168, 1, 101),
                Ipv4Addr::new(192, 168, 1, 102),
            ]
        );
    }

    #[test]
    fn test_config() {
        let config = import_config(
            r#"
seed = 42
max_flows_per_pdu = 12
max_pause_secs = 0
[collector]
    ip = "147.229.176.19"
    port = 9995
[[addresses]]
    ip = "10.0.0.1"
"#,
        )
        .unwrap();
        assert_eq!(config.seed, 42);
        assert_eq!(config.max_flows_per_pdu, 12);
        assert_eq!(config.max_pause_secs, 0);
        assert_eq!(config.collector, "147.229.176.19:9995".parse().unwrap());
        assert_eq!(config.source_port, DEFAULT_SOURCE_PORT);
        assert_eq!(config.addresses, vec![Ipv4Addr::new(10, 0, 0, 1)]);
    }

    #[test]
    fn test_bad_address() {
        let err = import_config(
            r#"
[[addresses]]
    ip = "10.0.0.1"
[[addresses]]
    ip = "192.168.1.300"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::AddressFormat { addr, .. } if addr == "192.168.1.300"));
    }

    #[test]
    fn test_unusable_address() {
        let err = import_config("[[addresses]]\nip = \"0.0.0.0\"\n").unwrap_err();
        assert!(matches!(err, Error::UnusableAddress(ip) if ip.is_unspecified()));
    }

    #[test]
    fn test_empty_pool() {
        assert!(matches!(
            import_config("seed = 1\n"),
            Err(Error::EmptyAddressPool)
        ));
    }

    #[test]
    fn test_too_many_flows() {
        let err = import_config("max_flows_per_pdu = 31\n[[addresses]]\nip = \"10.0.0.1\"\n")
            .unwrap_err();
        assert!(matches!(err, Error::InvalidRecordCount(31)));
    }

    #[test]
    fn test_ill_formed() {
        assert!(matches!(
            import_config("addresses = 3"),
            Err(Error::ConfigFormat(_))
        ));
    }
}
