use clap::{Parser, Subcommand};

#[derive(Debug, Parser, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Generate NetFlow v5 PDUs and send them to a collector
    Send {
        #[arg(
            short,
            long,
            default_value = None,
            help = "Path to the configuration file. By default, use the built-in test addresses"
        )]
        config: Option<String>,
        #[arg(short, long, help = "Seed for random number generation")]
        seed: Option<u64>,
        #[arg(long, help = "IPv4 address of the collector")]
        collector: Option<String>,
        #[arg(short, long, help = "UDP port of the collector")]
        port: Option<u16>,
        #[arg(long, help = "Local UDP port the PDUs are sent from")]
        source_port: Option<u16>,
        #[arg(
            short = 'n',
            long,
            default_value = None,
            help = "Number of PDUs to send before stopping. By default, run until interrupted"
        )]
        pdu_count: Option<u64>,
        #[arg(long, help = "Maximum number of flows per PDU (at most 30)")]
        max_flows: Option<usize>,
        #[arg(long, help = "Pauses between PDUs are shorter than this number of seconds")]
        max_pause: Option<u64>,
    },
    /// Print generated PDUs as JSON lines instead of sending them
    Inspect {
        #[arg(
            short,
            long,
            default_value = None,
            help = "Path to the configuration file. By default, use the built-in test addresses"
        )]
        config: Option<String>,
        #[arg(short, long, help = "Seed for random number generation")]
        seed: Option<u64>,
        #[arg(short = 'n', long, default_value_t = 1, help = "Number of PDUs to generate")]
        pdu_count: u64,
        #[arg(long, help = "Maximum number of flows per PDU (at most 30)")]
        max_flows: Option<usize>,
        #[arg(
            short = 't',
            long,
            default_value = None,
            help = "Unix timestamp of the export. By default, use current time"
        )]
        unix_time: Option<u64>,
        #[arg(
            short,
            long,
            default_value_t = 60_000,
            help = "Exporter uptime in milliseconds at the time of the export"
        )]
        uptime: u64,
    },
}
