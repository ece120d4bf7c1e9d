use nfgen::config::{self, Config};
use nfgen::stage0::PduScheduler;
use nfgen::stage1::FlowSynthesizer;
use nfgen::stage2::PduEncoder;
use nfgen::stage3::{self, UdpExporter};
use nfgen::structs::*;
use nfgen::ui::{self, Stats};
use nfgen::Error;
mod cmd;

use std::fs;
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use clap::Parser;
use rand_core::SeedableRng;
use rand_pcg::Pcg32;

/// The entry point of the application.
///
/// Errors at this level are fatal: they are logged and the process exits.
fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = cmd::Args::parse();

    let result = match args.command {
        cmd::Command::Send {
            config: config_path,
            seed,
            collector,
            port,
            source_port,
            pdu_count,
            max_flows,
            max_pause,
        } => load_config(config_path).and_then(|mut config| {
            if let Some(ip) = collector {
                config.collector.set_ip(config::parse_address(&ip)?);
            }
            if let Some(port) = port {
                config.collector.set_port(port);
            }
            if let Some(source_port) = source_port {
                config.source_port = source_port;
            }
            if let Some(max_pause) = max_pause {
                config.max_pause_secs = max_pause;
            }
            override_common(&mut config, seed, max_flows)?;
            send(&config, pdu_count)
        }),
        cmd::Command::Inspect {
            config: config_path,
            seed,
            pdu_count,
            max_flows,
            unix_time,
            uptime,
        } => load_config(config_path).and_then(|mut config| {
            override_common(&mut config, seed, max_flows)?;
            let now = match unix_time {
                Some(t) => Duration::from_secs(t),
                None => SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .unwrap_or_default(),
            };
            inspect(&config, pdu_count, now, Duration::from_millis(uptime))
        }),
    };

    if let Err(e) = result {
        log::error!("{}", e.report());
        process::exit(1);
    }
}

fn load_config(path: Option<String>) -> Result<Config, Error> {
    match path {
        Some(path) => {
            let config_str = fs::read_to_string(&path)
                .map_err(|source| Error::ConfigFile { path, source })?;
            config::import_config(&config_str)
        }
        None => {
            log::info!("Load default configuration");
            config::default_config()
        }
    }
}

fn override_common(
    config: &mut Config,
    seed: Option<u64>,
    max_flows: Option<usize>,
) -> Result<(), Error> {
    if let Some(seed) = seed {
        config.seed = seed;
    }
    if let Some(max_flows) = max_flows {
        config.set_max_flows_per_pdu(max_flows)?;
    }
    log::debug!("Configuration: {:?}", config);
    Ok(())
}

/// Sends PDUs to the collector until interrupted or until `pdu_count` PDUs were handled
fn send(config: &Config, pdu_count: Option<u64>) -> Result<(), Error> {
    let exporter = UdpExporter::new(config.bind_addr(), config.collector)?;
    let start_ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    let s0 = PduScheduler::new(config.max_flows_per_pdu, config.max_pause_secs)?;
    let s1 = FlowSynthesizer::new(config.addresses.clone())?;
    let s2 = PduEncoder::new(s1, start_ts);
    log::info!("Generating with seed {}", config.seed);
    let mut rng = Pcg32::seed_from_u64(config.seed);

    let stats = Arc::new(Stats::new(pdu_count));
    let running = Arc::new(AtomicBool::new(true));

    // Handle ctrl+C
    let r = Arc::clone(&running);
    if let Err(e) = ctrlc::set_handler(move || {
        if r.load(Ordering::Relaxed) {
            log::warn!("Ending the generation");
            r.store(false, Ordering::Relaxed);
        } else {
            log::warn!("Ending immediately");
            process::abort();
        }
    }) {
        log::warn!("Cannot set the Ctrl-C handler: {e}");
    }

    let monitoring = {
        let stats = Arc::clone(&stats);
        let running = Arc::clone(&running);
        thread::Builder::new()
            .name("Monitoring".into())
            .spawn(move || ui::run(stats, running))
    };
    if let Err(e) = &monitoring {
        log::warn!("Cannot start the monitoring thread: {e}");
    }

    let result = stage3::run(&mut rng, &s0, &s2, &exporter, &stats, &running);

    // Tell the monitoring thread to stop
    running.store(false, Ordering::Relaxed);
    if let Ok(handle) = monitoring {
        if handle.join().is_err() {
            log::warn!("The monitoring thread panicked");
        }
    }
    stats.log_summary();
    result
}

/// Prints `pdu_count` decoded PDUs as JSON lines, as generated at time `now` by an exporter
/// started `uptime` earlier. The RNG stream is consumed as in `send`.
fn inspect(config: &Config, pdu_count: u64, now: Duration, uptime: Duration) -> Result<(), Error> {
    let s0 = PduScheduler::new(config.max_flows_per_pdu, config.max_pause_secs)?;
    let s1 = FlowSynthesizer::new(config.addresses.clone())?;
    let s2 = PduEncoder::new(s1, now.saturating_sub(uptime));
    let mut rng = Pcg32::seed_from_u64(config.seed);
    let mut buffer = [0u8; MAX_PDU_SIZE];

    for _ in 0..pdu_count {
        let flow_count = s0.next_flow_count(&mut rng);
        let len = s2.encode_at(&mut buffer, flow_count, now, &mut rng)?;
        match decode_pdu(&buffer[..len]) {
            Some(pdu) => println!("{}", serde_json::to_string(&pdu)?),
            None => log::error!("Generated PDU cannot be decoded"),
        }
        s0.next_pause(&mut rng);
    }
    Ok(())
}
