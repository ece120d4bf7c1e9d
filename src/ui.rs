use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const REPORT_PERIOD: Duration = Duration::from_secs(5);

pub struct Stats {
    pub start_time: Instant,
    /// Number of PDUs to handle before stopping, if any
    pub pdu_target: Option<u64>,
    pub pdu_counter: AtomicU64,
    pub flow_counter: AtomicU64,
    pub bytes_counter: AtomicU64,
    pub failed_counter: AtomicU64,
}

impl Default for Stats {
    fn default() -> Self {
        Stats::new(None)
    }
}

// For the moment, handles generation statistics only

impl Stats {
    pub fn new(pdu_target: Option<u64>) -> Self {
        Stats {
            start_time: Instant::now(),
            pdu_target,
            pdu_counter: AtomicU64::new(0),
            flow_counter: AtomicU64::new(0),
            bytes_counter: AtomicU64::new(0),
            failed_counter: AtomicU64::new(0),
        }
    }

    pub fn increase(&self, flows: usize, bytes: usize) {
        self.pdu_counter.fetch_add(1, Ordering::Relaxed);
        self.flow_counter.fetch_add(flows as u64, Ordering::Relaxed);
        self.bytes_counter.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn increase_failed(&self) {
        self.failed_counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Both sent and failed PDUs count towards the target
    pub fn should_stop(&self) -> bool {
        match self.pdu_target {
            Some(target) => {
                self.pdu_counter.load(Ordering::Relaxed)
                    + self.failed_counter.load(Ordering::Relaxed)
                    >= target
            }
            None => false,
        }
    }

    fn log_throughput(&self) {
        let pc = self.pdu_counter.load(Ordering::Relaxed);
        let fc = self.flow_counter.load(Ordering::Relaxed);
        let bc = self.bytes_counter.load(Ordering::Relaxed);
        let elapsed = self.start_time.elapsed().as_secs_f64();
        let throughput = if elapsed > 0. {
            8. * (bc as f64) / elapsed / 1000.
        } else {
            0.
        };
        log::info!("{pc} PDUs sent, {fc} flows ({throughput:.2} kbps)");
    }

    /// Logs a summary of the generation
    pub fn log_summary(&self) {
        self.log_throughput();
        let failed = self.failed_counter.load(Ordering::Relaxed);
        if failed > 0 {
            log::warn!("{failed} PDUs could not be sent");
        }
    }
}

/// Periodically logs the generation throughput until `running` is cleared
pub fn run(stats: Arc<Stats>, running: Arc<AtomicBool>) {
    let mut last_report = Instant::now();
    while running.load(Ordering::Relaxed) {
        thread::sleep(Duration::from_millis(100));
        if last_report.elapsed() >= REPORT_PERIOD {
            stats.log_throughput();
            last_report = Instant::now();
        }
    }
}
