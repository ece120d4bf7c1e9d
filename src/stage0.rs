use crate::error::Error;
use crate::structs::MAX_RECORDS;

use rand_core::*;
use rand_distr::{Distribution, Uniform};
use std::time::Duration;

/// Stage 0: decide the size of the next PDU and how long to wait before sending another one
#[derive(Debug, Clone)]
pub struct PduScheduler {
    flow_count_distrib: Uniform<usize>,
    pause_distrib: Option<Uniform<u64>>,
}

impl PduScheduler {
    /// PDUs carry between 1 and `max_flows` flows and are separated by a pause of
    /// less than `max_pause_secs` whole seconds.
    pub fn new(max_flows: usize, max_pause_secs: u64) -> Result<Self, Error> {
        if max_flows == 0 || max_flows > MAX_RECORDS {
            return Err(Error::InvalidRecordCount(max_flows));
        }
        Ok(PduScheduler {
            flow_count_distrib: Uniform::new_inclusive(1, max_flows),
            pause_distrib: (max_pause_secs > 0).then(|| Uniform::new(0, max_pause_secs)),
        })
    }

    pub fn next_flow_count(&self, rng: &mut impl RngCore) -> usize {
        self.flow_count_distrib.sample(rng)
    }

    /// Without pause, nothing is drawn from the RNG
    pub fn next_pause(&self, rng: &mut impl RngCore) -> Duration {
        match &self.pause_distrib {
            Some(d) => Duration::from_secs(d.sample(rng)),
            None => Duration::ZERO,
        }
    }
}
