//! Turns cumulative CPU-time counters into rates.
//!
//! A cgroup only exposes the total CPU time its processes consumed since it was
//! created. [`CpuDeltaState`] remembers the previous reading so that two
//! consecutive queries yield the average usage over the interval between them.

use std::time::Instant;

/// Source of monotonic timestamps for delta computations.
pub trait Clock: std::fmt::Debug + Send + Sync {
    fn now(&self) -> Instant;
}

/// [`Clock`] backed by [`Instant::now`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// The previous counter reading, or nothing before the first sample.
///
/// Counter value and timestamp are stored as one pair, so they are always set
/// and cleared together.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CpuDeltaState {
    previous: Option<(u64, Instant)>,
}

impl CpuDeltaState {
    /// Records `usage_micros` taken at `now` and returns the usage since the
    /// previous sample in millicores.
    ///
    /// The first sample only establishes the baseline and returns `0`. A counter
    /// that went backwards (cgroup recreated) counts as no usage.
    pub fn sample(&mut self, now: Instant, usage_micros: u64) -> u64 {
        let Some((prev_micros, prev_at)) = self.previous.replace((usage_micros, now)) else {
            log::debug!("cpu delta baseline set at {usage_micros}us");
            return 0;
        };

        let interval_micros = now.saturating_duration_since(prev_at).as_micros();
        if interval_micros == 0 {
            return 0;
        }

        let used_micros = usage_micros.saturating_sub(prev_micros);
        (used_micros as f64 / interval_micros as f64 * 1000.0).round() as u64
    }

    pub fn reset(&mut self) {
        self.previous = None;
    }

    pub fn has_baseline(&self) -> bool {
        self.previous.is_some()
    }
}

/// Fraction of the CPU limit in use: `1.0` means the limit is saturated.
pub fn load(millicores: u64, limit_cores: f64) -> f64 {
    if millicores == 0 || limit_cores <= 0.0 {
        return 0.0;
    }
    millicores as f64 / (limit_cores * 1000.0)
}

/// The CPU limit in cores.
///
/// A positive cgroup limit wins. Otherwise the configured override applies, and
/// failing that every logical CPU counts.
pub fn limit_cores(limit_millicores: Option<u64>, cores_override: Option<f64>, logical_cpus: f64) -> f64 {
    if let Some(millicores) = limit_millicores.filter(|m| *m > 0) {
        return millicores as f64 / 1000.0;
    }
    if let Some(cores) = cores_override.filter(|c| *c > 0.0) {
        log::debug!("no cgroup cpu limit, using configured {cores} cores");
        return cores;
    }
    logical_cpus
}
