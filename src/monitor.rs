use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;

use crate::config::{Config, Paths};
use crate::cpu::{self, Clock, CpuDeltaState, SystemClock};
use crate::fsutil::{FileProbe, HostProbe};
use crate::platform::{self, CgroupVersion, Detection, Platform};
use crate::source::{self, MetricSource};

/// Returned by [`ResourceMonitor::cpu_limit_millicores`] when no CPU limit applies.
pub const NO_CPU_LIMIT: i64 = -1;

/// Reads the resource usage of the current process's container or host.
///
/// The platform is detected on the first query and cached until
/// [`ResourceMonitor::reset_state`]. CPU usage is computed as a delta between
/// two consecutive queries, so the first one always reports `0`.
///
/// All methods are infallible: unreadable metric files yield zero, the host
/// totals, or [`NO_CPU_LIMIT`].
///
/// ```no_run
/// let monitor = sysres::ResourceMonitor::new();
/// let _ = monitor.cpu_load();
/// std::thread::sleep(std::time::Duration::from_millis(500));
/// println!("cpu load: {:.2}", monitor.cpu_load());
/// println!("memory: {:.2}", monitor.mem_usage());
/// ```
#[derive(Debug)]
pub struct ResourceMonitor {
    config: Config,
    paths: Paths,
    probe: Arc<dyn FileProbe>,
    clock: Arc<dyn Clock>,
    state: Mutex<State>,
}

#[derive(Debug, Default)]
struct State {
    bound: Option<Bound>,
    cpu: CpuDeltaState,
}

/// A detection result together with the source it selected.
#[derive(Debug)]
struct Bound {
    detection: Detection,
    source: Box<dyn MetricSource>,
}

impl Bound {
    fn usage_millicores(&self, cpu: &mut CpuDeltaState, clock: &dyn Clock) -> u64 {
        match self.source.usage_micros() {
            Some(micros) => cpu.sample(clock.now(), micros),
            None => 0,
        }
    }

    fn limit_cores(&self, config: &Config) -> f64 {
        cpu::limit_cores(
            self.source.limit_millicores(),
            config.cpu_cores(),
            self.source.logical_cpus(),
        )
    }

    fn load_avg(&self) -> f64 {
        let cpus = self.source.logical_cpus();
        match self.source.load_average() {
            Some(load) if cpus > 0.0 => load / cpus,
            _ => 0.0,
        }
    }

    fn load(&self, cpu: &mut CpuDeltaState, clock: &dyn Clock, config: &Config) -> f64 {
        match self.source.usage_micros() {
            Some(micros) => {
                let millicores = cpu.sample(clock.now(), micros);
                cpu::load(millicores, self.limit_cores(config))
            }
            None => self.load_avg(),
        }
    }

    fn limit_millicores(&self) -> i64 {
        self.source
            .limit_millicores()
            .and_then(|m| i64::try_from(m).ok())
            .unwrap_or(NO_CPU_LIMIT)
    }

    fn mem_usage(&self) -> f64 {
        mem_ratio(
            self.source.memory_used_bytes(),
            self.source.memory_limit_bytes(),
        )
    }
}

fn mem_ratio(used: u64, limit: u64) -> f64 {
    if limit == 0 {
        return 0.0;
    }
    used as f64 / limit as f64
}

impl Default for ResourceMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceMonitor {
    /// Creates a monitor configured from the environment.
    ///
    /// Does not touch the filesystem; detection happens on the first query.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> ResourceMonitorBuilder {
        ResourceMonitorBuilder::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn bind<'a>(&self, slot: &'a mut Option<Bound>) -> &'a Bound {
        slot.get_or_insert_with(|| {
            let detection = platform::detect(self.probe.as_ref(), &self.paths);
            let source =
                source::for_detection(&detection, Arc::clone(&self.probe), self.paths.clone());
            Bound { detection, source }
        })
    }

    /// Runs `f` against the cached detection, detecting first if needed.
    fn with_bound<R>(&self, f: impl FnOnce(&Bound) -> R) -> R {
        let mut state = self.lock();
        f(self.bind(&mut state.bound))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn detect_platform(&self) -> Platform {
        self.with_bound(|bound| bound.detection.platform)
    }

    pub fn cgroup_version(&self) -> CgroupVersion {
        self.detect_platform().cgroup_version()
    }

    /// Whether a finite memory limit confines the process.
    pub fn is_container_env(&self) -> bool {
        self.with_bound(|bound| bound.detection.containerized)
    }

    /// The 1-minute load average divided by the number of logical CPUs.
    ///
    /// `0.0` on platforms without a load average.
    pub fn cpu_load_avg(&self) -> f64 {
        self.with_bound(Bound::load_avg)
    }

    /// CPU usage as a fraction of the CPU limit since the previous CPU query.
    ///
    /// Inside a cgroup this is the millicore delta over [`Self::cpu_limit_cores`].
    /// Elsewhere it is [`Self::cpu_load_avg`].
    pub fn cpu_load(&self) -> f64 {
        let mut guard = self.lock();
        let State { bound, cpu } = &mut *guard;
        self.bind(bound).load(cpu, self.clock.as_ref(), &self.config)
    }

    /// CPU usage since the previous CPU query, in millicores.
    ///
    /// `0` on the first call after construction or [`Self::reset_state`], and on
    /// platforms without a cumulative CPU counter.
    pub fn cpu_usage_millicores(&self) -> u64 {
        let mut guard = self.lock();
        let State { bound, cpu } = &mut *guard;
        self.bind(bound).usage_millicores(cpu, self.clock.as_ref())
    }

    /// Cumulative CPU time of the cgroup in microseconds, `0` outside a cgroup.
    pub fn cpu_usage_micros(&self) -> u64 {
        self.with_bound(|bound| bound.source.usage_micros().unwrap_or(0))
    }

    /// The CPU limit in cores.
    ///
    /// Falls back to the configured override and then to the logical CPU count
    /// when no cgroup limit applies, so this is always positive.
    pub fn cpu_limit_cores(&self) -> f64 {
        self.with_bound(|bound| bound.limit_cores(&self.config))
    }

    /// The cgroup CPU limit in millicores, or [`NO_CPU_LIMIT`].
    pub fn cpu_limit_millicores(&self) -> i64 {
        self.with_bound(Bound::limit_millicores)
    }

    /// Used memory as a fraction of the memory limit, `0.0` if the limit is unknown.
    pub fn mem_usage(&self) -> f64 {
        self.with_bound(Bound::mem_usage)
    }

    pub fn memory_limit_bytes(&self) -> u64 {
        self.with_bound(|bound| bound.source.memory_limit_bytes())
    }

    pub fn memory_used_bytes(&self) -> u64 {
        self.with_bound(|bound| bound.source.memory_used_bytes())
    }

    /// Forgets the detected platform and the CPU baseline.
    pub fn reset_state(&self) {
        let mut state = self.lock();
        state.bound = None;
        state.cpu.reset();
        log::debug!("resource monitor state reset");
    }

    /// Reads every metric under a single lock.
    ///
    /// Counts as one CPU query: `cpu_load` and `cpu_usage_millicores` share one delta.
    pub fn snapshot(&self) -> ResourceSnapshot {
        let mut guard = self.lock();
        let State { bound, cpu } = &mut *guard;
        let bound = self.bind(bound);

        let cpu_limit_cores = bound.limit_cores(&self.config);
        let cpu_load_avg = bound.load_avg();
        let usage_micros = bound.source.usage_micros();
        let (cpu_usage_millicores, cpu_load) = match usage_micros {
            Some(micros) => {
                let millicores = cpu.sample(self.clock.now(), micros);
                (millicores, cpu::load(millicores, cpu_limit_cores))
            }
            None => (0, cpu_load_avg),
        };
        let memory_limit_bytes = bound.source.memory_limit_bytes();
        let memory_used_bytes = bound.source.memory_used_bytes();

        ResourceSnapshot {
            platform: bound.detection.platform,
            cgroup_version: bound.detection.platform.cgroup_version(),
            containerized: bound.detection.containerized,
            cpu_load,
            cpu_load_avg,
            cpu_usage_millicores,
            cpu_usage_micros: usage_micros.unwrap_or(0),
            cpu_limit_cores,
            cpu_limit_millicores: bound.limit_millicores(),
            memory_used_bytes,
            memory_limit_bytes,
            mem_usage: mem_ratio(memory_used_bytes, memory_limit_bytes),
        }
    }
}

/// Configures a [`ResourceMonitor`]. Unset parts default to the environment,
/// the real filesystem and the system clock.
#[derive(Debug, Default)]
pub struct ResourceMonitorBuilder {
    config: Option<Config>,
    probe: Option<Arc<dyn FileProbe>>,
    clock: Option<Arc<dyn Clock>>,
}

impl ResourceMonitorBuilder {
    pub fn config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    pub fn probe(mut self, probe: Arc<dyn FileProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn build(self) -> ResourceMonitor {
        let config = self.config.unwrap_or_else(Config::from_env);
        let paths = config.paths();
        ResourceMonitor {
            config,
            paths,
            probe: self.probe.unwrap_or_else(|| Arc::new(HostProbe)),
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            state: Mutex::new(State::default()),
        }
    }
}

/// Every metric read at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceSnapshot {
    pub platform: Platform,
    pub cgroup_version: CgroupVersion,
    pub containerized: bool,
    pub cpu_load: f64,
    pub cpu_load_avg: f64,
    pub cpu_usage_millicores: u64,
    pub cpu_usage_micros: u64,
    pub cpu_limit_cores: f64,
    pub cpu_limit_millicores: i64,
    pub memory_used_bytes: u64,
    pub memory_limit_bytes: u64,
    pub mem_usage: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{CountingProbe, FakeRoot, ManualClock};

    fn monitor(root: &FakeRoot, clock: &Arc<ManualClock>) -> ResourceMonitor {
        ResourceMonitor::builder()
            .config(root.config())
            .clock(clock.clone())
            .build()
    }

    #[test]
    fn test_new_does_no_io() {
        let probe = Arc::new(CountingProbe::default());
        let _monitor = ResourceMonitor::builder()
            .config(Config::with_rootfs("/nonexistent"))
            .probe(probe.clone())
            .build();
        assert_eq!(probe.count(), 0);
    }

    #[test]
    fn test_detection_is_cached() {
        let root = FakeRoot::new();
        root.write("sys/fs/cgroup/cpu.stat", "usage_usec 10\n");
        root.write("sys/fs/cgroup/memory.max", "max\n");
        let probe = Arc::new(CountingProbe::default());
        let monitor = ResourceMonitor::builder()
            .config(root.config())
            .probe(probe.clone())
            .build();

        let platform = monitor.detect_platform();
        let reads = probe.count();
        assert_eq!(monitor.detect_platform(), platform);
        let _ = monitor.is_container_env();
        let _ = monitor.cgroup_version();
        assert_eq!(probe.count(), reads);

        monitor.reset_state();
        assert_eq!(monitor.detect_platform(), platform);
        assert_eq!(probe.count(), reads * 2);
    }

    #[test]
    fn test_poisoned_lock_is_recovered() {
        let root = FakeRoot::new();
        let monitor = monitor(&root, &Arc::new(ManualClock::new()));

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = monitor.lock();
            panic!("poison");
        }));
        assert!(result.is_err());
        assert!(monitor.state.is_poisoned());

        let _ = monitor.detect_platform();
        assert_eq!(monitor.cpu_usage_millicores(), 0);
    }

    #[cfg(target_os = "linux")]
    mod linux {
        use super::*;
        use std::time::Duration;

        #[test]
        fn test_cgroup_v2_load() {
            let root = FakeRoot::new();
            let clock = Arc::new(ManualClock::new());
            root.write("proc/self/cgroup", "0::/app\n");
            root.write("sys/fs/cgroup/app/cpu.stat", "usage_usec 1000000\n");
            root.write("sys/fs/cgroup/app/cpu.max", "100000 100000\n");
            let monitor = monitor(&root, &clock);

            assert_eq!(monitor.detect_platform(), Platform::LinuxCgroupV2);
            assert_eq!(monitor.cgroup_version().as_i32(), 2);
            assert_eq!(monitor.cpu_limit_millicores(), 1000);
            assert_eq!(monitor.cpu_limit_cores(), 1.0);
            assert_eq!(monitor.cpu_load(), 0.0);

            root.write("sys/fs/cgroup/app/cpu.stat", "usage_usec 1500000\n");
            clock.advance(Duration::from_millis(500));
            let load = monitor.cpu_load();
            assert!((load - 1.0).abs() < 0.01, "load was {load}");
            assert_eq!(monitor.cpu_usage_micros(), 1_500_000);
        }

        #[test]
        fn test_concurrent_first_queries_seed_once() {
            let root = FakeRoot::new();
            root.write("sys/fs/cgroup/cpu.stat", "usage_usec 1000\n");
            let monitor = monitor(&root, &Arc::new(ManualClock::new()));

            std::thread::scope(|s| {
                for _ in 0..8 {
                    s.spawn(|| assert_eq!(monitor.cpu_usage_millicores(), 0));
                }
            });
            assert!(monitor.lock().cpu.has_baseline());
        }

        #[test]
        fn test_cgroup_v1_scenario() {
            let root = FakeRoot::new();
            let clock = Arc::new(ManualClock::new());
            root.write("sys/fs/cgroup/cpuacct/cpuacct.usage", "2000000000\n");
            root.write("sys/fs/cgroup/cpu/cpu.cfs_quota_us", "100000\n");
            root.write("sys/fs/cgroup/cpu/cpu.cfs_period_us", "100000\n");
            let monitor = monitor(&root, &clock);

            assert_eq!(monitor.detect_platform(), Platform::LinuxCgroupV1);
            assert_eq!(monitor.cpu_usage_millicores(), 0);

            root.write("sys/fs/cgroup/cpuacct/cpuacct.usage", "2500000000\n");
            clock.advance(Duration::from_secs(1));
            assert_eq!(monitor.cpu_usage_millicores(), 500);

            monitor.reset_state();
            assert_eq!(monitor.cpu_load(), 0.0);
            root.write("sys/fs/cgroup/cpuacct/cpuacct.usage", "3000000000\n");
            clock.advance(Duration::from_secs(1));
            assert_eq!(monitor.cpu_load(), 0.5);
        }

        #[test]
        fn test_reset_then_delta_is_zero() {
            let root = FakeRoot::new();
            let clock = Arc::new(ManualClock::new());
            root.write("sys/fs/cgroup/cpu.stat", "usage_usec 0\n");
            let monitor = monitor(&root, &clock);

            monitor.cpu_usage_millicores();
            root.write("sys/fs/cgroup/cpu.stat", "usage_usec 250000\n");
            clock.advance(Duration::from_secs(1));
            monitor.reset_state();
            assert_eq!(monitor.cpu_usage_millicores(), 0);
        }

        #[test]
        fn test_unlimited_cpu_uses_override_then_cpu_count() {
            let root = FakeRoot::new();
            root.write("sys/fs/cgroup/cpu.stat", "usage_usec 0\n");
            root.write("sys/fs/cgroup/cpu.max", "max 100000\n");

            let monitor = ResourceMonitor::builder().config(root.config()).build();
            assert_eq!(monitor.cpu_limit_millicores(), NO_CPU_LIMIT);
            assert_eq!(monitor.cpu_limit_cores(), num_cpus::get() as f64);

            let monitor = ResourceMonitor::builder()
                .config(root.config().cpu_cores_override(Some(2.5)))
                .build();
            assert_eq!(monitor.cpu_limit_cores(), 2.5);
        }

        #[test]
        fn test_cgroup_limit_beats_override() {
            let root = FakeRoot::new();
            root.write("sys/fs/cgroup/cpu.stat", "usage_usec 0\n");
            root.write("sys/fs/cgroup/cpu.max", "50000 100000\n");

            let monitor = ResourceMonitor::builder()
                .config(root.config().cpu_cores_override(Some(4.0)))
                .build();
            assert_eq!(monitor.cpu_limit_cores(), 0.5);
        }

        #[test]
        fn test_memory_usage_ratio() {
            let root = FakeRoot::new();
            root.write("sys/fs/cgroup/cpu.stat", "usage_usec 0\n");
            root.write("sys/fs/cgroup/memory.max", "1073741824\n");
            root.write("sys/fs/cgroup/memory.current", "268435456\n");
            let monitor = monitor(&root, &Arc::new(ManualClock::new()));

            assert!(monitor.is_container_env());
            let used = monitor.memory_used_bytes();
            let limit = monitor.memory_limit_bytes();
            assert_eq!(monitor.mem_usage(), used as f64 / limit as f64);
            assert_eq!(monitor.mem_usage(), 0.25);
        }

        #[test]
        fn test_host_uses_proc() {
            let root = FakeRoot::new();
            root.write("proc/meminfo", "MemTotal: 1000 kB\nMemAvailable: 250 kB\n");
            root.write("proc/loadavg", "1.00 0.50 0.25 1/100 42\n");
            let monitor = monitor(&root, &Arc::new(ManualClock::new()));

            assert_eq!(monitor.detect_platform(), Platform::LinuxHost);
            assert!(!monitor.is_container_env());
            assert_eq!(monitor.cpu_limit_millicores(), NO_CPU_LIMIT);
            assert_eq!(monitor.cpu_usage_millicores(), 0);
            assert_eq!(monitor.cpu_usage_micros(), 0);
            assert_eq!(monitor.memory_limit_bytes(), 1000 * 1024);
            assert_eq!(monitor.memory_used_bytes(), 750 * 1024);
            assert_eq!(monitor.mem_usage(), 0.75);

            let expected = 1.0 / num_cpus::get() as f64;
            assert_eq!(monitor.cpu_load_avg(), expected);
            assert_eq!(monitor.cpu_load(), expected);
        }

        #[test]
        fn test_snapshot_shares_one_delta() {
            let root = FakeRoot::new();
            let clock = Arc::new(ManualClock::new());
            root.write("sys/fs/cgroup/cpu.stat", "usage_usec 0\n");
            root.write("sys/fs/cgroup/cpu.max", "200000 100000\n");
            let monitor = monitor(&root, &clock);

            let first = monitor.snapshot();
            assert_eq!(first.cpu_usage_millicores, 0);
            assert_eq!(first.cpu_limit_millicores, 2000);

            root.write("sys/fs/cgroup/cpu.stat", "usage_usec 1000000\n");
            clock.advance(Duration::from_secs(1));
            let second = monitor.snapshot();
            assert_eq!(second.platform, Platform::LinuxCgroupV2);
            assert_eq!(second.cpu_usage_millicores, 1000);
            assert_eq!(second.cpu_load, 0.5);
            assert_eq!(second.cpu_usage_micros, 1_000_000);
        }
    }
}
