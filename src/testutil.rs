//! Fixtures shared by the unit tests.

use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use crate::config::{Config, Paths};
use crate::cpu::Clock;
use crate::fsutil::{self, FileProbe, HostProbe};

/// A temporary directory laid out like `/`, holding synthetic cgroup and proc files.
#[derive(Debug)]
pub(crate) struct FakeRoot {
    dir: tempfile::TempDir,
}

impl FakeRoot {
    pub(crate) fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("failed to create temp dir"),
        }
    }

    /// Writes `content` to `relative`, creating parent directories.
    pub(crate) fn write(&self, relative: &str, content: &str) {
        let path = self.dir.path().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("failed to create fixture dir");
        }
        std::fs::write(&path, content).expect("failed to write fixture file");
    }

    pub(crate) fn config(&self) -> Config {
        Config::with_rootfs(self.dir.path())
    }

    pub(crate) fn paths(&self) -> Paths {
        self.config().paths()
    }

    pub(crate) fn probe(&self) -> HostProbe {
        HostProbe
    }
}

/// A [`HostProbe`] that counts every read.
#[derive(Debug, Default)]
pub(crate) struct CountingProbe {
    reads: AtomicUsize,
}

impl CountingProbe {
    pub(crate) fn count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

impl FileProbe for CountingProbe {
    fn read(&self, path: &Path) -> fsutil::Result<String> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        HostProbe.read(path)
    }
}

/// A [`Clock`] that only moves when told to.
#[derive(Debug)]
pub(crate) struct ManualClock {
    now: Mutex<Instant>,
}

impl ManualClock {
    pub(crate) fn new() -> Self {
        Self {
            now: Mutex::new(Instant::now()),
        }
    }

    pub(crate) fn advance(&self, by: Duration) {
        *self.now.lock().unwrap() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock().unwrap()
    }
}
