use super::MetricSource;

/// Source for platforms without any supported accounting interface.
///
/// Never touches the filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedSource;

impl MetricSource for UnsupportedSource {
    fn usage_micros(&self) -> Option<u64> {
        None
    }

    fn limit_millicores(&self) -> Option<u64> {
        None
    }

    fn memory_limit_bytes(&self) -> u64 {
        0
    }

    fn memory_used_bytes(&self) -> u64 {
        0
    }

    fn load_average(&self) -> Option<f64> {
        None
    }
}
