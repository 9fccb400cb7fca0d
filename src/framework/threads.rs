//! Process-wide threading knobs used by the separable framework.
//!
//! The thread count defaults to the hardware's reported parallelism and can
//! only be lowered. A separable call only starts workers when its estimated
//! number of operations reaches the threading threshold.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Default minimum operation count for a call to go multi-threaded.
pub const DEFAULT_THREADING_THRESHOLD: usize = 70_000;

// 0 means "not set": use the hardware parallelism.
static NUMBER_OF_THREADS: AtomicUsize = AtomicUsize::new(0);
static THREADING_THRESHOLD: AtomicUsize = AtomicUsize::new(DEFAULT_THREADING_THRESHOLD);

/// Parallelism reported by the operating system (at least 1).
pub fn hardware_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Sets the maximum number of worker threads. `0` restores the default;
/// larger values than the hardware parallelism are clamped.
pub fn set_number_of_threads(n: usize) {
    let n = if n == 0 { 0 } else { n.min(hardware_threads()) };
    NUMBER_OF_THREADS.store(n, Ordering::Relaxed);
}

pub fn number_of_threads() -> usize {
    match NUMBER_OF_THREADS.load(Ordering::Relaxed) {
        0 => hardware_threads(),
        n => n,
    }
}

pub fn set_threading_threshold(operations: usize) {
    THREADING_THRESHOLD.store(operations, Ordering::Relaxed);
}

pub fn threading_threshold() -> usize {
    THREADING_THRESHOLD.load(Ordering::Relaxed)
}

/// Threading settings as read from a JSON config.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThreadingConfig {
    /// Maximum number of threads; `None` keeps the hardware default.
    pub threads: Option<usize>,
    pub threshold: usize,
}

impl Default for ThreadingConfig {
    fn default() -> Self {
        Self {
            threads: None,
            threshold: DEFAULT_THREADING_THRESHOLD,
        }
    }
}

impl ThreadingConfig {
    /// Installs these settings process-wide.
    pub fn apply(&self) {
        set_number_of_threads(self.threads.unwrap_or(0));
        set_threading_threshold(self.threshold);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_from_empty_json() {
        let cfg: ThreadingConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg, ThreadingConfig::default());
        let cfg: ThreadingConfig = serde_json::from_str(r#"{"threads": 2}"#).unwrap();
        assert_eq!(cfg.threads, Some(2));
        assert_eq!(cfg.threshold, DEFAULT_THREADING_THRESHOLD);
    }

    #[test]
    fn thread_count_never_exceeds_hardware() {
        assert!(number_of_threads() >= 1);
        assert!(number_of_threads() <= hardware_threads());
    }
}
