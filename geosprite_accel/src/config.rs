// Copyright 2026 the Geosprite Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Worker-count policy.

/// Worker count assumed when the host cannot report its parallelism.
pub const DEFAULT_WORKER_COUNT: usize = 4;

/// Tuning for [`ParallelBackend`](crate::ParallelBackend).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AccelConfig {
    /// Frames with fewer targets run on the calling thread.
    pub min_parallel_items: usize,
    /// Targets per worker before another worker is added.
    pub slice_size: usize,
    /// Upper bound on workers. `0` means no bound beyond the hardware.
    pub max_workers: usize,
}

impl Default for AccelConfig {
    fn default() -> Self {
        Self {
            min_parallel_items: 64,
            slice_size: 256,
            max_workers: 0,
        }
    }
}

/// Number of workers to split `total` targets across.
///
/// `available` is the hardware thread count, `0` if unknown. The result is
/// always at least one:
///
/// - one worker when `total` is below [`AccelConfig::min_parallel_items`];
/// - otherwise `min(threads, total / slice_size)`, where `threads` is
///   `available` (or [`DEFAULT_WORKER_COUNT`]) capped by
///   [`AccelConfig::max_workers`].
#[must_use]
pub fn determine_worker_count(total: usize, available: usize, config: &AccelConfig) -> usize {
    if total == 0 || total < config.min_parallel_items {
        return 1;
    }
    let mut threads = if available == 0 {
        DEFAULT_WORKER_COUNT
    } else {
        available
    };
    if config.max_workers > 0 {
        threads = threads.min(config.max_workers);
    }
    let by_slice = (total / config.slice_size.max(1)).max(1);
    threads.min(by_slice).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_frames_stay_sequential() {
        let config = AccelConfig::default();
        assert_eq!(determine_worker_count(0, 8, &config), 1);
        assert_eq!(determine_worker_count(63, 8, &config), 1);
    }

    #[test]
    fn workers_grow_with_slices() {
        let config = AccelConfig::default();
        assert_eq!(determine_worker_count(64, 8, &config), 1);
        assert_eq!(determine_worker_count(512, 8, &config), 2);
        assert_eq!(determine_worker_count(100_000, 8, &config), 8);
    }

    #[test]
    fn unknown_hardware_and_caps() {
        let config = AccelConfig {
            min_parallel_items: 1,
            slice_size: 1,
            max_workers: 3,
        };
        assert_eq!(determine_worker_count(100, 16, &config), 3);
        let uncapped = AccelConfig {
            max_workers: 0,
            ..config
        };
        assert_eq!(determine_worker_count(100, 0, &uncapped), DEFAULT_WORKER_COUNT);
    }

    #[test]
    fn zero_slice_size_is_tolerated() {
        let config = AccelConfig {
            slice_size: 0,
            ..AccelConfig::default()
        };
        assert_eq!(determine_worker_count(1000, 2, &config), 2);
    }
}
