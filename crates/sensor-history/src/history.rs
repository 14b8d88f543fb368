//! Bounded Per-Sensor History

use crate::window::select_window;
use crate::SensorReading;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::debug;

/// Default capacity (36 readings = 3h at the 5 min native cadence)
pub const DEFAULT_CAPACITY: usize = 36;

/// Default retention relative to the newest reading (3h)
pub const DEFAULT_RETENTION_SECS: i64 = 3 * 60 * 60;

/// History retention configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Maximum number of readings kept per sensor
    pub capacity: usize,
    /// Maximum age of a reading relative to the newest one (seconds)
    pub retention_secs: i64,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            retention_secs: DEFAULT_RETENTION_SECS,
        }
    }
}

impl HistoryConfig {
    /// Retention for sensors sampled every minute over the same 3h lookback
    pub fn dense() -> Self {
        Self {
            capacity: 180,
            ..Default::default()
        }
    }
}

/// Ascending, bounded series of readings for one sensor.
///
/// The ring is kept contiguous after every mutation so it can be read as a
/// single slice through a shared borrow.
#[derive(Debug, Clone)]
pub struct SensorHistory {
    readings: VecDeque<SensorReading>,
    config: HistoryConfig,
    /// Total readings accepted (for statistics)
    total_written: usize,
}

impl SensorHistory {
    /// Create an empty history with the given retention
    pub fn new(config: HistoryConfig) -> Self {
        Self {
            readings: VecDeque::with_capacity(config.capacity.min(1024)),
            config: HistoryConfig {
                capacity: config.capacity.max(1),
                retention_secs: config.retention_secs.max(0),
            },
            total_written: 0,
        }
    }

    /// Create a history with default retention
    pub fn with_default_capacity() -> Self {
        Self::new(HistoryConfig::default())
    }

    /// Add a reading, evicting the oldest entries once over capacity or age.
    ///
    /// In-order readings are appended; a late reading is placed after every
    /// reading with an equal or smaller timestamp.
    pub fn push(&mut self, reading: SensorReading) {
        let in_order = self
            .readings
            .back()
            .map_or(true, |last| last.timestamp <= reading.timestamp);

        if in_order {
            self.readings.push_back(reading);
        } else {
            let idx = self
                .readings
                .partition_point(|r| r.timestamp <= reading.timestamp);
            debug!(
                "Late reading for {} at {} inserted at position {}",
                reading.sensor_id, reading.timestamp, idx
            );
            self.readings.insert(idx, reading);
        }
        self.total_written += 1;
        self.evict();
        self.readings.make_contiguous();
    }

    fn evict(&mut self) {
        while self.readings.len() > self.config.capacity {
            self.readings.pop_front();
        }

        if let Some(newest) = self.readings.back().map(|r| r.timestamp) {
            let cutoff = newest.saturating_sub(self.config.retention_secs);
            while self
                .readings
                .front()
                .is_some_and(|r| r.timestamp < cutoff)
            {
                self.readings.pop_front();
            }
        }
    }

    /// Readings within `minutes` of the newest reading
    pub fn window(&self, minutes: u32) -> &[SensorReading] {
        let Some(reference) = self.latest().map(|r| r.timestamp) else {
            return &[];
        };
        select_window(self.as_slice(), reference, minutes)
    }

    /// Contiguous ascending view of the history
    pub fn as_slice(&self) -> &[SensorReading] {
        let (front, back) = self.readings.as_slices();
        debug_assert!(back.is_empty());
        front
    }

    /// Owned copy of the history in ascending order
    pub fn to_vec(&self) -> Vec<SensorReading> {
        self.readings.iter().cloned().collect()
    }

    /// Most recent reading
    pub fn latest(&self) -> Option<&SensorReading> {
        self.readings.back()
    }

    /// Iterate readings oldest first
    pub fn iter(&self) -> impl Iterator<Item = &SensorReading> {
        self.readings.iter()
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.config.capacity
    }

    /// Get fill ratio (0.0 to 1.0)
    pub fn fill_ratio(&self) -> f64 {
        self.len() as f64 / self.config.capacity as f64
    }

    /// Get total readings accepted (for statistics)
    pub fn total_written(&self) -> usize {
        self.total_written
    }

    pub fn clear(&mut self) {
        self.readings.clear();
    }
}

impl Default for SensorHistory {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}
