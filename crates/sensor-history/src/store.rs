//! Concurrent History Store

use crate::history::{HistoryConfig, SensorHistory};
use crate::{HistoryError, SensorReading};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use tracing::{debug, info};

type SharedHistory = Arc<Mutex<SensorHistory>>;

/// Long-lived store of bounded histories keyed by sensor id.
///
/// Appends to one sensor are serialized by that sensor's mutex. The sensor
/// map is only write-locked when a new sensor is registered.
pub struct HistoryStore {
    sensors: RwLock<HashMap<String, SharedHistory>>,
    config: HistoryConfig,
}

impl HistoryStore {
    /// Create an empty store
    pub fn new(config: HistoryConfig) -> Self {
        info!(
            "Creating history store: capacity={}, retention={}s",
            config.capacity, config.retention_secs
        );
        Self {
            sensors: RwLock::new(HashMap::new()),
            config,
        }
    }

    fn lock_error<E: std::fmt::Display>(e: E) -> HistoryError {
        HistoryError::LockPoisoned(e.to_string())
    }

    fn history(&self, sensor_id: &str) -> Result<Option<SharedHistory>, HistoryError> {
        let sensors = self.sensors.read().map_err(Self::lock_error)?;
        Ok(sensors.get(sensor_id).cloned())
    }

    fn history_or_insert(&self, sensor_id: &str) -> Result<SharedHistory, HistoryError> {
        if let Some(history) = self.history(sensor_id)? {
            return Ok(history);
        }

        let mut sensors = self.sensors.write().map_err(Self::lock_error)?;
        let history = sensors.entry(sensor_id.to_string()).or_insert_with(|| {
            debug!("Registering sensor {}", sensor_id);
            Arc::new(Mutex::new(SensorHistory::new(self.config)))
        });
        Ok(Arc::clone(history))
    }

    /// Append a reading to its sensor's history
    pub fn append(&self, reading: SensorReading) -> Result<(), HistoryError> {
        if reading.sensor_id.is_empty() {
            return Err(HistoryError::EmptySensorId);
        }

        let history = self.history_or_insert(&reading.sensor_id)?;
        let mut history = history.lock().map_err(Self::lock_error)?;
        history.push(reading);
        Ok(())
    }

    /// Append many readings, returning how many were stored
    pub fn extend<I>(&self, readings: I) -> Result<usize, HistoryError>
    where
        I: IntoIterator<Item = SensorReading>,
    {
        let mut stored = 0;
        for reading in readings {
            self.append(reading)?;
            stored += 1;
        }
        Ok(stored)
    }

    /// Ascending copy of a sensor's history (empty if unknown)
    pub fn snapshot(&self, sensor_id: &str) -> Result<Vec<SensorReading>, HistoryError> {
        match self.history(sensor_id)? {
            Some(history) => Ok(history.lock().map_err(Self::lock_error)?.to_vec()),
            None => Ok(Vec::new()),
        }
    }

    /// Readings within `minutes` of the sensor's newest reading
    pub fn window(&self, sensor_id: &str, minutes: u32) -> Result<Vec<SensorReading>, HistoryError> {
        match self.history(sensor_id)? {
            Some(history) => {
                let history = history.lock().map_err(Self::lock_error)?;
                Ok(history.window(minutes).to_vec())
            }
            None => Ok(Vec::new()),
        }
    }

    /// Most recent reading of a sensor
    pub fn latest(&self, sensor_id: &str) -> Result<Option<SensorReading>, HistoryError> {
        match self.history(sensor_id)? {
            Some(history) => Ok(history.lock().map_err(Self::lock_error)?.latest().cloned()),
            None => Ok(None),
        }
    }

    /// Known sensor ids, sorted
    pub fn sensor_ids(&self) -> Result<Vec<String>, HistoryError> {
        let sensors = self.sensors.read().map_err(Self::lock_error)?;
        let mut ids: Vec<String> = sensors.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }

    /// Number of readings held for a sensor
    pub fn len(&self, sensor_id: &str) -> Result<usize, HistoryError> {
        match self.history(sensor_id)? {
            Some(history) => Ok(history.lock().map_err(Self::lock_error)?.len()),
            None => Ok(0),
        }
    }

    /// Number of tracked sensors
    pub fn sensor_count(&self) -> Result<usize, HistoryError> {
        let sensors = self.sensors.read().map_err(Self::lock_error)?;
        Ok(sensors.len())
    }

    /// Drop a sensor's history
    pub fn remove(&self, sensor_id: &str) -> Result<bool, HistoryError> {
        let mut sensors = self.sensors.write().map_err(Self::lock_error)?;
        Ok(sensors.remove(sensor_id).is_some())
    }

    pub fn clear(&self) -> Result<(), HistoryError> {
        let mut sensors = self.sensors.write().map_err(Self::lock_error)?;
        sensors.clear();
        Ok(())
    }

    pub fn config(&self) -> HistoryConfig {
        self.config
    }
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new(HistoryConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn reading(sensor: &str, ts: i64) -> SensorReading {
        SensorReading {
            humidity: Some(40.0),
            ..SensorReading::new(sensor, ts)
        }
    }

    #[test]
    fn test_append_and_snapshot() {
        let store = HistoryStore::default();
        store.append(reading("a", 0)).unwrap();
        store.append(reading("a", 300)).unwrap();
        store.append(reading("b", 100)).unwrap();

        assert_eq!(store.snapshot("a").unwrap().len(), 2);
        assert_eq!(store.snapshot("b").unwrap().len(), 1);
        assert!(store.snapshot("missing").unwrap().is_empty());
        assert_eq!(store.sensor_ids().unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn test_rejects_empty_sensor_id() {
        let store = HistoryStore::default();
        assert!(matches!(
            store.append(reading("", 0)),
            Err(HistoryError::EmptySensorId)
        ));
    }

    #[test]
    fn test_fifo_eviction_per_sensor() {
        let store = HistoryStore::new(HistoryConfig {
            capacity: 3,
            retention_secs: i64::MAX,
        });
        store
            .extend((0..6).map(|i| reading("a", i * 300)))
            .unwrap();

        let stamps: Vec<i64> = store.snapshot("a").unwrap().iter().map(|r| r.timestamp).collect();
        assert_eq!(stamps, vec![900, 1200, 1500]);
        assert_eq!(store.latest("a").unwrap().map(|r| r.timestamp), Some(1500));
    }

    #[test]
    fn test_window_and_remove() {
        let store = HistoryStore::default();
        store.extend((0..7).map(|i| reading("a", i * 300))).unwrap();

        assert_eq!(store.window("a", 5).unwrap().len(), 2);
        assert!(store.remove("a").unwrap());
        assert_eq!(store.len("a").unwrap(), 0);
    }

    #[test]
    fn test_concurrent_appends() {
        let store = Arc::new(HistoryStore::new(HistoryConfig {
            capacity: 1000,
            retention_secs: i64::MAX,
        }));

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for i in 0..50 {
                        store.append(reading("shared", i * 4 + t)).unwrap();
                        store.append(reading(&format!("own-{t}"), i)).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let shared = store.snapshot("shared").unwrap();
        assert_eq!(shared.len(), 200);
        assert!(shared.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
        assert_eq!(store.sensor_count().unwrap(), 5);
    }

    #[test]
    fn test_poisoned_map_reported_by_every_accessor() {
        let store = Arc::new(HistoryStore::default());
        store.append(reading("a", 0)).unwrap();

        let poisoner = Arc::clone(&store);
        let _ = thread::spawn(move || {
            let _guard = poisoner.sensors.write().unwrap();
            panic!("writer died holding the sensor map");
        })
        .join();

        assert!(matches!(store.len("a"), Err(HistoryError::LockPoisoned(_))));
        assert!(matches!(store.sensor_count(), Err(HistoryError::LockPoisoned(_))));
        assert!(matches!(store.clear(), Err(HistoryError::LockPoisoned(_))));
        assert!(matches!(store.snapshot("a"), Err(HistoryError::LockPoisoned(_))));
    }

    #[test]
    fn test_clear() {
        let store = HistoryStore::default();
        store.extend((0..3).map(|i| reading(&format!("s{i}"), i))).unwrap();
        assert_eq!(store.len("s1").unwrap(), 1);

        store.clear().unwrap();
        assert_eq!(store.sensor_count().unwrap(), 0);
        assert_eq!(store.len("s1").unwrap(), 0);
    }
}
