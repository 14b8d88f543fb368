//! Feature Extraction

use crate::calendar::CalendarFeatures;
use crate::features::{FeatureVector, SCHEMA_VERSION};
use crate::statistics::{count_motion, Measurement, WindowStats};
use crate::FeatureError;
use chrono_tz::Tz;
use sensor_history::{select_window, SensorHistory, SensorReading};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// Extraction configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExtractorConfig {
    /// Zone used for hour/day/season encodings
    pub timezone: Tz,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self { timezone: Tz::UTC }
    }
}

impl ExtractorConfig {
    pub fn with_timezone(timezone: Tz) -> Self {
        Self { timezone }
    }
}

/// Light bucket: 0 (<=500), 1 (<=1000), 2 (<=1500), 3 (>1500)
pub fn light_level(light: f64) -> u8 {
    if light <= 500.0 {
        0
    } else if light <= 1000.0 {
        1
    } else if light <= 1500.0 {
        2
    } else {
        3
    }
}

/// Fraction of full daylight (2000 lux), capped at 1.0
pub fn daylight_factor(light: f64) -> f64 {
    (light / 2000.0).min(1.0)
}

/// Per-minute CO2 change across a window, normalized by its nominal length
fn co2_delta(co2: f64, window: &[SensorReading], minutes: u32) -> f64 {
    match Measurement::Co2.values(window).next() {
        Some(start) => (co2 - start) / f64::from(minutes),
        None => 0.0,
    }
}

/// Trailing windows of one evaluation, all relative to the current reading
struct Windows<'a> {
    m5: &'a [SensorReading],
    m10: &'a [SensorReading],
    m30: &'a [SensorReading],
    m60: &'a [SensorReading],
    m120: &'a [SensorReading],
    m180: &'a [SensorReading],
}

impl<'a> Windows<'a> {
    fn select(history: &'a [SensorReading], reference: i64) -> Self {
        Self {
            m5: select_window(history, reference, 5),
            m10: select_window(history, reference, 10),
            m30: select_window(history, reference, 30),
            m60: select_window(history, reference, 60),
            m120: select_window(history, reference, 120),
            m180: select_window(history, reference, 180),
        }
    }
}

/// Builds feature vectors from ascending per-sensor reading series.
///
/// Stateless apart from its configuration; one extractor can serve many
/// threads.
#[derive(Debug, Clone, Default)]
pub struct FeatureExtractor {
    config: ExtractorConfig,
}

impl FeatureExtractor {
    pub fn new(config: ExtractorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Build the vector for `current` from its ascending `history`
    pub fn extract(
        &self,
        current: &SensorReading,
        history: &[SensorReading],
    ) -> Result<FeatureVector, FeatureError> {
        let w = Windows::select(history, current.timestamp);

        debug!(
            "Extracting features for {}: 5m={} 10m={} 30m={} 60m={} 120m={} 180m={}",
            current.sensor_id,
            w.m5.len(),
            w.m10.len(),
            w.m30.len(),
            w.m60.len(),
            w.m120.len(),
            w.m180.len()
        );

        // Direct values
        let humidity = Measurement::Humidity.current(current);
        let temperature = Measurement::Temperature.current(current);
        let co2 = Measurement::Co2.current(current);
        let motion = Measurement::Motion.current(current);
        let light = Measurement::Light.current(current);

        // Humidity
        let humidity_60 = WindowStats::of(Measurement::Humidity, w.m60);
        let humidity_120 = WindowStats::of(Measurement::Humidity, w.m120);
        let humidity_180 = WindowStats::of(Measurement::Humidity, w.m180);

        // Temperature
        let temperature_60 = WindowStats::of(Measurement::Temperature, w.m60);

        // CO2
        let co2_60 = WindowStats::of(Measurement::Co2, w.m60);
        let avg_co2_60m = co2_60.mean_or(co2);
        let residual_co2 = co2 - avg_co2_60m;
        let delta_5m_co2 = co2_delta(co2, w.m5, 5);
        let delta_30m_co2 = co2_delta(co2, w.m30, 30);
        let delta_60m_co2 = co2_delta(co2, w.m60, 60);

        // Motion
        let motion_30 = WindowStats::of(Measurement::Motion, w.m30);
        let count_motion_10m = count_motion(w.m10) as f64;
        let count_motion_30m = count_motion(w.m30) as f64;
        let recent_motion_10m = u8::from(count_motion_10m > 0.0);

        let calendar = CalendarFeatures::from_timestamp(current.timestamp, self.config.timezone)?;

        // Cross-sensor interactions
        let recent = f64::from(recent_motion_10m);
        let light_on = if light > 50.0 { 1.0 } else { 0.0 };

        Ok(FeatureVector {
            sensor_id: current.sensor_id.clone(),
            timestamp: current.timestamp,
            humidity,
            temperature,
            co2,
            motion,
            light,
            avg_humidity_60m: humidity_60.mean_or(humidity),
            avg_humidity_120m: humidity_120.mean_or(humidity),
            avg_humidity_180m: humidity_180.mean_or(humidity),
            std_humidity: humidity_180.std_dev,
            avg_temperature: temperature_60.mean_or(temperature),
            max_temperature: temperature_60.max_or(temperature),
            min_temperature: temperature_60.min_or(temperature),
            std_temperature: temperature_60.std_dev,
            avg_co2_60m,
            max_co2_60m: co2_60.max_or(co2),
            min_co2_60m: co2_60.min_or(co2),
            std_co2_60m: co2_60.std_dev,
            residual_co2,
            delta_5m_co2,
            delta_30m_co2,
            delta_60m_co2,
            avg_motion: motion_30.mean_or(motion),
            max_motion: motion_30.max_or(motion),
            std_motion: motion_30.std_dev,
            count_motion_10m,
            count_motion_30m,
            recent_motion_10m,
            light_level: light_level(light),
            daylight_factor: daylight_factor(light),
            hour_of_day: calendar.hour_of_day,
            day_of_week: calendar.day_of_week,
            is_weekend: calendar.is_weekend,
            is_off_hours: calendar.is_off_hours,
            is_night: calendar.is_night,
            season: calendar.season,
            residual_co2_recent_motion: residual_co2 * recent,
            rising_co2_recent_motion: delta_5m_co2 * recent,
            light_recent_motion: light * recent,
            temperature_humidity: temperature * humidity,
            motion_off_hours: motion * f64::from(calendar.is_off_hours),
            light_on_at_night: light_on * f64::from(calendar.is_night),
            schema_version: SCHEMA_VERSION,
        })
    }

    /// Vector for the last reading of an ascending series
    pub fn extract_series(
        &self,
        series: &[SensorReading],
    ) -> Result<Option<FeatureVector>, FeatureError> {
        match series.last() {
            Some(current) => self.extract(current, series).map(Some),
            None => Ok(None),
        }
    }

    /// Vector for the newest reading of a bounded history
    pub fn extract_history(
        &self,
        history: &SensorHistory,
    ) -> Result<Option<FeatureVector>, FeatureError> {
        self.extract_series(history.as_slice())
    }

    /// One vector per sensor of an unordered multi-sensor batch.
    ///
    /// Sensors appear in first-seen order; each group is stably sorted by
    /// timestamp and its last reading is the current one.
    pub fn extract_batch(
        &self,
        readings: &[SensorReading],
    ) -> Result<Vec<FeatureVector>, FeatureError> {
        let groups = group_by_sensor(readings);
        let mut vectors = Vec::with_capacity(groups.len());

        for series in groups {
            if let Some(vector) = self.extract_series(&series)? {
                vectors.push(vector);
            }
        }

        debug!(
            "Extracted {} feature vectors from {} readings",
            vectors.len(),
            readings.len()
        );
        Ok(vectors)
    }
}

/// Split readings by sensor (first-seen order), each group sorted ascending
pub fn group_by_sensor(readings: &[SensorReading]) -> Vec<Vec<SensorReading>> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<Vec<SensorReading>> = Vec::new();

    for reading in readings {
        let slot = *index.entry(reading.sensor_id.as_str()).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[slot].push(reading.clone());
    }

    for group in &mut groups {
        group.sort_by_key(|r| r.timestamp);
    }
    groups
}

/// Most recent raw reading per sensor, in first-seen order
pub fn latest_readings(readings: &[SensorReading]) -> Vec<SensorReading> {
    group_by_sensor(readings)
        .into_iter()
        .filter_map(|mut group| group.pop())
        .collect()
}
