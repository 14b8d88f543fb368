//! Feature Vector Schema

use serde::{Deserialize, Serialize};

/// Version of the field set and field meanings below
pub const SCHEMA_VERSION: u32 = 1;

/// Numeric fields in schema order (every field except `sensor_id`)
pub const FEATURE_NAMES: [&str; 43] = [
    "timestamp",
    "humidity",
    "temperature",
    "co2",
    "motion",
    "light",
    "avg_humidity_60m",
    "avg_humidity_120m",
    "avg_humidity_180m",
    "std_humidity",
    "avg_temperature",
    "max_temperature",
    "min_temperature",
    "std_temperature",
    "avg_co2_60m",
    "max_co2_60m",
    "min_co2_60m",
    "std_co2_60m",
    "residual_co2",
    "delta_5m_co2",
    "delta_30m_co2",
    "delta_60m_co2",
    "avg_motion",
    "max_motion",
    "std_motion",
    "count_motion_10m",
    "count_motion_30m",
    "recent_motion_10m",
    "light_level",
    "daylight_factor",
    "hour_of_day",
    "day_of_week",
    "is_weekend",
    "is_off_hours",
    "is_night",
    "season",
    "residual_co2_recent_motion",
    "rising_co2_recent_motion",
    "light_recent_motion",
    "temperature_humidity",
    "motion_off_hours",
    "light_on_at_night",
    "schema_version",
];

/// Fixed-schema features of one sensor at one evaluation instant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub sensor_id: String,
    pub timestamp: i64,

    // Direct values
    pub humidity: f64,
    pub temperature: f64,
    pub co2: f64,
    pub motion: f64,
    pub light: f64,

    // Humidity (60/120/180 min)
    pub avg_humidity_60m: f64,
    pub avg_humidity_120m: f64,
    pub avg_humidity_180m: f64,
    pub std_humidity: f64,

    // Temperature (60 min)
    pub avg_temperature: f64,
    pub max_temperature: f64,
    pub min_temperature: f64,
    pub std_temperature: f64,

    // CO2 (60 min)
    pub avg_co2_60m: f64,
    pub max_co2_60m: f64,
    pub min_co2_60m: f64,
    pub std_co2_60m: f64,
    /// co2 - avg_co2_60m
    pub residual_co2: f64,
    /// Per-minute change over nominal 5/30/60 min
    pub delta_5m_co2: f64,
    pub delta_30m_co2: f64,
    pub delta_60m_co2: f64,

    // Motion (30 min)
    pub avg_motion: f64,
    pub max_motion: f64,
    pub std_motion: f64,
    pub count_motion_10m: f64,
    pub count_motion_30m: f64,
    pub recent_motion_10m: u8,

    // Light
    pub light_level: u8,
    pub daylight_factor: f64,

    // Calendar
    pub hour_of_day: u8,
    pub day_of_week: u8,
    pub is_weekend: u8,
    pub is_off_hours: u8,
    pub is_night: u8,
    pub season: u8,

    // Cross-sensor
    pub residual_co2_recent_motion: f64,
    pub rising_co2_recent_motion: f64,
    pub light_recent_motion: f64,
    pub temperature_humidity: f64,
    pub motion_off_hours: f64,
    pub light_on_at_night: f64,

    pub schema_version: u32,
}

impl FeatureVector {
    /// Numeric values in `FEATURE_NAMES` order
    pub fn values(&self) -> [f64; 43] {
        [
            self.timestamp as f64,
            self.humidity,
            self.temperature,
            self.co2,
            self.motion,
            self.light,
            self.avg_humidity_60m,
            self.avg_humidity_120m,
            self.avg_humidity_180m,
            self.std_humidity,
            self.avg_temperature,
            self.max_temperature,
            self.min_temperature,
            self.std_temperature,
            self.avg_co2_60m,
            self.max_co2_60m,
            self.min_co2_60m,
            self.std_co2_60m,
            self.residual_co2,
            self.delta_5m_co2,
            self.delta_30m_co2,
            self.delta_60m_co2,
            self.avg_motion,
            self.max_motion,
            self.std_motion,
            self.count_motion_10m,
            self.count_motion_30m,
            f64::from(self.recent_motion_10m),
            f64::from(self.light_level),
            self.daylight_factor,
            f64::from(self.hour_of_day),
            f64::from(self.day_of_week),
            f64::from(self.is_weekend),
            f64::from(self.is_off_hours),
            f64::from(self.is_night),
            f64::from(self.season),
            self.residual_co2_recent_motion,
            self.rising_co2_recent_motion,
            self.light_recent_motion,
            self.temperature_humidity,
            self.motion_off_hours,
            self.light_on_at_night,
            f64::from(self.schema_version),
        ]
    }

    /// Name/value pairs of every numeric field, in schema order
    pub fn feature_map(&self) -> Vec<(&'static str, f64)> {
        FEATURE_NAMES.iter().copied().zip(self.values()).collect()
    }

    /// Look up one numeric field by name
    pub fn get(&self, name: &str) -> Option<f64> {
        FEATURE_NAMES
            .iter()
            .position(|&n| n == name)
            .map(|idx| self.values()[idx])
    }
}
