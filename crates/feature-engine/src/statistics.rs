//! Window Statistics

use sensor_history::SensorReading;

/// Measured quantity of a sensor reading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Measurement {
    Humidity,
    Temperature,
    Co2,
    Motion,
    Light,
}

impl Measurement {
    /// Raw value of this measurement, if present
    pub fn get(self, reading: &SensorReading) -> Option<f64> {
        match self {
            Measurement::Humidity => reading.humidity,
            Measurement::Temperature => reading.temperature,
            Measurement::Co2 => reading.co2,
            Measurement::Motion => reading.motion,
            Measurement::Light => reading.light,
        }
    }

    /// Value used as a scalar "current value" (absent is 0.0)
    pub fn current(self, reading: &SensorReading) -> f64 {
        self.get(reading).unwrap_or(0.0)
    }

    /// Present values in window order; absent and NaN values are skipped
    pub fn values(self, readings: &[SensorReading]) -> impl Iterator<Item = f64> + Clone + '_ {
        readings
            .iter()
            .filter_map(move |r| self.get(r))
            .filter(|v| !v.is_nan())
    }
}

/// Summary statistics over the numeric values of one window
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WindowStats {
    /// Number of numeric values
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation (0.0 below two values)
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
}

impl WindowStats {
    /// Compute statistics with a two-pass mean/variance
    pub fn compute<I>(values: I) -> Self
    where
        I: IntoIterator<Item = f64>,
        I::IntoIter: Clone,
    {
        let values = values.into_iter();

        let mut count = 0usize;
        let mut sum = 0.0;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for v in values.clone() {
            count += 1;
            sum += v;
            min = min.min(v);
            max = max.max(v);
        }

        if count == 0 {
            return Self::default();
        }

        let mean = sum / count as f64;
        let std_dev = if count >= 2 {
            let m2: f64 = values.map(|v| (v - mean) * (v - mean)).sum();
            (m2 / (count - 1) as f64).sqrt()
        } else {
            0.0
        };

        Self {
            count,
            mean,
            std_dev,
            min,
            max,
        }
    }

    /// Statistics of one measurement over a window
    pub fn of(measurement: Measurement, readings: &[SensorReading]) -> Self {
        Self::compute(measurement.values(readings))
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Mean, or `fallback` when the window has no values
    pub fn mean_or(&self, fallback: f64) -> f64 {
        if self.is_empty() {
            fallback
        } else {
            self.mean
        }
    }

    pub fn max_or(&self, fallback: f64) -> f64 {
        if self.is_empty() {
            fallback
        } else {
            self.max
        }
    }

    pub fn min_or(&self, fallback: f64) -> f64 {
        if self.is_empty() {
            fallback
        } else {
            self.min
        }
    }
}

/// Number of readings whose motion value is strictly positive
pub fn count_motion(readings: &[SensorReading]) -> usize {
    Measurement::Motion
        .values(readings)
        .filter(|&m| m > 0.0)
        .count()
}
