//! Calendar and Time-of-Day Encodings

use crate::FeatureError;
use chrono::{DateTime, Datelike, Timelike};
use chrono_tz::Tz;

/// Meteorological season
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Season {
    Spring = 0,
    Summer = 1,
    Autumn = 2,
    Winter = 3,
}

impl Season {
    /// Season of a calendar month (1-12)
    pub fn from_month(month: u32) -> Self {
        match month {
            3..=5 => Season::Spring,
            6..=8 => Season::Summer,
            9..=11 => Season::Autumn,
            _ => Season::Winter,
        }
    }

    pub fn code(self) -> u8 {
        self as u8
    }
}

/// Calendar features of one instant in a fixed time zone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarFeatures {
    pub hour_of_day: u8,
    /// 0 = Monday
    pub day_of_week: u8,
    pub is_weekend: u8,
    pub is_off_hours: u8,
    pub is_night: u8,
    pub season: u8,
}

impl CalendarFeatures {
    /// Encode an epoch-seconds timestamp as seen in `tz`
    pub fn from_timestamp(timestamp: i64, tz: Tz) -> Result<Self, FeatureError> {
        let utc = DateTime::from_timestamp(timestamp, 0)
            .ok_or(FeatureError::InvalidTimestamp(timestamp))?;
        let local = utc.with_timezone(&tz);

        let hour = local.hour();
        let day = local.weekday().num_days_from_monday();

        Ok(Self {
            hour_of_day: hour as u8,
            day_of_week: day as u8,
            is_weekend: u8::from(day >= 5),
            is_off_hours: u8::from(hour < 7 || hour >= 19),
            is_night: u8::from(hour < 6 || hour >= 22),
            season: Season::from_month(local.month()).code(),
        })
    }
}
