//! Active-schedule date resolution.
//!
//! Duty rosters rotate at a fixed local cutoff time rather than calendar
//! midnight: the roster published for a given date stays active until the
//! next morning's handover. This module maps wall-clock time, observed in
//! a fixed UTC offset, to the `DD/MM/YYYY` key the active roster is
//! stored under, and validates externally supplied keys.

use std::sync::OnceLock;

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, Utc};
use regex::Regex;
use thiserror::Error;

/// Default UTC offset of the schedule's reference wall clock, in hours.
pub const DEFAULT_UTC_OFFSET_HOURS: i32 = 3;
/// Default daily cutoff hour (local to the offset).
pub const DEFAULT_CUTOFF_HOUR: u32 = 8;
/// Default daily cutoff minute.
pub const DEFAULT_CUTOFF_MINUTE: u32 = 30;

/// Key format stored and exchanged over the API.
const KEY_FORMAT: &str = "%d/%m/%Y";

/// Errors constructing a schedule configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ScheduleError {
    /// UTC offset outside the representable range.
    #[error("invalid UTC offset: {0} hours")]
    InvalidOffset(i32),

    /// Cutoff time is not a valid time of day.
    #[error("invalid cutoff time: {0:02}:{1:02}")]
    InvalidCutoff(u32, u32),
}

/// Schedule rotation parameters.
///
/// Validated at construction; the default is the production schedule
/// (UTC+3, 08:30 handover).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleConfig {
    offset: FixedOffset,
    cutoff: NaiveTime,
}

impl ScheduleConfig {
    /// Create a configuration from an hour offset and cutoff time.
    ///
    /// # Errors
    ///
    /// Returns `ScheduleError` if the offset does not fit in a day or the
    /// cutoff is not a valid time of day.
    pub fn new(
        utc_offset_hours: i32,
        cutoff_hour: u32,
        cutoff_minute: u32,
    ) -> Result<Self, ScheduleError> {
        let offset = FixedOffset::east_opt(utc_offset_hours.saturating_mul(3600))
            .ok_or(ScheduleError::InvalidOffset(utc_offset_hours))?;
        let cutoff = NaiveTime::from_hms_opt(cutoff_hour, cutoff_minute, 0)
            .ok_or(ScheduleError::InvalidCutoff(cutoff_hour, cutoff_minute))?;
        Ok(Self { offset, cutoff })
    }

    /// The configured cutoff time of day.
    pub fn cutoff(&self) -> NaiveTime {
        self.cutoff
    }

    /// The configured wall-clock offset.
    pub fn offset(&self) -> FixedOffset {
        self.offset
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        // Constants are in range; construction cannot fail.
        Self::new(
            DEFAULT_UTC_OFFSET_HOURS,
            DEFAULT_CUTOFF_HOUR,
            DEFAULT_CUTOFF_MINUTE,
        )
        .expect("default schedule configuration is valid")
    }
}

/// Resolve the key of the roster active at `now`.
///
/// The instant is shifted into the configured offset; before the daily
/// cutoff the previous day's roster is still active, from the cutoff
/// onward the current day's is.
pub fn resolve_active_key(now: DateTime<Utc>, config: &ScheduleConfig) -> String {
    let local = now.with_timezone(&config.offset);
    let today = local.date_naive();
    let cutoff = today.and_time(config.cutoff);

    let target = if local.naive_local() < cutoff {
        today - Duration::days(1)
    } else {
        today
    };

    target.format(KEY_FORMAT).to_string()
}

/// Resolve the key of the roster active right now.
pub fn current_active_key(config: &ScheduleConfig) -> String {
    resolve_active_key(Utc::now(), config)
}

/// Strict shape of a schedule key: two digits, two digits, four digits.
fn key_shape() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\d{2}/\d{2}/\d{4}$").unwrap())
}

/// Validate an externally supplied schedule key.
///
/// Accepts only strict `DD/MM/YYYY` with a calendar-valid date: the
/// parsed date must format back to the identical string, which rejects
/// impossible dates like `31/02/2024` as well as unpadded components.
pub fn is_valid_key_format(key: &str) -> bool {
    if !key_shape().is_match(key) {
        return false;
    }

    match NaiveDate::parse_from_str(key, KEY_FORMAT) {
        Ok(date) => date.format(KEY_FORMAT).to_string() == key,
        Err(_) => false,
    }
}
