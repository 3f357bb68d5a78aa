//! Time types shared by ingestion, storage and the query endpoints

use chrono::{DateTime as ChronoDateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Database DateTime type used across all RUM crates
///
/// This is the canonical datetime type for TIMESTAMPTZ columns such as
/// `event_timestamp` and `created_at`.
pub type DBDateTime = ChronoDateTime<Utc>;

/// Standard UTC DateTime type used across all RUM crates
///
/// Serializes as ISO 8601 with offset (`2025-10-12T12:15:47.609+00:00`).
///
/// # OpenAPI Schema
/// When using with utoipa, add the schema attribute:
/// ```rust,ignore
/// #[schema(value_type = String, format = DateTime)]
/// pub field: UtcDateTime,
/// ```
pub type UtcDateTime = ChronoDateTime<Utc>;

/// Earliest storable instant, `0000-01-01T00:00:00Z`
pub const MIN_STORABLE_MILLIS: i64 = -62_167_219_200_000;

/// Latest storable instant, `9999-12-31T23:59:59.999Z`
///
/// Text-backed stores (SQLite) only order timestamps correctly while the year
/// keeps four digits.
pub const MAX_STORABLE_MILLIS: i64 = 253_402_300_799_999;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Timestamp {0} ms is outside the storable range (years 0 to 9999)")]
pub struct TimestampOutOfRange(pub i64);

/// Convert a client epoch-millisecond clock value into the storage time type.
///
/// Browsers report `Date.now()` values; this is the only place those are turned
/// into `UtcDateTime`.
pub fn from_epoch_millis(millis: i64) -> Result<UtcDateTime, TimestampOutOfRange> {
    if !(MIN_STORABLE_MILLIS..=MAX_STORABLE_MILLIS).contains(&millis) {
        return Err(TimestampOutOfRange(millis));
    }
    ChronoDateTime::<Utc>::from_timestamp_millis(millis).ok_or(TimestampOutOfRange(millis))
}

/// Inclusive time window expressed in epoch milliseconds on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EpochRange {
    /// Window start, epoch milliseconds (inclusive)
    pub start_ms: i64,
    /// Window end, epoch milliseconds (inclusive)
    pub end_ms: i64,
}

/// Inclusive time window in storage time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: UtcDateTime,
    pub end: UtcDateTime,
}

impl TimeRange {
    pub fn new(start: UtcDateTime, end: UtcDateTime) -> Self {
        Self { start, end }
    }
}

impl TryFrom<EpochRange> for TimeRange {
    type Error = TimestampOutOfRange;

    fn try_from(range: EpochRange) -> Result<Self, Self::Error> {
        Ok(TimeRange::new(
            from_epoch_millis(range.start_ms)?,
            from_epoch_millis(range.end_ms)?,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, TimeZone, Timelike};

    #[test]
    fn test_from_epoch_millis_keeps_millisecond_precision() {
        let dt = from_epoch_millis(1_705_329_000_123).unwrap();
        assert_eq!(dt.year(), 2024);
        assert_eq!(dt.month(), 1);
        assert_eq!(dt.day(), 15);
        assert_eq!(dt.hour(), 14);
        assert_eq!(dt.minute(), 30);
        assert_eq!(dt.timestamp_subsec_millis(), 123);
    }

    #[test]
    fn test_from_epoch_millis_rejects_out_of_range() {
        let result = from_epoch_millis(i64::MAX);
        assert_eq!(result, Err(TimestampOutOfRange(i64::MAX)));
    }

    #[test]
    fn test_from_epoch_millis_stops_at_year_9999() {
        let last = from_epoch_millis(MAX_STORABLE_MILLIS).unwrap();
        assert_eq!(last.year(), 9999);
        assert_eq!(last.timestamp_subsec_millis(), 999);

        assert_eq!(
            from_epoch_millis(MAX_STORABLE_MILLIS + 1),
            Err(TimestampOutOfRange(MAX_STORABLE_MILLIS + 1))
        );
        assert_eq!(from_epoch_millis(MIN_STORABLE_MILLIS).unwrap().year(), 0);
        assert!(from_epoch_millis(MIN_STORABLE_MILLIS - 1).is_err());
    }

    #[test]
    fn test_epoch_range_deserializes_camel_case() {
        let range: EpochRange = serde_json::from_str(r#"{"startMs":0,"endMs":1000}"#).unwrap();
        assert_eq!(range.start_ms, 0);
        assert_eq!(range.end_ms, 1000);
    }

    #[test]
    fn test_time_range_keeps_bounds() {
        let range = TimeRange::try_from(EpochRange {
            start_ms: 1000,
            end_ms: 2000,
        })
        .unwrap();

        assert_eq!(range.start, Utc.timestamp_millis_opt(1000).unwrap());
        assert_eq!(range.end, Utc.timestamp_millis_opt(2000).unwrap());
    }

    #[test]
    fn test_time_range_rejects_end_past_year_9999() {
        let last_storable = TimeRange::try_from(EpochRange {
            start_ms: 0,
            end_ms: MAX_STORABLE_MILLIS,
        });
        assert!(last_storable.is_ok());

        let result = TimeRange::try_from(EpochRange {
            start_ms: 0,
            end_ms: 1_000_000_000_000_000,
        });
        assert_eq!(result, Err(TimestampOutOfRange(1_000_000_000_000_000)));
    }
}
