// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Clock and formatting helpers for Western Indonesia Time.
//!
//! Every user-facing timestamp is rendered in a fixed +07:00 offset labeled
//! `WIB`. Stored instants are zone-less `YYYY-MM-DDTHH:MM:SS` strings that
//! are re-interpreted in the same offset on read-back, so no time-zone
//! database is required at runtime.

use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};

/// Seconds east of UTC for WIB (+07:00).
const WIB_OFFSET_SECS: i32 = 7 * 3600;

/// Unix timestamp of the OLE Automation epoch, 1899-12-30T00:00:00Z.
const OA_EPOCH_UNIX: i64 = -2_208_988_800 - 172_800;

/// Storage layout for instants kept in alert details.
pub const STORED_LAYOUT: &str = "%Y-%m-%dT%H:%M:%S";

/// Display layout for user-facing timestamps.
pub const DISPLAY_LAYOUT: &str = "%Y-%m-%d %H:%M:%S WIB";

/// The fixed +07:00 offset.
#[allow(clippy::unwrap_used)] // 7h is always within the ±24h range
pub fn wib() -> FixedOffset {
    FixedOffset::east_opt(WIB_OFFSET_SECS).unwrap()
}

/// Current wall time in WIB.
pub fn now_wib() -> DateTime<FixedOffset> {
    Utc::now().with_timezone(&wib())
}

/// Render an instant with the `WIB` suffix.
pub fn format_wib(instant: DateTime<FixedOffset>) -> String {
    instant.format(DISPLAY_LAYOUT).to_string()
}

/// Render a zone-less sample (already WIB wall time) with the `WIB` suffix.
pub fn format_naive(sample: NaiveDateTime) -> String {
    format!("{} WIB", sample.format("%Y-%m-%d %H:%M:%S"))
}

/// Interpret a stored `YYYY-MM-DDTHH:MM:SS` string as WIB wall time.
///
/// Lenient on trailing content: only the first 19 characters are parsed, so
/// historical values carrying an RFC 3339 offset suffix still round-trip.
pub fn parse_wib_timestamp(raw: &str) -> Option<DateTime<FixedOffset>> {
    let head = raw.get(..19)?;
    let naive = NaiveDateTime::parse_from_str(head, STORED_LAYOUT).ok()?;
    naive.and_local_timezone(wib()).single()
}

/// Attach the WIB offset to a zone-less wall time.
pub fn naive_to_wib(naive: NaiveDateTime) -> Option<DateTime<FixedOffset>> {
    naive.and_local_timezone(wib()).single()
}

/// Convert an OLE Automation date (float days since 1899-12-30 UTC) to an
/// instant. `None` only for values far outside the representable range.
pub fn oa_to_utc(days: f64) -> Option<DateTime<Utc>> {
    if !days.is_finite() {
        return None;
    }
    let secs = (days * 86_400.0).round();
    if secs.abs() > 1e15 {
        return None;
    }
    DateTime::from_timestamp(OA_EPOCH_UNIX + secs as i64, 0)
}

/// Convert a raw OLE date string from PRTG to a WIB display string.
///
/// `-` and empty input pass through as `-`; non-numeric input is returned
/// unchanged.
pub fn oa_to_wib(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "-" {
        return "-".to_owned();
    }
    let Ok(days) = trimmed.parse::<f64>() else {
        return raw.to_owned();
    };
    match oa_to_utc(days) {
        Some(instant) => format_wib(instant.with_timezone(&wib())),
        None => raw.to_owned(),
    }
}

/// Render the elapsed time since `start` as the coarsest non-zero unit,
/// pluralized. Negative or sub-second deltas clamp to "1 second".
pub fn format_duration_since(start: DateTime<FixedOffset>) -> String {
    format_duration_secs((now_wib() - start).num_seconds())
}

/// Unit table: seconds per minute, hour, day, month (≈30 d), year (≈365 d).
const UNITS: [(i64, &str); 5] = [
    (60, "second"),
    (3600, "minute"),
    (86_400, "hour"),
    (2_592_000, "day"),
    (31_536_000, "month"),
];

pub fn format_duration_secs(total: i64) -> String {
    let total = total.max(1);
    let mut prev_divisor = 1;
    for (bound, unit) in UNITS {
        if total < bound {
            return pluralize(total / prev_divisor, unit);
        }
        prev_divisor = bound;
    }
    pluralize(total / 31_536_000, "year")
}

fn pluralize(n: i64, unit: &str) -> String {
    if n == 1 {
        format!("1 {unit}")
    } else {
        format!("{n} {unit}s")
    }
}

#[cfg(test)]
#[path = "wib_tests.rs"]
mod tests;
