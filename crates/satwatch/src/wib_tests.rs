// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use chrono::{Datelike, Timelike};
use super::*;

#[test]
fn wib_is_seven_hours_east() {
    assert_eq!(wib().local_minus_utc(), 7 * 3600);
}

#[test]
fn parse_stored_timestamp_round_trips() {
    let parsed = parse_wib_timestamp("2024-01-01T00:00:00").unwrap();
    assert_eq!(parsed.year(), 2024);
    assert_eq!(parsed.hour(), 0);
    assert_eq!(parsed.offset().local_minus_utc(), 7 * 3600);
    // Same wall time, expressed in UTC, is seven hours earlier.
    assert_eq!(parsed.to_utc().hour(), 17);
    assert_eq!(parsed.to_utc().day(), 31);
}

#[test]
fn parse_tolerates_rfc3339_suffix() {
    // Historical state files stored RFC 3339 values; only the wall-time
    // head is significant.
    let parsed = parse_wib_timestamp("2024-06-15T08:30:00+07:00").unwrap();
    assert_eq!((parsed.hour(), parsed.minute()), (8, 30));
}

#[yare::parameterized(
    empty = { "" },
    short = { "2024-01-01" },
    garbage = { "not a timestamp long enough" },
)]
fn parse_rejects_malformed(raw: &str) {
    assert!(parse_wib_timestamp(raw).is_none());
}

#[test]
fn oa_epoch_is_1899_12_30() {
    let epoch = oa_to_utc(0.0).unwrap();
    assert_eq!(epoch.to_rfc3339(), "1899-12-30T00:00:00+00:00");
}

#[test]
fn oa_one_day_later() {
    let next = oa_to_utc(1.0).unwrap();
    assert_eq!(next.to_rfc3339(), "1899-12-31T00:00:00+00:00");
}

#[test]
fn oa_fractional_day() {
    let noon = oa_to_utc(0.5).unwrap();
    assert_eq!(noon.hour(), 12);
}

#[yare::parameterized(
    dash = { "-", "-" },
    empty = { "", "-" },
    padded_dash = { "  -  ", "-" },
)]
fn oa_string_passthrough_markers(raw: &str, expected: &str) {
    assert_eq!(oa_to_wib(raw), expected);
}

#[test]
fn oa_string_non_numeric_returned_unchanged() {
    assert_eq!(oa_to_wib("no such date"), "no such date");
}

#[test]
fn oa_string_renders_wib() {
    // Day zero in UTC is 07:00 in WIB.
    assert_eq!(oa_to_wib("0"), "1899-12-30 07:00:00 WIB");
}

#[yare::parameterized(
    one_second = { 1, "1 second" },
    under_a_minute = { 59, "59 seconds" },
    one_minute = { 60, "1 minute" },
    minutes = { 150, "2 minutes" },
    one_hour = { 3600, "1 hour" },
    hours = { 7250, "2 hours" },
    one_day = { 86_400, "1 day" },
    days = { 200_000, "2 days" },
    one_month = { 2_592_000, "1 month" },
    months = { 6_000_000, "2 months" },
    one_year = { 31_536_000, "1 year" },
    years = { 70_000_000, "2 years" },
)]
fn duration_coarsest_unit(secs: i64, expected: &str) {
    assert_eq!(format_duration_secs(secs), expected);
}

#[yare::parameterized(
    zero = { 0 },
    negative = { -42 },
)]
fn duration_clamps_to_one_second(secs: i64) {
    assert_eq!(format_duration_secs(secs), "1 second");
}

#[test]
fn duration_since_recent_instant() {
    // 90 s back lands mid-band, so scheduling slack cannot change the unit.
    let recent = now_wib() - chrono::Duration::seconds(90);
    assert_eq!(format_duration_since(recent), "1 minute");
}

#[test]
fn duration_since_future_instant_clamps() {
    let future = now_wib() + chrono::Duration::seconds(30);
    assert_eq!(format_duration_since(future), "1 second");
}

#[test]
fn display_layout_carries_wib_suffix() {
    let rendered = format_wib(now_wib());
    assert!(rendered.ends_with(" WIB"));
}
