// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::HashMap;

use chrono::NaiveDate;

use super::*;
use crate::test_support::{temp_state, FailingSink, RecordingSink, SinkEvent};

fn ts(h: u32, m: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 6, 1).unwrap().and_hms_opt(h, m, 0).unwrap()
}

#[derive(Default, Clone)]
struct FakeSource {
    readings: Vec<SatnetReading>,
    counts: HashMap<String, TerminalCount>,
    first_below: HashMap<String, NaiveDateTime>,
    fail_readings: bool,
}

impl FakeSource {
    fn with_satnet(mut self, name: &str, fwd: f64, online: i64, offline: i64) -> Self {
        self.readings.push(SatnetReading {
            name: name.to_owned(),
            fwd_kbps: fwd,
            rtn_kbps: 1500.0,
            sample_time: ts(10, 0),
        });
        self.counts.insert(
            name.to_owned(),
            TerminalCount { online: Some(online), offline: Some(offline) },
        );
        self
    }

    fn with_start_issue(mut self, name: &str, at: NaiveDateTime) -> Self {
        self.first_below.insert(name.to_owned(), at);
        self
    }
}

impl SatnetSource for FakeSource {
    async fn latest_readings(&self) -> anyhow::Result<Vec<SatnetReading>> {
        if self.fail_readings {
            anyhow::bail!("connection refused");
        }
        Ok(self.readings.clone())
    }

    async fn terminal_counts(&self, satnet: &str) -> anyhow::Result<TerminalCount> {
        Ok(self.counts.get(satnet).copied().unwrap_or_default())
    }

    async fn first_below_threshold(
        &self,
        satnet: &str,
        _threshold_kbps: f64,
    ) -> anyhow::Result<Option<NaiveDateTime>> {
        Ok(self.first_below.get(satnet).copied())
    }
}

fn checker<S: SatnetSource>(
    source: S,
    sink: RecordingSink,
    state: std::sync::Arc<StateStore>,
) -> SatnetChecker<S, RecordingSink> {
    SatnetChecker::new(source, sink, state, Gateway::Jayapura)
}

#[tokio::test]
async fn down_then_up_lifecycle() {
    let (_dir, state) = temp_state();
    let sink = RecordingSink::new();

    let source = FakeSource::default()
        .with_satnet("J1", 500.0, 2, 5)
        .with_start_issue("J1", ts(9, 55));
    checker(source, sink.clone(), state.clone()).run().await;

    // One down report, one new state key.
    let events = sink.events();
    assert_eq!(events.len(), 1);
    match &events[0] {
        SinkEvent::SatnetDown { gateway, names } => {
            assert_eq!(gateway, "JAYAPURA");
            assert_eq!(names, &["J1".to_owned()]);
        }
        other => panic!("unexpected event: {other:?}"),
    }
    let stored = state.get("satnet_JAYAPURA_J1").unwrap();
    match stored.details {
        AlertDetails::Satnet(ref s) => {
            assert_eq!(s.start_issue.as_deref(), Some("2024-06-01T09:55:00"));
        }
        ref other => panic!("unexpected details: {other:?}"),
    }

    // Recovery tick: throughput healthy again.
    sink.clear();
    let source = FakeSource::default().with_satnet("J1", 2000.0, 2, 5);
    checker(source, sink.clone(), state.clone()).run().await;

    let events = sink.events();
    assert_eq!(events.len(), 1);
    match &events[0] {
        SinkEvent::SatnetUp { gateway, alerts } => {
            assert_eq!(gateway, "JAYAPURA");
            assert_eq!(alerts.len(), 1);
            assert_eq!(alerts[0].satnet, "J1");
            // time_down comes from the stored start_issue, in WIB.
            assert_eq!(
                alerts[0].time_down.to_rfc3339(),
                "2024-06-01T09:55:00+07:00"
            );
        }
        other => panic!("unexpected event: {other:?}"),
    }
    assert!(state.get("satnet_JAYAPURA_J1").is_none());
}

#[tokio::test]
async fn blast_radius_gate_suppresses_small_satnets() {
    let (_dir, state) = temp_state();
    let sink = RecordingSink::new();

    // fwd below threshold but only 3 terminals behind it.
    let source = FakeSource::default().with_satnet("J1", 500.0, 1, 2);
    checker(source, sink.clone(), state.clone()).run().await;

    assert!(sink.events().is_empty());
    assert!(state.snapshot().is_empty());
}

#[tokio::test]
async fn absent_counts_are_treated_as_zero() {
    let (_dir, state) = temp_state();
    let sink = RecordingSink::new();

    let source = FakeSource {
        readings: vec![SatnetReading {
            name: "J9".to_owned(),
            fwd_kbps: 100.0,
            rtn_kbps: 900.0,
            sample_time: ts(10, 0),
        }],
        ..Default::default()
    };
    checker(source, sink.clone(), state.clone()).run().await;

    assert!(sink.events().is_empty());
    assert!(state.snapshot().is_empty());
}

#[tokio::test]
async fn still_down_reemits_report_without_new_state() {
    let (_dir, state) = temp_state();
    let sink = RecordingSink::new();
    let source = FakeSource::default()
        .with_satnet("J1", 500.0, 2, 5)
        .with_start_issue("J1", ts(9, 55));

    checker(source.clone(), sink.clone(), state.clone()).run().await;
    checker(source, sink.clone(), state.clone()).run().await;

    // Two down reports (per-tick re-notification is intentional)...
    let down_count = sink
        .events()
        .iter()
        .filter(|e| matches!(e, SinkEvent::SatnetDown { .. }))
        .count();
    assert_eq!(down_count, 2);
    // ...but exactly one state entry, and no recovery.
    assert_eq!(state.snapshot().len(), 1);
    assert!(!sink.events().iter().any(|e| matches!(e, SinkEvent::SatnetUp { .. })));
}

#[tokio::test]
async fn db_error_aborts_tick_without_state_mutation() {
    let (_dir, state) = temp_state();
    let sink = RecordingSink::new();

    // Seed an open alert, then fail the read.
    let source = FakeSource::default().with_satnet("J1", 500.0, 2, 5);
    checker(source, sink.clone(), state.clone()).run().await;
    assert_eq!(state.snapshot().len(), 1);
    sink.clear();

    let source = FakeSource { fail_readings: true, ..Default::default() };
    checker(source, sink.clone(), state.clone()).run().await;

    // No events, and the open alert survived the failed tick.
    assert!(sink.events().is_empty());
    assert_eq!(state.snapshot().len(), 1);
}

#[tokio::test]
async fn unparseable_start_issue_falls_back_to_now() {
    let (_dir, state) = temp_state();
    state.put(
        "satnet_JAYAPURA_J1",
        ActiveAlert {
            details: AlertDetails::Satnet(SatnetState {
                name: "J1".to_owned(),
                fwd_kbps: 500.0,
                rtn_kbps: 900.0,
                start_issue: Some("garbage value here".to_owned()),
            }),
            gateway: "JAYAPURA".to_owned(),
        },
    );
    let sink = RecordingSink::new();
    let source = FakeSource::default().with_satnet("J1", 2000.0, 2, 5);

    let before = wib::now_wib();
    checker(source, sink.clone(), state.clone()).run().await;

    let events = sink.events();
    match &events[0] {
        SinkEvent::SatnetUp { alerts, .. } => {
            assert!(alerts[0].time_down >= before - chrono::Duration::seconds(5));
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn delivery_failure_still_updates_state() {
    let (_dir, state) = temp_state();
    let source = FakeSource::default().with_satnet("J1", 500.0, 2, 5);
    let checker = SatnetChecker::new(source, FailingSink, state.clone(), Gateway::Jayapura);
    checker.run().await;

    // At-most-once delivery: the report was lost, but the transition is
    // recorded so the next tick does not treat it as new.
    assert!(state.get("satnet_JAYAPURA_J1").is_some());
}

#[tokio::test]
async fn keys_of_other_gateways_are_untouched() {
    let (_dir, state) = temp_state();
    state.put(
        "satnet_TIMIKA_T1",
        ActiveAlert {
            details: AlertDetails::Satnet(SatnetState {
                name: "T1".to_owned(),
                fwd_kbps: 100.0,
                rtn_kbps: 100.0,
                start_issue: None,
            }),
            gateway: "TIMIKA".to_owned(),
        },
    );
    let sink = RecordingSink::new();
    // Jayapura checker sees nothing down; Timika's key must survive.
    checker(FakeSource::default(), sink.clone(), state.clone()).run().await;

    assert!(sink.events().is_empty());
    assert!(state.get("satnet_TIMIKA_T1").is_some());
}
