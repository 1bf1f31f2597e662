// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end alert lifecycle tests across simulated process restarts.
//!
//! Each "process" is a fresh `StateStore` loaded from the same backing file;
//! the checkers run against in-memory sources and a recording sink.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{NaiveDate, NaiveDateTime};

use satwatch::moddemod::{ModemChecker, ModemRow, ModemSource};
use satwatch::notify::EventSink;
use satwatch::report::{
    DeviceKind, Gateway, ModemDownAlert, ModemUpAlert, PrtgDownAlert, PrtgUpAlert, SatnetDetail,
    SatnetUpAlert,
};
use satwatch::satnet::{SatnetChecker, SatnetReading, SatnetSource, TerminalCount};
use satwatch::state::StateStore;

#[derive(Debug, Clone)]
enum Event {
    SatnetDown(Vec<String>),
    SatnetUp(Vec<SatnetUpAlert>),
    ModemDown(Vec<String>),
    ModemUp(Vec<ModemUpAlert>),
}

#[derive(Clone, Default)]
struct Sink {
    events: Arc<Mutex<Vec<Event>>>,
}

impl Sink {
    fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }
}

impl EventSink for Sink {
    async fn satnet_down(&self, _gateway: &str, down: &[SatnetDetail]) -> anyhow::Result<()> {
        let names = down.iter().map(|d| d.name.clone()).collect();
        self.events.lock().unwrap().push(Event::SatnetDown(names));
        Ok(())
    }

    async fn satnet_up(&self, _gateway: &str, recovered: &[SatnetUpAlert]) -> anyhow::Result<()> {
        self.events.lock().unwrap().push(Event::SatnetUp(recovered.to_vec()));
        Ok(())
    }

    async fn modem_down(&self, alerts: &[ModemDownAlert], _kind: DeviceKind) -> anyhow::Result<()> {
        let names = alerts.iter().map(|a| a.device_name.clone()).collect();
        self.events.lock().unwrap().push(Event::ModemDown(names));
        Ok(())
    }

    async fn modem_up(&self, alerts: &[ModemUpAlert], _kind: DeviceKind) -> anyhow::Result<()> {
        self.events.lock().unwrap().push(Event::ModemUp(alerts.to_vec()));
        Ok(())
    }

    async fn prtg_down(&self, _alert: &PrtgDownAlert) -> anyhow::Result<()> {
        Ok(())
    }

    async fn prtg_up(&self, _alert: &PrtgUpAlert) -> anyhow::Result<()> {
        Ok(())
    }
}

fn ts(h: u32, m: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(h, m, 0).unwrap()
}

#[derive(Default, Clone)]
struct Satnets {
    readings: Vec<SatnetReading>,
    start_issue: HashMap<String, NaiveDateTime>,
}

impl SatnetSource for Satnets {
    async fn latest_readings(&self) -> anyhow::Result<Vec<SatnetReading>> {
        Ok(self.readings.clone())
    }

    async fn terminal_counts(&self, _satnet: &str) -> anyhow::Result<TerminalCount> {
        Ok(TerminalCount { online: Some(2), offline: Some(5) })
    }

    async fn first_below_threshold(
        &self,
        satnet: &str,
        _threshold_kbps: f64,
    ) -> anyhow::Result<Option<NaiveDateTime>> {
        Ok(self.start_issue.get(satnet).copied())
    }
}

#[derive(Default, Clone)]
struct Modems {
    down: Vec<ModemRow>,
}

impl ModemSource for Modems {
    async fn down_devices(&self, kind: DeviceKind) -> anyhow::Result<Vec<ModemRow>> {
        Ok(match kind {
            DeviceKind::Modulator => self.down.clone(),
            DeviceKind::Demodulator => Vec::new(),
        })
    }
}

#[tokio::test]
async fn satnet_outage_survives_a_restart() {
    let dir = tempfile::tempdir().unwrap();
    let state_path = dir.path().join("active_alerts.json");

    // Process 1: J1 degraded.
    {
        let state = Arc::new(StateStore::load(&state_path, false).unwrap());
        let source = Satnets {
            readings: vec![SatnetReading {
                name: "J1".to_owned(),
                fwd_kbps: 500.0,
                rtn_kbps: 1400.0,
                sample_time: ts(10, 0),
            }],
            start_issue: [("J1".to_owned(), ts(9, 55))].into_iter().collect(),
        };
        let sink = Sink::default();
        SatnetChecker::new(source, sink.clone(), state, Gateway::Jayapura).run().await;
        assert!(matches!(sink.events().as_slice(), [Event::SatnetDown(names)] if names == &["J1"]));
    }

    // Process 2: fresh store from the same file; J1 healthy again.
    let state = Arc::new(StateStore::load(&state_path, false).unwrap());
    assert!(state.get("satnet_JAYAPURA_J1").is_some(), "alert must survive the restart");

    let source = Satnets {
        readings: vec![SatnetReading {
            name: "J1".to_owned(),
            fwd_kbps: 2000.0,
            rtn_kbps: 1400.0,
            sample_time: ts(11, 0),
        }],
        start_issue: HashMap::new(),
    };
    let sink = Sink::default();
    SatnetChecker::new(source, sink.clone(), Arc::clone(&state), Gateway::Jayapura).run().await;

    let events = sink.events();
    assert_eq!(events.len(), 1);
    match &events[0] {
        Event::SatnetUp(alerts) => {
            assert_eq!(alerts.len(), 1);
            assert_eq!(alerts[0].satnet, "J1");
            // The down-onset is the start_issue recorded before the restart.
            assert_eq!(alerts[0].time_down.to_rfc3339(), "2024-01-01T09:55:00+07:00");
        }
        other => panic!("unexpected event: {other:?}"),
    }
    assert!(state.snapshot().is_empty());
}

#[tokio::test]
async fn modem_recovery_after_restart_uses_stored_onset() {
    let dir = tempfile::tempdir().unwrap();
    let state_path = dir.path().join("active_alerts.json");

    {
        let state = Arc::new(StateStore::load(&state_path, false).unwrap());
        let source = Modems {
            down: vec![ModemRow {
                device_name: "MOD7".to_owned(),
                alarm_state: "critical".to_owned(),
                updated_at: ts(0, 0),
            }],
        };
        ModemChecker::new(source, Sink::default(), state, Gateway::Timika).run().await;
    }

    let state = Arc::new(StateStore::load(&state_path, false).unwrap());
    let sink = Sink::default();
    ModemChecker::new(Modems::default(), sink.clone(), Arc::clone(&state), Gateway::Timika)
        .run()
        .await;

    let ups: Vec<_> = sink
        .events()
        .into_iter()
        .filter_map(|e| match e {
            Event::ModemUp(alerts) => Some(alerts),
            _ => None,
        })
        .collect();
    assert_eq!(ups.len(), 1);
    assert_eq!(ups[0][0].device_name, "MOD7");
    assert_eq!(ups[0][0].time_down.to_rfc3339(), "2024-01-01T00:00:00+07:00");
    assert!(state.get("modulator_TIMIKA_MOD7").is_none());
}

#[tokio::test]
async fn checkers_of_different_kinds_share_the_store_without_contention() {
    let dir = tempfile::tempdir().unwrap();
    let state_path = dir.path().join("active_alerts.json");
    let state = Arc::new(StateStore::load(&state_path, false).unwrap());

    let satnets = Satnets {
        readings: vec![SatnetReading {
            name: "T1".to_owned(),
            fwd_kbps: 100.0,
            rtn_kbps: 100.0,
            sample_time: ts(10, 0),
        }],
        start_issue: HashMap::new(),
    };
    let modems = Modems {
        down: vec![ModemRow {
            device_name: "T1".to_owned(),
            alarm_state: "major".to_owned(),
            updated_at: ts(10, 0),
        }],
    };

    // Same local name under two kinds on the same gateway: disjoint keys.
    let satnet_checker =
        SatnetChecker::new(satnets, Sink::default(), Arc::clone(&state), Gateway::Timika);
    let modem_checker =
        ModemChecker::new(modems, Sink::default(), Arc::clone(&state), Gateway::Timika);
    tokio::join!(satnet_checker.run(), modem_checker.run());

    let snapshot = state.snapshot();
    assert!(snapshot.contains_key("satnet_TIMIKA_T1"));
    assert!(snapshot.contains_key("modulator_TIMIKA_T1"));
    assert_eq!(snapshot.len(), 2);
}
