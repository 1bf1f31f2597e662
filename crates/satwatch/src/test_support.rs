// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test infrastructure: recording/failing event sinks and state
//! store fixtures used by the checker tests.

#![allow(clippy::unwrap_used)]

use std::sync::{Arc, Mutex};

use crate::notify::EventSink;
use crate::report::{
    DeviceKind, ModemDownAlert, ModemUpAlert, PrtgDownAlert, PrtgUpAlert, SatnetDetail,
    SatnetUpAlert,
};
use crate::state::StateStore;

/// Everything a checker handed to its sink, in call order.
#[derive(Debug, Clone)]
pub enum SinkEvent {
    SatnetDown { gateway: String, names: Vec<String> },
    SatnetUp { gateway: String, alerts: Vec<SatnetUpAlert> },
    ModemDown { kind: DeviceKind, devices: Vec<String> },
    ModemUp { kind: DeviceKind, alerts: Vec<ModemUpAlert> },
    PrtgDown(Box<PrtgDownAlert>),
    PrtgUp(Box<PrtgUpAlert>),
}

/// An [`EventSink`] that records events instead of delivering them.
/// Cloning shares the underlying event list.
#[derive(Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<SinkEvent>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SinkEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }

    fn push(&self, event: SinkEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl EventSink for RecordingSink {
    async fn satnet_down(&self, gateway: &str, down: &[SatnetDetail]) -> anyhow::Result<()> {
        self.push(SinkEvent::SatnetDown {
            gateway: gateway.to_owned(),
            names: down.iter().map(|d| d.name.clone()).collect(),
        });
        Ok(())
    }

    async fn satnet_up(&self, gateway: &str, recovered: &[SatnetUpAlert]) -> anyhow::Result<()> {
        self.push(SinkEvent::SatnetUp { gateway: gateway.to_owned(), alerts: recovered.to_vec() });
        Ok(())
    }

    async fn modem_down(&self, alerts: &[ModemDownAlert], kind: DeviceKind) -> anyhow::Result<()> {
        self.push(SinkEvent::ModemDown {
            kind,
            devices: alerts.iter().map(|a| a.device_name.clone()).collect(),
        });
        Ok(())
    }

    async fn modem_up(&self, alerts: &[ModemUpAlert], kind: DeviceKind) -> anyhow::Result<()> {
        self.push(SinkEvent::ModemUp { kind, alerts: alerts.to_vec() });
        Ok(())
    }

    async fn prtg_down(&self, alert: &PrtgDownAlert) -> anyhow::Result<()> {
        self.push(SinkEvent::PrtgDown(Box::new(alert.clone())));
        Ok(())
    }

    async fn prtg_up(&self, alert: &PrtgUpAlert) -> anyhow::Result<()> {
        self.push(SinkEvent::PrtgUp(Box::new(alert.clone())));
        Ok(())
    }
}

/// An [`EventSink`] whose every delivery fails, for at-most-once tests.
#[derive(Clone, Copy, Default)]
pub struct FailingSink;

impl EventSink for FailingSink {
    async fn satnet_down(&self, _: &str, _: &[SatnetDetail]) -> anyhow::Result<()> {
        anyhow::bail!("delivery refused")
    }

    async fn satnet_up(&self, _: &str, _: &[SatnetUpAlert]) -> anyhow::Result<()> {
        anyhow::bail!("delivery refused")
    }

    async fn modem_down(&self, _: &[ModemDownAlert], _: DeviceKind) -> anyhow::Result<()> {
        anyhow::bail!("delivery refused")
    }

    async fn modem_up(&self, _: &[ModemUpAlert], _: DeviceKind) -> anyhow::Result<()> {
        anyhow::bail!("delivery refused")
    }

    async fn prtg_down(&self, _: &PrtgDownAlert) -> anyhow::Result<()> {
        anyhow::bail!("delivery refused")
    }

    async fn prtg_up(&self, _: &PrtgUpAlert) -> anyhow::Result<()> {
        anyhow::bail!("delivery refused")
    }
}

/// Fresh state store backed by a temp directory. Keep the guard alive for
/// the duration of the test.
pub fn temp_state() -> (tempfile::TempDir, Arc<StateStore>) {
    let dir = tempfile::tempdir().unwrap();
    let store = StateStore::load(dir.path().join("active_alerts.json"), false).unwrap();
    (dir, Arc::new(store))
}
