// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared domain types: gateways, device kinds, and the typed alert
//! records exchanged between checkers and the notifier.

use chrono::{DateTime, FixedOffset, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// One of the three satellite ground stations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gateway {
    Jayapura,
    Manokwari,
    Timika,
}

impl Gateway {
    pub const ALL: [Gateway; 3] = [Gateway::Jayapura, Gateway::Manokwari, Gateway::Timika];

    /// Upper-case display name used in alert messages and state keys.
    pub fn friendly(&self) -> &'static str {
        match self {
            Self::Jayapura => "JAYAPURA",
            Self::Manokwari => "MANOKWARI",
            Self::Timika => "TIMIKA",
        }
    }

    /// Three-letter site code used in env var names and bot commands.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Jayapura => "JYP",
            Self::Manokwari => "MNK",
            Self::Timika => "TMK",
        }
    }

    /// Title-case name used in bot replies and API query parameters.
    pub fn title(&self) -> &'static str {
        match self {
            Self::Jayapura => "Jayapura",
            Self::Manokwari => "Manokwari",
            Self::Timika => "Timika",
        }
    }
}

/// RF device family checked against DB-ONE.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    Modulator,
    Demodulator,
}

impl DeviceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Modulator => "modulator",
            Self::Demodulator => "demodulator",
        }
    }

    /// Upper-case label for message titles.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Modulator => "MODULATOR",
            Self::Demodulator => "DEMODULATOR",
        }
    }
}

/// One currently-degraded satnet, as rendered in a down report.
#[derive(Debug, Clone, PartialEq)]
pub struct SatnetDetail {
    pub name: String,
    pub fwd_kbps: f64,
    pub rtn_kbps: f64,
    pub sample_time: NaiveDateTime,
    pub online: Option<i64>,
    pub offline: Option<i64>,
    /// First sub-threshold sample after the most recent healthy one.
    /// Absent when the queried window has no healthy sample.
    pub start_issue: Option<NaiveDateTime>,
}

/// A satnet that left the down set.
#[derive(Debug, Clone, PartialEq)]
pub struct SatnetUpAlert {
    pub gateway: String,
    pub satnet: String,
    pub recovery_time: DateTime<FixedOffset>,
    pub time_down: DateTime<FixedOffset>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModemDownAlert {
    pub gateway: String,
    pub device_name: String,
    pub alarm_state: String,
    pub start_time: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModemUpAlert {
    pub gateway: String,
    pub device_name: String,
    pub recovery_time: DateTime<FixedOffset>,
    pub time_down: DateTime<FixedOffset>,
}

/// PRTG down record. Also persisted verbatim as the alert detail payload,
/// hence the serde derives and stable snake_case keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrtgDownAlert {
    pub location: String,
    pub sensor_full_name: String,
    pub device_name: String,
    pub sensor_type: String,
    pub value: String,
    pub status: String,
    #[serde(default)]
    pub last_message: String,
    #[serde(default)]
    pub last_check: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub last_down: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub last_up: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PrtgUpAlert {
    pub location: String,
    pub sensor_full_name: String,
    pub device_name: String,
    pub sensor_type: String,
    pub recovery_time: DateTime<FixedOffset>,
}
