// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lazy Postgres pools for the per-gateway telemetry stores.
//!
//! A family member without configuration simply has no pool and its checker
//! is never registered. Pools are built lazily so an unreachable database
//! costs failed ticks, not a failed startup.

use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use tracing::{info, warn};

use crate::config::{DbConfig, DbFamilies};
use crate::report::Gateway;

/// All configured telemetry pools, indexed by store family and gateway.
#[derive(Default)]
pub struct Connections {
    one: [Option<PgPool>; 3],
    five: [Option<PgPool>; 3],
}

impl Connections {
    /// Build pools for every configured family member.
    pub fn connect(families: &DbFamilies) -> Self {
        let mut conns = Self::default();
        for gateway in Gateway::ALL {
            let idx = gateway as usize;
            conns.one[idx] =
                families.one(gateway).and_then(|cfg| connect_one(cfg, "DB_ONE", gateway));
            conns.five[idx] =
                families.five(gateway).and_then(|cfg| connect_one(cfg, "DB_FIVE", gateway));
        }
        conns
    }

    /// Modem store (modulator/demodulator tables).
    pub fn one(&self, gateway: Gateway) -> Option<&PgPool> {
        self.one[gateway as usize].as_ref()
    }

    /// Satnet & terminal KPI store.
    pub fn five(&self, gateway: Gateway) -> Option<&PgPool> {
        self.five[gateway as usize].as_ref()
    }
}

fn connect_one(cfg: &DbConfig, family: &str, gateway: Gateway) -> Option<PgPool> {
    let port: u16 = match cfg.port.parse() {
        Ok(port) => port,
        Err(e) => {
            warn!(family, gateway = gateway.code(), port = %cfg.port, err = %e,
                "invalid database port, skipping connection");
            return None;
        }
    };
    let options = PgConnectOptions::new()
        .host(&cfg.host)
        .port(port)
        .username(&cfg.user)
        .password(&cfg.pass)
        .database(&cfg.name);
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(std::time::Duration::from_secs(30))
        .connect_lazy_with(options);
    info!(family, gateway = gateway.code(), host = %cfg.host, db = %cfg.name, "database pool ready");
    Some(pool)
}
