// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Top-level daemon wiring — shared by `main` and integration tests.

use std::sync::Arc;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::api::AuthClient;
use crate::config::{Config, DbFamilies};
use crate::db::Connections;
use crate::moddemod::{ModemChecker, PgModemSource};
use crate::notify::TelegramNotifier;
use crate::prtg::{PrtgChecker, PrtgClient, SensorType};
use crate::report::Gateway;
use crate::router::Router;
use crate::satnet::{PgSatnetSource, SatnetChecker};
use crate::sched::Scheduler;
use crate::state::StateStore;
use crate::telegram::TelegramClient;

/// Per-request timeout shared by every HTTP client in the process.
const HTTP_TIMEOUT_SECS: u64 = 60;

/// Install the stdout + JSON-file tracing subscriber. The returned guard
/// must stay alive for the process lifetime or buffered lines are lost.
pub fn init_tracing(
    config: &Config,
) -> anyhow::Result<tracing_appender::non_blocking::WorkerGuard> {
    std::fs::create_dir_all(&config.log_dir).context("create log directory")?;
    let appender = tracing_appender::rolling::never(&config.log_dir, "satwatch.log");
    let (file_writer, guard) = tracing_appender::non_blocking(appender);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::fmt::layer().json().with_writer(file_writer))
        .init();
    Ok(guard)
}

/// Build every component, register the checkers, and run until a shutdown
/// signal has been handled and in-flight work has drained.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let config = Arc::new(config);
    info!("starting satwatch");

    let state = Arc::new(
        StateStore::load(config.state_file(), config.state_reset_on_corrupt)
            .context("load alert state")?,
    );

    let http = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(HTTP_TIMEOUT_SECS))
        .build()
        .context("build http client")?;

    let tg = TelegramClient::new(http.clone(), &config.telegram_token);
    let notifier = TelegramNotifier::new(tg.clone(), config.telegram_chat_id.clone());

    let families = DbFamilies::from_env().context("load database configuration")?;
    let connections = Connections::connect(&families);

    let auth = Arc::new(AuthClient::new(
        http.clone(),
        config.g1k_url.clone(),
        config.api_email.clone(),
        config.api_password.clone(),
    ));

    let mut scheduler = Scheduler::new(&config.cron_schedule)?;
    let prtg = PrtgClient::new(http, config.prtg_url.clone(), config.prtg_api_token.clone());

    for gateway in Gateway::ALL {
        if let Some(pool) = connections.five(gateway) {
            let checker = Arc::new(SatnetChecker::new(
                PgSatnetSource::new(pool.clone()),
                notifier.clone(),
                Arc::clone(&state),
                gateway,
            ));
            scheduler.register(format!("satnet_{}", gateway.code()), move || {
                let checker = Arc::clone(&checker);
                async move { checker.run().await }
            });
        }
        if let Some(pool) = connections.one(gateway) {
            let checker = Arc::new(ModemChecker::new(
                PgModemSource::new(pool.clone()),
                notifier.clone(),
                Arc::clone(&state),
                gateway,
            ));
            scheduler.register(format!("moddemod_{}", gateway.code()), move || {
                let checker = Arc::clone(&checker);
                async move { checker.run().await }
            });
        }
        for sensor_type in [SensorType::Nif, SensorType::Iptx] {
            let sensor_id = match sensor_type {
                SensorType::Nif => config.nif_sensor(gateway),
                SensorType::Iptx => config.iptx_sensor(gateway),
            };
            let checker = Arc::new(PrtgChecker::new(
                prtg.clone(),
                notifier.clone(),
                Arc::clone(&state),
                gateway,
                sensor_type,
                sensor_id,
            ));
            scheduler.register(
                format!("prtg_{}_{}", sensor_type.as_str(), gateway.code()),
                move || {
                    let checker = Arc::clone(&checker);
                    async move { checker.run().await }
                },
            );
        }
    }
    info!(entries = scheduler.len(), schedule = %config.cron_schedule, "checkers registered");

    let shutdown = CancellationToken::new();
    let tracker = TaskTracker::new();
    scheduler.spawn(&tracker, shutdown.clone());

    let router = Arc::new(Router::new(tg, auth, state, Arc::clone(&config)));
    tracker.spawn(router.run(shutdown.clone()));

    spawn_signal_handler(shutdown.clone());

    shutdown.cancelled().await;
    info!("shutdown requested, draining in-flight work");
    tracker.close();
    tracker.wait().await;
    info!("shutdown complete");
    Ok(())
}

fn spawn_signal_handler(shutdown: CancellationToken) {
    tokio::spawn(async move {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()).ok();
        let mut sigint =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt()).ok();

        // First signal: graceful shutdown
        tokio::select! {
            _ = async {
                if let Some(ref mut s) = sigterm { s.recv().await } else { std::future::pending().await }
            } => {
                info!("received SIGTERM");
            }
            _ = async {
                if let Some(ref mut s) = sigint { s.recv().await } else { std::future::pending().await }
            } => {
                info!("received SIGINT");
            }
        }
        shutdown.cancel();

        // Second signal: force exit
        tokio::select! {
            _ = async {
                if let Some(ref mut s) = sigterm { s.recv().await } else { std::future::pending().await }
            } => {
                info!("received SIGTERM again, forcing exit");
            }
            _ = async {
                if let Some(ref mut s) = sigint { s.recv().await } else { std::future::pending().await }
            } => {
                info!("received SIGINT again, forcing exit");
            }
        }
        std::process::exit(130);
    });
}
