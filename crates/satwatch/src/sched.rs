// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cron-driven checker scheduling.
//!
//! One schedule expression applies to every registration. Each registration
//! runs in its own task that sleeps until the next fire time and then awaits
//! the invocation to completion, so invocations of the same entry can never
//! overlap. Shutdown cancellation is only observed between invocations:
//! in-flight work always finishes.
//!
//! Expressions use the 6/7-field form with a leading seconds column, e.g.
//! `0 */5 * * * *` for every five minutes.

use std::future::Future;
use std::str::FromStr;

use anyhow::Context;
use chrono::Utc;
use futures_util::future::BoxFuture;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info};

type Job = Box<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

struct Entry {
    name: String,
    job: Job,
}

/// Registration list bound to a single cron expression.
pub struct Scheduler {
    schedule: cron::Schedule,
    entries: Vec<Entry>,
}

impl Scheduler {
    pub fn new(expression: &str) -> anyhow::Result<Self> {
        let schedule = cron::Schedule::from_str(expression)
            .with_context(|| format!("invalid cron expression {expression:?}"))?;
        Ok(Self { schedule, entries: Vec::new() })
    }

    /// Register one independent invocation stream.
    pub fn register<F, Fut>(&mut self, name: impl Into<String>, job: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.entries.push(Entry { name: name.into(), job: Box::new(move || Box::pin(job())) });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Spawn one task per entry onto `tracker`. Cancelling `shutdown` stops
    /// new invocations; `tracker.wait()` then drains in-flight ones.
    pub fn spawn(self, tracker: &TaskTracker, shutdown: CancellationToken) {
        let Self { schedule, entries } = self;
        info!(entries = entries.len(), "scheduler starting");
        for entry in entries {
            let schedule = schedule.clone();
            let shutdown = shutdown.clone();
            tracker.spawn(async move {
                loop {
                    let Some(next) = schedule.upcoming(Utc).next() else {
                        break;
                    };
                    let delay = (next - Utc::now()).to_std().unwrap_or_default();
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {
                            debug!(entry = %entry.name, "checker invocation starting");
                            (entry.job)().await;
                        }
                        _ = shutdown.cancelled() => {
                            debug!(entry = %entry.name, "scheduler entry stopping");
                            break;
                        }
                    }
                }
            });
        }
    }
}

#[cfg(test)]
#[path = "sched_tests.rs"]
mod tests;
