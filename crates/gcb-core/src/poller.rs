//! Periodic trigger for the pipeline.
//!
//! - Runs one cycle per tick of a fixed interval, the first one immediately
//! - Cycles never overlap: timer ticks and manual `run_once` calls share a lock
//! - Shutdown only interrupts the wait between cycles, never a running cycle

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Local, Timelike};
use tokio::{
    sync::Mutex,
    task::JoinHandle,
    time::{interval, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::{
    formatting::escape_html,
    pipeline::{CycleOutcome, CycleReport, Pipeline},
};

#[derive(Clone)]
pub struct Poller {
    inner: Arc<PollerInner>,
}

struct PollerInner {
    pipeline: Pipeline,
    period: Duration,
    cycle_lock: Mutex<()>,
    state: Mutex<PollerState>,
}

#[derive(Default)]
struct PollerState {
    task: Option<JoinHandle<()>>,
    cancel: Option<CancellationToken>,
    last_report: Option<CycleReport>,
    next_tick_at: Option<DateTime<Local>>,
    cycles: u64,
}

/// Point-in-time view of the poller.
#[derive(Clone, Debug)]
pub struct PollerStatus {
    pub running: bool,
    pub period: Duration,
    pub cycles: u64,
    pub last_report: Option<CycleReport>,
    pub next_tick_at: Option<DateTime<Local>>,
}

impl Poller {
    pub fn new(pipeline: Pipeline, period: Duration) -> Self {
        Self {
            inner: Arc::new(PollerInner {
                pipeline,
                period,
                cycle_lock: Mutex::new(()),
                state: Mutex::new(PollerState::default()),
            }),
        }
    }

    /// Spawn the timer loop. Returns `false` if it was already running.
    pub async fn start(&self) -> bool {
        let mut st = self.inner.state.lock().await;
        if st.task.as_ref().is_some_and(|t| !t.is_finished()) {
            return false;
        }

        let cancel = CancellationToken::new();
        let poller = self.clone();
        let token = cancel.clone();
        st.task = Some(tokio::spawn(async move { poller.timer_loop(token).await }));
        st.cancel = Some(cancel);

        tracing::info!(
            period_secs = self.inner.period.as_secs(),
            "code poller started"
        );
        true
    }

    /// Cancel the timer loop and wait for it to exit.
    ///
    /// A cycle that is already running completes (including its current
    /// delivery + record) before this returns.
    pub async fn stop(&self) {
        let (cancel, task) = {
            let mut st = self.inner.state.lock().await;
            st.next_tick_at = None;
            (st.cancel.take(), st.task.take())
        };

        if let Some(tok) = cancel {
            tok.cancel();
        }
        if let Some(handle) = task {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "code poller task ended abnormally");
            }
        }
        tracing::info!("code poller stopped");
    }

    async fn timer_loop(&self, cancel: CancellationToken) {
        let mut ticker = interval(self.inner.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    let next = chrono::Duration::from_std(self.inner.period)
                        .ok()
                        .map(|d| Local::now() + d);
                    self.inner.state.lock().await.next_tick_at = next;
                    self.run_once().await;
                }
            }
        }
    }

    /// Run one cycle now, waiting for any in-progress cycle to finish first.
    pub async fn run_once(&self) -> CycleReport {
        let _guard = self.inner.cycle_lock.lock().await;
        let report = self.inner.pipeline.run_cycle().await;

        match &report.outcome {
            CycleOutcome::Completed => tracing::info!(
                fetched = report.fetched,
                delivered = report.delivered.len(),
                failed = report.failed.len(),
                "cycle completed"
            ),
            CycleOutcome::FetchFailed(_) | CycleOutcome::StoreUnavailable(_) => {
                tracing::warn!(summary = %report.summary(), "cycle abandoned")
            }
        }

        let mut st = self.inner.state.lock().await;
        st.cycles += 1;
        st.last_report = Some(report.clone());
        report
    }

    pub async fn status(&self) -> PollerStatus {
        let st = self.inner.state.lock().await;
        PollerStatus {
            running: st.task.as_ref().is_some_and(|t| !t.is_finished()),
            period: self.inner.period,
            cycles: st.cycles,
            last_report: st.last_report.clone(),
            next_tick_at: st.next_tick_at,
        }
    }

    pub async fn status_html(&self) -> String {
        let status = self.status().await;
        let recorded = match self.inner.pipeline.ledger().recorded_count().await {
            Ok(n) => n.to_string(),
            Err(_) => "unavailable".to_string(),
        };
        render_status_html(&status, &recorded)
    }
}

fn render_status_html(status: &PollerStatus, recorded: &str) -> String {
    let mut lines = vec!["📊 <b>Code Watcher Status</b>\n".to_string()];

    lines.push(if status.running {
        format!(
            "✅ Polling every {}",
            escape_html(&format_period(status.period))
        )
    } else {
        "⏸ Poller not running".to_string()
    });
    lines.push(format!("Cycles run: {}", status.cycles));
    lines.push(format!("Codes already sent: {}", escape_html(recorded)));

    match &status.last_report {
        Some(r) => lines.push(format!(
            "Last cycle at {}: {}",
            format_clock(r.started_at),
            escape_html(&r.summary())
        )),
        None => lines.push("No cycle has run yet".to_string()),
    }
    if let Some(next) = status.next_tick_at {
        lines.push(format!("Next check at {}", format_clock(next)));
    }

    lines.join("\n")
}

fn format_clock(dt: DateTime<Local>) -> String {
    format!("{:02}:{:02}", dt.hour(), dt.minute())
}

fn format_period(d: Duration) -> String {
    let secs = d.as_secs();
    if secs >= 60 && secs % 60 == 0 {
        format!("{}m", secs / 60)
    } else {
        format!("{secs}s")
    }
}
