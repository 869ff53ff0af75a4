//! Background health sweep.
//!
//! The single timing owner in the system: an interval task that runs the
//! pool's batch prober and keeps a snapshot of the last sweep for
//! `/api/status`. Everything else (probing, classification, accounting)
//! lives in the core.

use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::interval;

use crate::state::AppState;

#[derive(Debug, Clone, Serialize)]
pub struct SweepSummary {
    pub finished_at: i64,
    pub probed: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SchedulerStatus {
    pub enabled: bool,
    pub interval_minutes: u64,
    pub last_sweep: Option<SweepSummary>,
}

pub type SchedulerHandle = Arc<RwLock<SchedulerStatus>>;

pub fn new_handle(enabled: bool, interval_minutes: u64) -> SchedulerHandle {
    Arc::new(RwLock::new(SchedulerStatus { enabled, interval_minutes, last_sweep: None }))
}

/// Start the sweep task. A disabled scheduler spawns nothing; probes remain
/// reachable through the manual verify endpoint.
pub fn start(state: AppState) {
    let scheduler_config = state.config().scheduler.clone();
    if !scheduler_config.enabled {
        tracing::info!("[Scheduler] health sweeps disabled by config");
        return;
    }
    let targets = state.config().probe_targets();

    tokio::spawn(async move {
        tracing::info!(
            interval_minutes = scheduler_config.interval_minutes,
            "[Scheduler] health sweep scheduler started"
        );
        let mut tick = interval(Duration::from_secs(scheduler_config.interval_minutes * 60));
        loop {
            tick.tick().await;
            match state.pool().probe_all(state.dispatcher(), &targets).await {
                Ok(reports) => {
                    let failed = reports.iter().filter(|r| !r.all_ok()).count();
                    let summary = SweepSummary {
                        finished_at: Utc::now().timestamp(),
                        probed: reports.len(),
                        failed,
                    };
                    state.inner.scheduler.write().await.last_sweep = Some(summary);
                },
                Err(e) => {
                    tracing::warn!("[Scheduler] health sweep failed: {e}");
                },
            }
        }
    });
}
