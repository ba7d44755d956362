//! Runtime status of the dashboard session, shown on the status page and
//! exported as JSON.

use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

/// Whether the reconciliation loop is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    /// Not started yet, or nothing to synchronize.
    Idle,
    Running,
    Stopped,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Idle => "idle",
            SyncStatus::Running => "running",
            SyncStatus::Stopped => "stopped",
        }
    }
}

#[derive(Debug)]
struct DashboardStateInner {
    start_time: Instant,
    sync_status: SyncStatus,
    last_tick: Option<Instant>,
    tick_count: u64,
    device_reads: u64,
    device_read_failures: u64,
    plug_host: Option<String>,
    lamp_bridge: Option<String>,
    last_error: Option<String>,
}

/// Shared session state, cheap to clone.
#[derive(Debug, Clone)]
pub struct DashboardState {
    inner: Arc<RwLock<DashboardStateInner>>,
}

impl Default for DashboardState {
    fn default() -> Self {
        Self::new()
    }
}

impl DashboardState {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(DashboardStateInner {
                start_time: Instant::now(),
                sync_status: SyncStatus::Idle,
                last_tick: None,
                tick_count: 0,
                device_reads: 0,
                device_read_failures: 0,
                plug_host: None,
                lamp_bridge: None,
                last_error: None,
            })),
        }
    }

    pub fn start_time(&self) -> Instant {
        self.inner.read().start_time
    }

    pub fn sync_status(&self) -> SyncStatus {
        self.inner.read().sync_status
    }

    pub fn set_sync_status(&self, status: SyncStatus) {
        self.inner.write().sync_status = status;
    }

    pub fn set_endpoints(&self, plug_host: Option<String>, lamp_bridge: Option<String>) {
        let mut inner = self.inner.write();
        inner.plug_host = plug_host;
        inner.lamp_bridge = lamp_bridge;
    }

    /// Record the outcome of one reconciliation tick.
    pub fn record_tick(&self, reads: u64, failures: u64) {
        let mut inner = self.inner.write();
        inner.tick_count += 1;
        inner.last_tick = Some(Instant::now());
        inner.device_reads += reads;
        inner.device_read_failures += failures;
    }

    pub fn tick_count(&self) -> u64 {
        self.inner.read().tick_count
    }

    pub fn set_error(&self, error: Option<String>) {
        self.inner.write().last_error = error;
    }

    pub fn last_error(&self) -> Option<String> {
        self.inner.read().last_error.clone()
    }

    pub fn summary(&self) -> DashboardSummary {
        let inner = self.inner.read();
        DashboardSummary {
            uptime_seconds: inner.start_time.elapsed().as_secs(),
            sync_status: inner.sync_status,
            last_tick_seconds_ago: inner.last_tick.map(|t| t.elapsed().as_secs()),
            tick_count: inner.tick_count,
            device_reads: inner.device_reads,
            device_read_failures: inner.device_read_failures,
            plug_host: inner.plug_host.clone(),
            lamp_bridge: inner.lamp_bridge.clone(),
            last_error: inner.last_error.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardSummary {
    pub uptime_seconds: u64,
    pub sync_status: SyncStatus,
    pub last_tick_seconds_ago: Option<u64>,
    pub tick_count: u64,
    /// Successful plus failed per-device reads.
    pub device_reads: u64,
    pub device_read_failures: u64,
    pub plug_host: Option<String>,
    pub lamp_bridge: Option<String>,
    pub last_error: Option<String>,
}

impl DashboardSummary {
    pub fn uptime_display(&self) -> String {
        let secs = self.uptime_seconds;
        let days = secs / 86400;
        let hours = (secs % 86400) / 3600;
        let mins = (secs % 3600) / 60;
        let secs = secs % 60;

        if days > 0 {
            format!("{days}d {hours}h {mins}m {secs}s")
        } else if hours > 0 {
            format!("{hours}h {mins}m {secs}s")
        } else if mins > 0 {
            format!("{mins}m {secs}s")
        } else {
            format!("{secs}s")
        }
    }

    pub fn read_success_rate(&self) -> f64 {
        if self.device_reads == 0 {
            100.0
        } else {
            let successes = self.device_reads - self.device_read_failures;
            (successes as f64 / self.device_reads as f64) * 100.0
        }
    }
}
