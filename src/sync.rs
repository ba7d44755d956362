//! Periodic reconciliation of the registry with the remote devices.
//!
//! Every tick reads the power draw of each plug and the state of each lamp.
//! Ticks are spawned on their own so a slow bridge never delays the next one.

use futures::future::join_all;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::plugs::PlugControls;
use crate::policy::DeferredColorPolicy;
use crate::registry::{DeviceKind, DeviceRegistry};
use crate::web::metrics::Metrics;
use crate::web::state::{DashboardState, SyncStatus};

pub const DEFAULT_PERIOD: Duration = Duration::from_millis(1000);

/// Outcome of a single tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub updated: usize,
    pub failed: usize,
    /// Lamps left alone because a control was in flight.
    pub skipped: usize,
}

impl TickReport {
    fn tally(&mut self, kind: DeviceKind, id: &str, result: Result<bool>) {
        match result {
            Ok(true) => {
                self.updated += 1;
                Metrics::inc_device_updates(kind.as_str());
            }
            Ok(false) => self.skipped += 1,
            Err(e) => {
                warn!("Failed to update {} {id}: {e}", kind.as_str());
                self.failed += 1;
                Metrics::inc_device_update_errors(kind.as_str());
            }
        }
    }
}

#[derive(Clone)]
pub struct StateSynchronizer {
    registry: DeviceRegistry,
    plugs: PlugControls,
    lamps: DeferredColorPolicy,
    state: DashboardState,
    period: Duration,
}

impl StateSynchronizer {
    pub fn new(
        registry: DeviceRegistry,
        plugs: PlugControls,
        lamps: DeferredColorPolicy,
        state: DashboardState,
    ) -> Self {
        Self {
            registry,
            plugs,
            lamps,
            state,
            period: DEFAULT_PERIOD,
        }
    }

    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    /// Start ticking in the background. Returns `None` when there is nothing
    /// to synchronize.
    pub fn start(&self) -> Option<JoinHandle<()>> {
        if self.registry.is_empty() {
            info!("No devices registered, state synchronizer not started");
            return None;
        }

        info!(
            "Starting state synchronizer for {} plugs and {} lamps every {:?}",
            self.registry.count(DeviceKind::Plug),
            self.registry.count(DeviceKind::Lamp),
            self.period
        );
        self.state.set_sync_status(SyncStatus::Running);

        let this = self.clone();
        Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(this.period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                let tick = this.clone();
                tokio::spawn(async move {
                    tick.tick().await;
                });
            }
        }))
    }

    /// Read every registered device once. Failures are counted and logged
    /// per device and never abort the tick.
    pub async fn tick(&self) -> TickReport {
        Metrics::inc_ticks();
        let plug_ids = self.registry.list(DeviceKind::Plug).ids().to_vec();
        let lamp_ids = self.registry.list(DeviceKind::Lamp).ids().to_vec();

        let plug_reads = join_all(
            plug_ids
                .iter()
                .map(|id| async move { self.plugs.refresh_power(id).await.map(|_| true) }),
        );
        let lamp_reads = join_all(
            lamp_ids
                .iter()
                .map(|id| async move { self.lamps.reconcile(id).await.map(|l| l.is_some()) }),
        );
        let (plug_results, lamp_results) = tokio::join!(plug_reads, lamp_reads);

        let mut report = TickReport::default();
        for (id, result) in plug_ids.iter().zip(plug_results) {
            report.tally(DeviceKind::Plug, id, result);
        }
        for (id, result) in lamp_ids.iter().zip(lamp_results) {
            report.tally(DeviceKind::Lamp, id, result);
        }

        self.state
            .record_tick((report.updated + report.failed) as u64, report.failed as u64);
        Metrics::set_uptime(self.state.start_time());
        debug!("Tick finished: {report:?}");
        report
    }
}
