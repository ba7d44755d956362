//! Lamp controls and the deferred color policy.
//!
//! A color picked for a lamp that is off is kept as the lamp's saved color
//! and written the next time the lamp is seen powered on, either because the
//! user switched it on here or because a reconciliation read found it on.
//! All mutations of one lamp (user controls and reconciliation reads) are
//! serialized through a per-lamp lock, so a stale read can never land between
//! the power-on read and the saved color write.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex as TokioMutex, OwnedMutexGuard};
use tracing::{debug, error, info, warn};

use crate::color::NativeColor;
use crate::color::convert::BRI_MAX;
use crate::error::{DashboardError, Result};
use crate::registry::{DeviceRegistry, Lamp, LampPatch};
use crate::remote::LampApi;
use crate::web::metrics::Metrics;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorPhase {
    Idle,
    PendingApply,
}

impl ColorPhase {
    pub fn of(lamp: &Lamp) -> Self {
        if lamp.saved_color.is_some() {
            ColorPhase::PendingApply
        } else {
            ColorPhase::Idle
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorOutcome {
    /// Written to the lamp right away.
    Applied(NativeColor),
    /// Stored until the lamp is switched on.
    Deferred(NativeColor),
}

#[derive(Debug, Clone, Default)]
pub(crate) struct LampLocks(Arc<DashMap<String, Arc<TokioMutex<()>>>>);

impl LampLocks {
    fn get(&self, id: &str) -> Arc<TokioMutex<()>> {
        self.0
            .entry(id.to_string())
            .or_insert_with(|| Arc::new(TokioMutex::new(())))
            .clone()
    }

    async fn lock(&self, id: &str) -> OwnedMutexGuard<()> {
        self.get(id).lock_owned().await
    }

    fn try_lock(&self, id: &str) -> Option<OwnedMutexGuard<()>> {
        self.get(id).try_lock_owned().ok()
    }
}

#[derive(Clone)]
pub struct DeferredColorPolicy {
    registry: DeviceRegistry,
    api: Arc<dyn LampApi>,
    locks: LampLocks,
}

impl DeferredColorPolicy {
    pub fn new(registry: DeviceRegistry, api: Arc<dyn LampApi>) -> Self {
        Self {
            registry,
            api,
            locks: LampLocks::default(),
        }
    }

    /// Lock one lamp. Unknown ids fail before a lock is created for them.
    async fn guard(&self, id: &str) -> Result<OwnedMutexGuard<()>> {
        self.registry.lamp(id)?;
        Ok(self.locks.lock(id).await)
    }

    /// Apply a picked color, or store it if the lamp is off.
    pub async fn select_color(&self, id: &str, color: NativeColor) -> Result<ColorOutcome> {
        let _guard = self.guard(id).await?;

        if self.registry.defer_color(id, color)? {
            info!(
                "Lamp {id} is off, saving color (hue {}, sat {}, bri {}) for later",
                color.hue, color.sat, color.bri
            );
            Metrics::inc_deferred_colors();
            return Ok(ColorOutcome::Deferred(color));
        }

        let before = self.registry.lamp(id)?.state.color();
        self.registry.update_state(id, LampPatch::color(color))?;
        if let Err(e) = self.api.set_color(id, color).await {
            error!("Failed to set color of lamp {id}: {e}");
            Metrics::inc_write_errors("lamp");
            self.registry.update_state(id, LampPatch::color(before))?;
            return Err(e);
        }
        debug!("Lamp {id} color set to {color:?}");
        Ok(ColorOutcome::Applied(color))
    }

    pub async fn toggle_power(&self, id: &str) -> Result<Lamp> {
        let on = !self.registry.lamp(id)?.state.on;
        self.set_power(id, on).await
    }

    /// Switch a lamp. Power-off is shown right away and restored on failure.
    /// Power-on is recorded only once the bridge accepted it, so the saved
    /// color can be taken in the same step.
    pub async fn set_power(&self, id: &str, on: bool) -> Result<Lamp> {
        let _guard = self.guard(id).await?;
        let before = self.registry.lamp(id)?.state.on;

        if !on {
            self.registry.update_state(id, LampPatch::power(false))?;
        }
        if let Err(e) = self.api.set_power(id, on).await {
            error!(
                "Failed to switch lamp {id} {}: {e}",
                if on { "on" } else { "off" }
            );
            Metrics::inc_write_errors("lamp");
            if !on {
                self.registry.update_state(id, LampPatch::power(before))?;
            }
            return Err(e);
        }

        if !on {
            info!("Lamp {id} switched off");
            return self.registry.lamp(id);
        }

        let patch = match self.api.fetch_state(id).await {
            Ok(state) => LampPatch {
                on: Some(true),
                ..LampPatch::from(state)
            },
            Err(e) => {
                warn!("Lamp {id} switched on but its state could not be read: {e}");
                LampPatch::power(true)
            }
        };
        let (lamp, saved) = self.registry.merge_lamp_taking_saved(id, patch)?;
        info!("Lamp {id} switched on");
        match saved {
            Some(color) => self.apply_saved(id, color).await,
            None => Ok(lamp),
        }
    }

    /// Optimistically set brightness; rolled back if the bridge refuses it.
    pub async fn set_brightness(&self, id: &str, bri: u8) -> Result<Lamp> {
        if bri > BRI_MAX {
            return Err(DashboardError::OutOfRange("Brightness", bri.into()));
        }
        let _guard = self.guard(id).await?;

        let before = self.registry.lamp(id)?.state.bri;
        self.registry.update_state(id, LampPatch::brightness(bri))?;
        if let Err(e) = self.api.set_brightness(id, bri).await {
            error!("Failed to set brightness of lamp {id} to {bri}: {e}");
            Metrics::inc_write_errors("lamp");
            self.registry.update_state(id, LampPatch::brightness(before))?;
            return Err(e);
        }
        self.registry.lamp(id)
    }

    /// Read the lamp's remote state and merge it. Returns `None` when another
    /// operation on the same lamp is in flight; the next tick reads it again.
    pub async fn reconcile(&self, id: &str) -> Result<Option<Lamp>> {
        self.registry.lamp(id)?;
        let Some(_guard) = self.locks.try_lock(id) else {
            debug!("Lamp {id} is busy, skipping this read");
            return Ok(None);
        };

        let state = self.api.fetch_state(id).await?;
        let (lamp, saved) = self
            .registry
            .merge_lamp_taking_saved(id, LampPatch::from(state))?;
        match saved {
            Some(color) => {
                info!("Lamp {id} was switched on elsewhere, applying its saved color");
                self.apply_saved(id, color).await.map(Some)
            }
            None => Ok(Some(lamp)),
        }
    }

    /// The saved color has already been removed from the registry; it is
    /// written once and dropped even if the write fails.
    async fn apply_saved(&self, id: &str, color: NativeColor) -> Result<Lamp> {
        match self.api.set_color(id, color).await {
            Ok(()) => {
                Metrics::inc_deferred_colors_applied();
                info!("Applied saved color {color:?} to lamp {id}");
                self.registry.update_state(id, LampPatch::color(color))?;
            }
            Err(e) => {
                error!("Failed to apply saved color to lamp {id}, discarding it: {e}");
                Metrics::inc_write_errors("lamp");
            }
        }
        self.registry.lamp(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::LampState;
    use crate::registry::tests::lamp;
    use crate::testing::{FakeLampApi, LampCall};

    fn setup(lamps: &[(&str, bool)]) -> (DeviceRegistry, FakeLampApi, DeferredColorPolicy) {
        let registry = DeviceRegistry::new();
        let mut api = FakeLampApi::new();
        for (id, on) in lamps {
            let record = lamp(id, *on);
            api = api.with_lamp(id, record.state);
            registry.register(record).unwrap();
        }
        let policy = DeferredColorPolicy::new(registry.clone(), Arc::new(api.clone()));
        (registry, api, policy)
    }

    #[tokio::test]
    async fn color_for_lamp_that_is_off_is_deferred() {
        let (registry, api, policy) = setup(&[("1", false)]);
        let color = NativeColor::new(20000, 200, 150);

        let outcome = policy.select_color("1", color).await.unwrap();

        assert_eq!(outcome, ColorOutcome::Deferred(color));
        assert!(api.calls.read().await.is_empty());
        let lamp = registry.lamp("1").unwrap();
        assert_eq!(lamp.saved_color, Some(color));
        assert!(!lamp.state.on);
        assert_eq!(ColorPhase::of(&lamp), ColorPhase::PendingApply);
    }

    #[tokio::test]
    async fn saved_color_is_written_once_on_power_on() {
        let (registry, api, policy) = setup(&[("1", false)]);
        let color = NativeColor::new(20000, 200, 150);
        policy.select_color("1", color).await.unwrap();

        let lamp = policy.toggle_power("1").await.unwrap();

        assert_eq!(
            api.calls.read().await.as_slice(),
            &[
                LampCall::Power("1".to_string(), true),
                LampCall::Color("1".to_string(), color)
            ]
        );
        assert_eq!(lamp.saved_color, None);
        assert_eq!(ColorPhase::of(&lamp), ColorPhase::Idle);
        assert_eq!(
            lamp.state,
            LampState {
                on: true,
                hue: 20000,
                sat: 200,
                bri: 150
            }
        );

        // later reads and toggles never re-apply it
        policy.reconcile("1").await.unwrap();
        policy.toggle_power("1").await.unwrap();
        policy.toggle_power("1").await.unwrap();
        assert_eq!(api.color_calls().await.len(), 1);
    }

    #[tokio::test]
    async fn power_on_without_saved_color_only_switches() {
        let (registry, api, policy) = setup(&[("1", false)]);
        api.set_remote_state(
            "1",
            LampState {
                on: false,
                hue: 500,
                sat: 50,
                bri: 60,
            },
        );

        policy.set_power("1", true).await.unwrap();

        assert_eq!(
            api.calls.read().await.as_slice(),
            &[LampCall::Power("1".to_string(), true)]
        );
        let lamp = registry.lamp("1").unwrap();
        assert!(lamp.state.on);
        assert_eq!(lamp.state.bri, 60);
    }

    #[tokio::test]
    async fn color_for_lit_lamp_is_written_immediately() {
        let (registry, api, policy) = setup(&[("1", true)]);
        let color = NativeColor::new(43690, 254, 200);

        let outcome = policy.select_color("1", color).await.unwrap();

        assert_eq!(outcome, ColorOutcome::Applied(color));
        assert_eq!(api.color_calls().await, vec![("1".to_string(), color)]);
        let lamp = registry.lamp("1").unwrap();
        assert_eq!(lamp.state.color(), color);
        assert_eq!(lamp.saved_color, None);
    }

    #[tokio::test]
    async fn failed_color_write_is_rolled_back() {
        let (registry, api, policy) = setup(&[("1", true)]);
        api.fail_writes(true);
        let before = registry.lamp("1").unwrap().state;

        let result = policy.select_color("1", NativeColor::new(1, 2, 3)).await;

        assert!(matches!(result, Err(DashboardError::RemoteWrite(_))));
        assert_eq!(registry.lamp("1").unwrap().state, before);
    }

    #[tokio::test]
    async fn failed_brightness_write_is_rolled_back() {
        let (registry, api, policy) = setup(&[("1", true)]);
        api.fail_writes(true);

        let result = policy.set_brightness("1", 10).await;

        assert!(matches!(result, Err(DashboardError::RemoteWrite(_))));
        assert_eq!(registry.lamp("1").unwrap().state.bri, 120);
    }

    #[tokio::test]
    async fn brightness_keeps_saved_color() {
        let (registry, _api, policy) = setup(&[("1", false)]);
        let color = NativeColor::new(20000, 200, 150);
        policy.select_color("1", color).await.unwrap();

        let lamp = policy.set_brightness("1", 77).await.unwrap();

        assert_eq!(lamp.state.bri, 77);
        assert_eq!(lamp.saved_color, Some(color));
        assert_eq!(registry.lamp("1").unwrap().saved_color, Some(color));
    }

    #[tokio::test]
    async fn failed_power_on_keeps_lamp_off_and_color_pending() {
        let (registry, api, policy) = setup(&[("1", false)]);
        let color = NativeColor::new(20000, 200, 150);
        policy.select_color("1", color).await.unwrap();
        api.fail_writes(true);

        let result = policy.toggle_power("1").await;

        assert!(matches!(result, Err(DashboardError::RemoteWrite(_))));
        let lamp = registry.lamp("1").unwrap();
        assert!(!lamp.state.on);
        assert_eq!(lamp.saved_color, Some(color));
    }

    #[tokio::test]
    async fn failed_power_off_is_rolled_back() {
        let (registry, api, policy) = setup(&[("1", true)]);
        api.fail_writes(true);

        let result = policy.set_power("1", false).await;

        assert!(matches!(result, Err(DashboardError::RemoteWrite(_))));
        assert!(registry.lamp("1").unwrap().state.on);
    }

    #[tokio::test]
    async fn lamp_switched_on_elsewhere_gets_saved_color() {
        let (registry, api, policy) = setup(&[("1", false)]);
        let color = NativeColor::new(20000, 200, 150);
        policy.select_color("1", color).await.unwrap();
        api.set_remote_state(
            "1",
            LampState {
                on: true,
                hue: 0,
                sat: 0,
                bri: 254,
            },
        );

        let lamp = policy.reconcile("1").await.unwrap().unwrap();

        assert_eq!(api.color_calls().await, vec![("1".to_string(), color)]);
        assert_eq!(lamp.saved_color, None);
        assert_eq!(lamp.state.color(), color);
        assert_eq!(registry.lamp("1").unwrap().saved_color, None);
    }

    #[tokio::test]
    async fn reconcile_skips_busy_lamp() {
        let (_registry, api, policy) = setup(&[("1", true)]);
        let _held = policy.locks.lock("1").await;

        assert_eq!(policy.reconcile("1").await.unwrap(), None);
        assert!(api.fetches.read().await.is_empty());
    }

    #[tokio::test]
    async fn unknown_lamp() {
        let (_registry, api, policy) = setup(&[]);
        assert_eq!(
            policy.select_color("9", NativeColor::default()).await,
            Err(DashboardError::NotFound("9".to_string()))
        );
        assert!(matches!(
            policy.set_power("9", true).await,
            Err(DashboardError::NotFound(_))
        ));
        assert!(matches!(
            policy.set_brightness("9", 10).await,
            Err(DashboardError::NotFound(_))
        ));
        assert!(matches!(
            policy.reconcile("9").await,
            Err(DashboardError::NotFound(_))
        ));
        assert!(api.calls.read().await.is_empty());
        assert!(policy.locks.0.is_empty());
    }

    #[tokio::test]
    async fn brightness_above_range_is_refused() {
        let (registry, api, policy) = setup(&[("1", true)]);

        assert_eq!(
            policy.set_brightness("1", 255).await,
            Err(DashboardError::OutOfRange("Brightness", 255))
        );
        assert_eq!(registry.lamp("1").unwrap().state.bri, 120);
        assert!(api.calls.read().await.is_empty());

        let lamp = policy.set_brightness("1", BRI_MAX).await.unwrap();
        assert_eq!(lamp.state.bri, BRI_MAX);
    }
}
