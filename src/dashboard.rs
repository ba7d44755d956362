//! Session bootstrap: build the vendor clients, discover devices, then run
//! the synchronizer and the web UI until the process is asked to stop.

use anyhow::{Context, Result};
use std::cmp::Ordering;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};

use smarthome_client_rs::{HueClient, HueOptions, ShellyClient, ShellyOptions};

use crate::plugs::PlugControls;
use crate::policy::DeferredColorPolicy;
use crate::registry::{DeviceKind, DeviceRegistry, Lamp, Plug};
use crate::remote::{LampApi, PlugApi, Unconfigured};
use crate::selection::ColorSelection;
use crate::settings::Settings;
use crate::sync::StateSynchronizer;
use crate::web::metrics::Metrics;
use crate::web::state::{DashboardState, SyncStatus};
use crate::web::{Controls, WebConfig, start_web_server};

/// Numeric ids first in numeric order, then everything else lexically.
fn id_order(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

/// Register every plug and lamp reported by the two fleets. A fleet that
/// cannot be listed contributes no devices.
pub async fn discover(
    registry: &DeviceRegistry,
    plugs: &dyn PlugApi,
    lamps: &dyn LampApi,
) -> (usize, usize) {
    let mut plug_fleet = match plugs.fetch_fleet_status().await {
        Ok(fleet) => fleet,
        Err(e) => {
            error!("Failed to list plugs: {e}");
            Vec::new()
        }
    };
    plug_fleet.sort_by(|a, b| id_order(&a.0, &b.0));
    for (id, status) in plug_fleet {
        let plug = Plug {
            id,
            address: status.address,
            name: status.name,
            is_on: status.is_on,
            power: status.power,
        };
        if let Err(e) = registry.register(plug) {
            warn!("Skipping plug: {e}");
        }
    }

    let mut lamp_fleet = match lamps.fetch_fleet_status().await {
        Ok(fleet) => fleet,
        Err(e) => {
            error!("Failed to list lamps: {e}");
            Vec::new()
        }
    };
    lamp_fleet.sort_by(|a, b| id_order(&a.0, &b.0));
    for (id, status) in lamp_fleet {
        let lamp = Lamp {
            id,
            name: status.name,
            state: status.state,
            saved_color: None,
        };
        if let Err(e) = registry.register(lamp) {
            warn!("Skipping lamp: {e}");
        }
    }

    let found = (
        registry.count(DeviceKind::Plug),
        registry.count(DeviceKind::Lamp),
    );
    info!("Found {} plugs and {} lamps", found.0, found.1);
    Metrics::set_device_count(DeviceKind::Plug.as_str(), found.0);
    Metrics::set_device_count(DeviceKind::Lamp.as_str(), found.1);
    found
}

fn plug_api(settings: &Settings) -> Result<Arc<dyn PlugApi>> {
    let (Some(host), Some(auth_key)) = (&settings.shelly_host, &settings.shelly_auth_key) else {
        warn!("Shelly host or auth key not set, plugs are disabled");
        return Ok(Arc::new(Unconfigured("Shelly")));
    };
    let options = ShellyOptions::builder()
        .host(host.clone())
        .auth_key(auth_key.clone())
        .plug_models(settings.plug_models.clone())
        .build()?;
    Ok(Arc::new(ShellyClient::new(options)?))
}

fn lamp_api(settings: &Settings) -> Result<Arc<dyn LampApi>> {
    let (Some(bridge), Some(username)) = (&settings.hue_bridge, &settings.hue_username) else {
        warn!("Hue bridge or username not set, lamps are disabled");
        return Ok(Arc::new(Unconfigured("Hue")));
    };
    let options = HueOptions::builder()
        .bridge(bridge.clone())
        .username(username.clone())
        .build()?;
    Ok(Arc::new(HueClient::new(options)?))
}

pub async fn start_dashboard(settings: Settings, web: WebConfig) -> Result<()> {
    let plug_api = plug_api(&settings).context("Failed to create the Shelly client")?;
    let lamp_api = lamp_api(&settings).context("Failed to create the Hue client")?;

    let registry = DeviceRegistry::new();
    let dashboard = DashboardState::new();
    dashboard.set_endpoints(settings.shelly_host.clone(), settings.hue_bridge.clone());

    info!("Discovering devices...");
    discover(&registry, plug_api.as_ref(), lamp_api.as_ref()).await;

    let plugs = PlugControls::new(registry.clone(), plug_api);
    let lamps = DeferredColorPolicy::new(registry.clone(), lamp_api);
    let synchronizer = StateSynchronizer::new(
        registry.clone(),
        plugs.clone(),
        lamps.clone(),
        dashboard.clone(),
    )
    .with_period(settings.poll_interval());

    start_web_server(
        web,
        Controls {
            registry,
            selection: ColorSelection::new(),
            lamps,
            plugs,
            dashboard: dashboard.clone(),
        },
    )
    .await
    .context("Failed to start the web server")?;

    let sync_task = synchronizer.start();
    let sync_done = async {
        match sync_task {
            Some(handle) => handle.await,
            None => std::future::pending().await,
        }
    };

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install the terminate handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let result = tokio::select! {
        res = sync_done => {
            error!("State synchronizer stopped unexpectedly");
            res.context("State synchronizer failed")
        }
        _ = ctrl_c => {
            info!("signal received, starting graceful shutdown");
            Ok(())
        },
        _ = terminate => {
            info!("signal received, starting graceful shutdown");
            Ok(())
        },
    };
    dashboard.set_sync_status(SyncStatus::Stopped);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::LampState;
    use crate::testing::{FakeLampApi, FakePlugApi};
    use std::sync::atomic::Ordering as AtomicOrdering;

    #[test]
    fn numeric_ids_sort_first() {
        let mut ids = vec!["10", "b", "2", "a1", "1"];
        ids.sort_by(|a, b| id_order(a, b));
        assert_eq!(ids, vec!["1", "2", "10", "a1", "b"]);
    }

    #[tokio::test]
    async fn discovery_registers_both_fleets_in_order() {
        let plugs = FakePlugApi::new()
            .with_plug("c8c9a3", 3.0)
            .with_plug("a4cf12", 0.0);
        let lamps = FakeLampApi::new()
            .with_lamp("10", LampState::default())
            .with_lamp("2", LampState::default());
        let registry = DeviceRegistry::new();

        let found = discover(&registry, &plugs, &lamps).await;

        assert_eq!(found, (2, 2));
        let plug_ids: Vec<_> = registry.plugs().into_iter().map(|p| p.id).collect();
        let lamp_ids: Vec<_> = registry.lamps().into_iter().map(|l| l.id).collect();
        assert_eq!(plug_ids, vec!["a4cf12", "c8c9a3"]);
        assert_eq!(lamp_ids, vec!["2", "10"]);
        assert_eq!(registry.plug("c8c9a3").unwrap().power, 3.0);
    }

    #[tokio::test]
    async fn failed_fleet_listing_is_not_fatal() {
        let plugs = FakePlugApi::new().with_plug("a4cf12", 0.0);
        plugs.should_fail_listing.store(true, AtomicOrdering::Relaxed);
        let lamps = FakeLampApi::new().with_lamp("1", LampState::default());
        let registry = DeviceRegistry::new();

        assert_eq!(discover(&registry, &plugs, &lamps).await, (0, 1));
    }

    #[tokio::test]
    async fn unconfigured_vendors_yield_no_devices() {
        let registry = DeviceRegistry::new();
        let settings = Settings::default();
        let plugs = plug_api(&settings).unwrap();
        let lamps = lamp_api(&settings).unwrap();

        assert_eq!(
            discover(&registry, plugs.as_ref(), lamps.as_ref()).await,
            (0, 0)
        );
        assert!(registry.is_empty());
    }
}
