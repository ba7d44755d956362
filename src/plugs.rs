use std::sync::Arc;
use tracing::{debug, error, info};

use crate::error::Result;
use crate::registry::{DeviceRegistry, Plug, PlugPatch};
use crate::remote::PlugApi;
use crate::web::metrics::Metrics;

/// Relay switching and power readings for smart plugs.
#[derive(Clone)]
pub struct PlugControls {
    registry: DeviceRegistry,
    api: Arc<dyn PlugApi>,
}

impl PlugControls {
    pub fn new(registry: DeviceRegistry, api: Arc<dyn PlugApi>) -> Self {
        Self { registry, api }
    }

    /// Flip the relay. The new state is shown right away and restored if the
    /// plug does not accept the command.
    pub async fn toggle(&self, id: &str) -> Result<Plug> {
        let plug = self.registry.plug(id)?;
        let on = !plug.is_on;
        self.registry.update_state(id, PlugPatch::switched(on))?;

        if let Err(e) = self.api.set_state(id, &plug.address, on).await {
            error!("Failed to switch plug {id} ({}): {e}", plug.address);
            Metrics::inc_write_errors("plug");
            self.registry
                .update_state(id, PlugPatch::switched(plug.is_on))?;
            return Err(e);
        }
        info!("Plug {id} switched {}", if on { "on" } else { "off" });
        self.registry.plug(id)
    }

    /// Read the current power draw and merge it.
    pub async fn refresh_power(&self, id: &str) -> Result<Plug> {
        let watts = self.api.fetch_power(id).await?;
        debug!("Plug {id} draws {watts} W");
        self.registry.update_state(id, PlugPatch::power(watts))?;
        self.registry.plug(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DashboardError;
    use crate::registry::tests::plug;
    use crate::testing::FakePlugApi;

    fn setup() -> (DeviceRegistry, FakePlugApi, PlugControls) {
        let registry = DeviceRegistry::new();
        registry.register(plug("p1")).unwrap();
        let api = FakePlugApi::new().with_plug("p1", 12.5);
        let controls = PlugControls::new(registry.clone(), Arc::new(api.clone()));
        (registry, api, controls)
    }

    #[tokio::test]
    async fn toggle_switches_relay_at_plug_address() {
        let (registry, api, controls) = setup();
        let address = registry.plug("p1").unwrap().address;

        let plug = controls.toggle("p1").await.unwrap();
        assert!(plug.is_on);
        controls.toggle("p1").await.unwrap();

        assert_eq!(
            api.switch_calls.read().await.as_slice(),
            &[
                ("p1".to_string(), address.clone(), true),
                ("p1".to_string(), address, false)
            ]
        );
        assert!(!registry.plug("p1").unwrap().is_on);
    }

    #[tokio::test]
    async fn failed_toggle_is_rolled_back() {
        let (registry, api, controls) = setup();
        api.fail_writes(true);

        let result = controls.toggle("p1").await;

        assert!(matches!(result, Err(DashboardError::RemoteWrite(_))));
        assert!(!registry.plug("p1").unwrap().is_on);
    }

    #[tokio::test]
    async fn refresh_power_merges_reading() {
        let (registry, api, controls) = setup();
        api.set_power("p1", 230.0);

        controls.refresh_power("p1").await.unwrap();

        let plug = registry.plug("p1").unwrap();
        assert_eq!(plug.power, 230.0);
        assert_eq!(plug.name, "Plug p1");
    }

    #[tokio::test]
    async fn failed_power_read_keeps_last_value() {
        let (registry, api, controls) = setup();
        api.fail_fetch("p1");

        assert!(matches!(
            controls.refresh_power("p1").await,
            Err(DashboardError::RemoteFetch(_))
        ));
        assert_eq!(registry.plug("p1").unwrap().power, 0.0);
    }
}
