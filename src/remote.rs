//! Remote device APIs as seen by the dashboard engine, and their bindings to
//! the Shelly and Hue clients.

use async_trait::async_trait;
use smarthome_client_rs::{ClientError, HueClient, HueLightState, ShellyClient};

use crate::color::NativeColor;
use crate::error::{DashboardError, Result};
use crate::registry::LampState;

/// Plug as reported by the fleet listing.
#[derive(Debug, Clone, PartialEq)]
pub struct PlugStatus {
    pub address: String,
    pub name: String,
    pub is_on: bool,
    pub power: f64,
}

/// Lamp as reported by the fleet listing.
#[derive(Debug, Clone, PartialEq)]
pub struct LampStatus {
    pub name: String,
    pub state: LampState,
}

#[async_trait]
pub trait PlugApi: Send + Sync {
    async fn fetch_fleet_status(&self) -> Result<Vec<(String, PlugStatus)>>;
    async fn fetch_power(&self, id: &str) -> Result<f64>;
    async fn set_state(&self, id: &str, address: &str, on: bool) -> Result<()>;
}

#[async_trait]
pub trait LampApi: Send + Sync {
    async fn fetch_fleet_status(&self) -> Result<Vec<(String, LampStatus)>>;
    async fn fetch_state(&self, id: &str) -> Result<LampState>;
    async fn set_power(&self, id: &str, on: bool) -> Result<()>;
    async fn set_brightness(&self, id: &str, bri: u8) -> Result<()>;
    async fn set_color(&self, id: &str, color: NativeColor) -> Result<()>;
}

fn fetch_error(e: ClientError) -> DashboardError {
    DashboardError::RemoteFetch(e.to_string())
}

fn write_error(e: ClientError) -> DashboardError {
    DashboardError::RemoteWrite(e.to_string())
}

impl From<HueLightState> for LampState {
    fn from(state: HueLightState) -> Self {
        Self {
            on: state.on,
            hue: state.hue,
            sat: state.sat,
            bri: state.bri,
        }
    }
}

#[async_trait]
impl PlugApi for ShellyClient {
    async fn fetch_fleet_status(&self) -> Result<Vec<(String, PlugStatus)>> {
        let plugs = self.fetch_plugs().await.map_err(fetch_error)?;
        Ok(plugs
            .into_iter()
            .map(|p| {
                (
                    p.id,
                    PlugStatus {
                        address: p.ip,
                        name: p.name,
                        is_on: p.is_on,
                        power: p.power,
                    },
                )
            })
            .collect())
    }

    async fn fetch_power(&self, id: &str) -> Result<f64> {
        ShellyClient::fetch_power(self, id)
            .await
            .map_err(fetch_error)
    }

    async fn set_state(&self, _id: &str, address: &str, on: bool) -> Result<()> {
        self.set_relay(address, on).await.map_err(write_error)
    }
}

#[async_trait]
impl LampApi for HueClient {
    async fn fetch_fleet_status(&self) -> Result<Vec<(String, LampStatus)>> {
        let lights = self.fetch_lights().await.map_err(fetch_error)?;
        Ok(lights
            .into_iter()
            .map(|(id, light)| {
                (
                    id,
                    LampStatus {
                        name: light.name,
                        state: light.state.into(),
                    },
                )
            })
            .collect())
    }

    async fn fetch_state(&self, id: &str) -> Result<LampState> {
        let light = self.fetch_light(id).await.map_err(fetch_error)?;
        Ok(light.state.into())
    }

    async fn set_power(&self, id: &str, on: bool) -> Result<()> {
        HueClient::set_power(self, id, on)
            .await
            .map_err(write_error)
    }

    async fn set_brightness(&self, id: &str, bri: u8) -> Result<()> {
        HueClient::set_brightness(self, id, bri)
            .await
            .map_err(write_error)
    }

    async fn set_color(&self, id: &str, color: NativeColor) -> Result<()> {
        HueClient::set_color(self, id, color.hue, color.sat, color.bri)
            .await
            .map_err(write_error)
    }
}

/// Stand-in for a vendor without configured credentials. It lists no devices
/// and refuses every command.
#[derive(Debug, Clone, Copy)]
pub struct Unconfigured(pub &'static str);

impl Unconfigured {
    fn refuse(&self) -> DashboardError {
        DashboardError::RemoteWrite(format!("{} is not configured", self.0))
    }
}

#[async_trait]
impl PlugApi for Unconfigured {
    async fn fetch_fleet_status(&self) -> Result<Vec<(String, PlugStatus)>> {
        Ok(Vec::new())
    }

    async fn fetch_power(&self, id: &str) -> Result<f64> {
        Err(DashboardError::RemoteFetch(format!(
            "{} is not configured, cannot read {id}",
            self.0
        )))
    }

    async fn set_state(&self, _id: &str, _address: &str, _on: bool) -> Result<()> {
        Err(self.refuse())
    }
}

#[async_trait]
impl LampApi for Unconfigured {
    async fn fetch_fleet_status(&self) -> Result<Vec<(String, LampStatus)>> {
        Ok(Vec::new())
    }

    async fn fetch_state(&self, id: &str) -> Result<LampState> {
        Err(DashboardError::RemoteFetch(format!(
            "{} is not configured, cannot read {id}",
            self.0
        )))
    }

    async fn set_power(&self, _id: &str, _on: bool) -> Result<()> {
        Err(self.refuse())
    }

    async fn set_brightness(&self, _id: &str, _bri: u8) -> Result<()> {
        Err(self.refuse())
    }

    async fn set_color(&self, _id: &str, _color: NativeColor) -> Result<()> {
        Err(self.refuse())
    }
}
