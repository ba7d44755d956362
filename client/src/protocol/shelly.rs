use std::sync::Arc;
use std::time::Duration;

use derive_builder::Builder;
use tracing::{debug, info};

use crate::protocol::DEFAULT_REQUEST_TIMEOUT;
use crate::protocol::error::{ClientError, read_json};
use crate::protocol::messages::{AllStatusData, DeviceStatusData, PlugInfo, ShellyEnvelope};

pub const DEFAULT_PLUG_MODEL: &str = "SHPLG-S";

#[derive(Builder, Debug, Clone)]
#[builder(setter(into))]
pub struct ShellyOptions {
    /// Shelly Cloud server, e.g. `https://shelly-136-eu.shelly.cloud`
    pub host: String,
    pub auth_key: String,
    #[builder(default = "vec![DEFAULT_PLUG_MODEL.to_string()]")]
    pub plug_models: Vec<String>,
    #[builder(default = "0")]
    pub relay_channel: u8,
    #[builder(default = "DEFAULT_REQUEST_TIMEOUT")]
    pub request_timeout: Duration,
}

impl ShellyOptions {
    pub fn builder() -> ShellyOptionsBuilder {
        ShellyOptionsBuilder::default()
    }

    fn cloud_url(&self, path: &str) -> String {
        format!("{}/{}", self.host.trim_end_matches('/'), path)
    }

    fn relay_url(&self, ip: &str) -> String {
        format!("http://{ip}/relay/{}", self.relay_channel)
    }
}

#[derive(Clone)]
pub struct ShellyClient {
    http: reqwest::Client,
    options: Arc<ShellyOptions>,
}

impl ShellyClient {
    pub fn new(options: ShellyOptions) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(options.request_timeout)
            .build()?;
        Ok(Self {
            http,
            options: Arc::new(options),
        })
    }

    /// Lists every plug on the cloud account whose model is one of the configured plug models.
    pub async fn fetch_plugs(&self) -> Result<Vec<PlugInfo>, ClientError> {
        let url = self.options.cloud_url("device/all_status");
        let response = self
            .http
            .get(&url)
            .query(&[
                ("show_info", "true"),
                ("no_shared", "true"),
                ("auth_key", self.options.auth_key.as_str()),
            ])
            .send()
            .await?;
        let envelope: ShellyEnvelope<AllStatusData> =
            serde_json::from_value(read_json(response).await?)?;
        let data = envelope.into_data()?;

        let plugs = data
            .devices_status
            .into_iter()
            .filter(|(_, status)| {
                status
                    .model_code()
                    .map(|code| self.options.plug_models.iter().any(|m| m == code))
                    .unwrap_or(false)
            })
            .map(|(id, status)| PlugInfo {
                ip: status.ip().unwrap_or_default().to_string(),
                name: status.device_name().unwrap_or(id.as_str()).to_string(),
                is_on: status.is_on(),
                power: status.power().unwrap_or_default(),
                id,
            })
            .collect::<Vec<_>>();
        info!("Shelly cloud reported {} plugs", plugs.len());
        Ok(plugs)
    }

    pub async fn fetch_power(&self, id: &str) -> Result<f64, ClientError> {
        let url = self.options.cloud_url("device/status");
        let response = self
            .http
            .get(&url)
            .query(&[("id", id), ("auth_key", self.options.auth_key.as_str())])
            .send()
            .await?;
        let envelope: ShellyEnvelope<DeviceStatusData> =
            serde_json::from_value(read_json(response).await?)?;
        let power = envelope
            .into_data()?
            .device_status
            .power()
            .ok_or_else(|| ClientError::Parse(format!("plug {id} reported no meters")))?;
        debug!("Plug {id} draws {power}W");
        Ok(power)
    }

    /// Switches the relay through the plug's local HTTP endpoint.
    pub async fn set_relay(&self, ip: &str, on: bool) -> Result<(), ClientError> {
        if ip.is_empty() {
            return Err(ClientError::Generic(
                "plug has no known network address".to_string(),
            ));
        }
        let url = self.options.relay_url(ip);
        let turn = if on { "on" } else { "off" };
        let response = self.http.post(&url).query(&[("turn", turn)]).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status {
                status: status.as_u16(),
                url,
            });
        }
        info!("Relay at {ip} switched {turn}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults() {
        let options = ShellyOptions::builder()
            .host("https://shelly-136-eu.shelly.cloud/")
            .auth_key("secret")
            .build()
            .unwrap();
        assert_eq!(options.plug_models, vec!["SHPLG-S".to_string()]);
        assert_eq!(options.relay_channel, 0);
        assert_eq!(options.request_timeout, DEFAULT_REQUEST_TIMEOUT);
        assert_eq!(
            options.cloud_url("device/status"),
            "https://shelly-136-eu.shelly.cloud/device/status"
        );
        assert_eq!(options.relay_url("192.168.1.40"), "http://192.168.1.40/relay/0");
    }

    #[test]
    fn builder_requires_host() {
        assert!(ShellyOptions::builder().auth_key("secret").build().is_err());
    }
}
