use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use derive_builder::Builder;
use tracing::{debug, info};

use crate::protocol::DEFAULT_REQUEST_TIMEOUT;
use crate::protocol::error::{ClientError, read_json};
use crate::protocol::messages::{HueLight, HueStateCommand, decode_hue, hue_errors};

#[derive(Builder, Debug, Clone)]
#[builder(setter(into))]
pub struct HueOptions {
    /// Bridge address, either `192.168.1.2` or a full `http://` URL.
    pub bridge: String,
    /// Whitelisted API user created on the bridge.
    pub username: String,
    #[builder(default = "DEFAULT_REQUEST_TIMEOUT")]
    pub request_timeout: Duration,
}

impl HueOptions {
    pub fn builder() -> HueOptionsBuilder {
        HueOptionsBuilder::default()
    }

    fn base_url(&self) -> String {
        let bridge = self.bridge.trim_end_matches('/');
        if bridge.starts_with("http://") || bridge.starts_with("https://") {
            format!("{bridge}/api/{}", self.username)
        } else {
            format!("http://{bridge}/api/{}", self.username)
        }
    }
}

#[derive(Clone)]
pub struct HueClient {
    http: reqwest::Client,
    base_url: Arc<str>,
}

impl HueClient {
    pub fn new(options: HueOptions) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(options.request_timeout)
            .build()?;
        Ok(Self {
            http,
            base_url: options.base_url().into(),
        })
    }

    pub async fn fetch_lights(&self) -> Result<HashMap<String, HueLight>, ClientError> {
        let url = format!("{}/lights", self.base_url);
        let response = self.http.get(&url).send().await?;
        let lights: HashMap<String, HueLight> = decode_hue(read_json(response).await?)?;
        info!("Hue bridge reported {} lights", lights.len());
        Ok(lights)
    }

    pub async fn fetch_light(&self, id: &str) -> Result<HueLight, ClientError> {
        let url = format!("{}/lights/{id}", self.base_url);
        let response = self.http.get(&url).send().await?;
        decode_hue(read_json(response).await?)
    }

    pub async fn set_state(&self, id: &str, command: &HueStateCommand) -> Result<(), ClientError> {
        let url = format!("{}/lights/{id}/state", self.base_url);
        debug!("PUT {url}: {command:?}");
        let response = self.http.put(&url).json(command).send().await?;
        let body = read_json(response).await?;
        match hue_errors(&body) {
            Some(errors) => Err(ClientError::Rejected(errors)),
            None => Ok(()),
        }
    }

    pub async fn set_power(&self, id: &str, on: bool) -> Result<(), ClientError> {
        self.set_state(id, &HueStateCommand::power(on)).await
    }

    pub async fn set_brightness(&self, id: &str, bri: u8) -> Result<(), ClientError> {
        self.set_state(id, &HueStateCommand::brightness(bri)).await
    }

    pub async fn set_color(&self, id: &str, hue: u16, sat: u8, bri: u8) -> Result<(), ClientError> {
        self.set_state(id, &HueStateCommand::color(hue, sat, bri))
            .await
    }
}
