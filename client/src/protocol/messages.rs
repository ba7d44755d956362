use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::protocol::error::ClientError;

/// Envelope returned by every Shelly Cloud endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ShellyEnvelope<T> {
    #[serde(default)]
    pub isok: bool,
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Option<Value>,
}

impl<T> ShellyEnvelope<T> {
    pub fn into_data(self) -> Result<T, ClientError> {
        match (self.isok, self.data) {
            (true, Some(data)) => Ok(data),
            (_, _) => Err(ClientError::Rejected(
                self.errors
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| "no data in cloud response".to_string()),
            )),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AllStatusData {
    #[serde(default)]
    pub devices_status: HashMap<String, ShellyDeviceStatus>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeviceStatusData {
    pub device_status: ShellyDeviceStatus,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShellyDeviceStatus {
    #[serde(rename = "_dev_info", default)]
    pub dev_info: Option<ShellyDevInfo>,
    #[serde(default)]
    pub wifi_sta: Option<WifiStation>,
    #[serde(default)]
    pub getinfo: Option<ShellyGetInfo>,
    #[serde(default)]
    pub relays: Vec<Relay>,
    #[serde(default)]
    pub meters: Vec<Meter>,
}

impl ShellyDeviceStatus {
    pub fn model_code(&self) -> Option<&str> {
        self.dev_info.as_ref().map(|info| info.code.as_str())
    }

    pub fn ip(&self) -> Option<&str> {
        self.wifi_sta.as_ref().and_then(|w| w.ip.as_deref())
    }

    pub fn device_name(&self) -> Option<&str> {
        self.getinfo
            .as_ref()
            .map(|info| info.fw_info.device.as_str())
    }

    pub fn is_on(&self) -> bool {
        self.relays.first().map(|r| r.ison).unwrap_or_default()
    }

    pub fn power(&self) -> Option<f64> {
        self.meters.first().map(|m| m.power)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShellyDevInfo {
    pub code: String,
    #[serde(default)]
    pub id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WifiStation {
    #[serde(default)]
    pub ip: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShellyGetInfo {
    pub fw_info: FirmwareInfo,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FirmwareInfo {
    pub device: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Relay {
    pub ison: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Meter {
    pub power: f64,
}

/// A Shelly plug as reported by the cloud fleet listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlugInfo {
    pub id: String,
    pub ip: String,
    pub name: String,
    pub is_on: bool,
    pub power: f64,
}

/// Hue bridge light state (REST v1).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HueLightState {
    pub on: bool,
    #[serde(default)]
    pub bri: u8,
    #[serde(default)]
    pub hue: u16,
    #[serde(default)]
    pub sat: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reachable: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HueLight {
    pub name: String,
    pub state: HueLightState,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub light_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modelid: Option<String>,
}

/// Body of `PUT /lights/{id}/state`. Only the populated fields are sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HueStateCommand {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bri: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hue: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sat: Option<u8>,
}

impl HueStateCommand {
    pub fn power(on: bool) -> Self {
        Self {
            on: Some(on),
            ..Default::default()
        }
    }

    pub fn brightness(bri: u8) -> Self {
        Self {
            bri: Some(bri),
            ..Default::default()
        }
    }

    pub fn color(hue: u16, sat: u8, bri: u8) -> Self {
        Self {
            hue: Some(hue),
            sat: Some(sat),
            bri: Some(bri),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HueApiError {
    #[serde(rename = "type")]
    pub error_type: i64,
    #[serde(default)]
    pub address: String,
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HueWriteResult {
    #[serde(default)]
    pub success: Option<Value>,
    #[serde(default)]
    pub error: Option<HueApiError>,
}

/// The bridge reports failures as a list of `{"error": ...}` entries, even on
/// endpoints that normally answer with an object.
pub fn hue_errors(value: &Value) -> Option<String> {
    let entries = value.as_array()?;
    let errors = entries
        .iter()
        .filter_map(|entry| serde_json::from_value::<HueWriteResult>(entry.clone()).ok())
        .filter_map(|result| result.error)
        .map(|e| format!("{} ({}): {}", e.error_type, e.address, e.description))
        .collect::<Vec<_>>();
    if errors.is_empty() {
        None
    } else {
        Some(errors.join("; "))
    }
}

pub fn decode_hue<T: serde::de::DeserializeOwned>(value: Value) -> Result<T, ClientError> {
    if let Some(errors) = hue_errors(&value) {
        return Err(ClientError::Rejected(errors));
    }
    Ok(serde_json::from_value(value)?)
}
