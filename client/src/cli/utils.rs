use smarthome_client_rs::{ClientError, HueClient, HueOptions, ShellyClient, ShellyOptions};

use crate::Params;

fn missing(flag: &str) -> ClientError {
    ClientError::Generic(format!("missing --{flag}"))
}

pub fn create_shelly_client(params: &Params) -> Result<ShellyClient, ClientError> {
    let options = ShellyOptions::builder()
        .host(params.shelly_host.clone().ok_or_else(|| missing("shelly-host"))?)
        .auth_key(params.shelly_key.clone().ok_or_else(|| missing("shelly-key"))?)
        .build()
        .map_err(|e| ClientError::Generic(e.to_string()))?;
    ShellyClient::new(options)
}

pub fn create_hue_client(params: &Params) -> Result<HueClient, ClientError> {
    let options = HueOptions::builder()
        .bridge(params.hue_bridge.clone().ok_or_else(|| missing("hue-bridge"))?)
        .username(params.hue_user.clone().ok_or_else(|| missing("hue-user"))?)
        .build()
        .map_err(|e| ClientError::Generic(e.to_string()))?;
    HueClient::new(options)
}
