use smarthome_client_rs::ClientError;

use crate::{Params, utils::create_hue_client};

pub async fn list_lamps(params: Params) -> Result<(), ClientError> {
    let client = create_hue_client(&params)?;
    let mut lamps = client.fetch_lights().await?.into_iter().collect::<Vec<_>>();
    lamps.sort_by(|a, b| a.0.cmp(&b.0));
    for (id, lamp) in lamps {
        println!(
            "Lamp '{}' ({}) is {}: hue {} sat {} bri {}",
            lamp.name,
            id,
            if lamp.state.on { "on" } else { "off" },
            lamp.state.hue,
            lamp.state.sat,
            lamp.state.bri
        );
    }
    Ok(())
}

pub async fn lamp_power(params: Params, id: &str, on: bool) -> Result<(), ClientError> {
    let client = create_hue_client(&params)?;
    client.set_power(id, on).await?;
    println!("Lamp {} switched {}", id, if on { "on" } else { "off" });
    Ok(())
}

pub async fn lamp_brightness(params: Params, id: &str, bri: u8) -> Result<(), ClientError> {
    let client = create_hue_client(&params)?;
    client.set_brightness(id, bri).await?;
    println!("Lamp {id} brightness set to {bri}");
    Ok(())
}

pub async fn lamp_color(
    params: Params,
    id: &str,
    hue: u16,
    sat: u8,
    bri: u8,
) -> Result<(), ClientError> {
    let client = create_hue_client(&params)?;
    client.set_color(id, hue, sat, bri).await?;
    println!("Lamp {id} color set to hue {hue} sat {sat} bri {bri}");
    Ok(())
}
