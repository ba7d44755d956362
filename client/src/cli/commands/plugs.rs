use smarthome_client_rs::ClientError;

use crate::{Params, utils::create_shelly_client};

pub async fn list_plugs(params: Params) -> Result<(), ClientError> {
    let client = create_shelly_client(&params)?;
    let mut plugs = client.fetch_plugs().await?;
    plugs.sort_by(|a, b| a.id.cmp(&b.id));
    for plug in plugs {
        println!(
            "Plug '{}' ({}) at {} is {}, drawing {}W",
            plug.name,
            plug.id,
            plug.ip,
            if plug.is_on { "on" } else { "off" },
            plug.power
        );
    }
    Ok(())
}

pub async fn switch_plug(params: Params, id: &str, on: bool) -> Result<(), ClientError> {
    let client = create_shelly_client(&params)?;
    let plug = client
        .fetch_plugs()
        .await?
        .into_iter()
        .find(|p| p.id == id)
        .ok_or_else(|| ClientError::Generic(format!("unknown plug {id}")))?;
    client.set_relay(&plug.ip, on).await?;
    println!("Plug {} switched {}", id, if on { "on" } else { "off" });
    Ok(())
}
