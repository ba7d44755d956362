mod protocol;

pub use protocol::DEFAULT_REQUEST_TIMEOUT;
pub use protocol::error::ClientError;
pub use protocol::hue::{HueClient, HueOptions, HueOptionsBuilder};
pub use protocol::messages::{HueLight, HueLightState, HueStateCommand, PlugInfo};
pub use protocol::shelly::{DEFAULT_PLUG_MODEL, ShellyClient, ShellyOptions, ShellyOptionsBuilder};
