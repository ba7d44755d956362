mod lamps;
mod plugs;

pub use lamps::{lamp_brightness, lamp_color, lamp_power, list_lamps};
pub use plugs::{list_plugs, switch_plug};
