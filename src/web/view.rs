//! View models rendered by the dashboard page and returned by `/api/devices`.
//!
//! Everything here is a pure function of registry records and the wheel
//! selection.

use serde::Serialize;

use crate::registry::{DeviceRegistry, Lamp, Plug};
use crate::selection::ColorSelection;

const ON_COLOR: &str = "green";
const OFF_COLOR: &str = "red";
const DARK_BULB: &str = "grey";

fn power_icon(on: bool) -> &'static str {
    if on { ON_COLOR } else { OFF_COLOR }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlugView {
    pub id: String,
    pub name: String,
    pub is_on: bool,
    pub power_text: String,
    pub power_color: &'static str,
}

impl From<&Plug> for PlugView {
    fn from(plug: &Plug) -> Self {
        Self {
            id: plug.id.clone(),
            name: plug.name.clone(),
            is_on: plug.is_on,
            power_text: format!("{}W", plug.power),
            power_color: power_icon(plug.is_on),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LampView {
    pub id: String,
    pub name: String,
    pub is_on: bool,
    pub bri: u8,
    pub bulb_color: String,
    pub power_color: &'static str,
    pub brightness_text: String,
    /// Brightness can only be changed while the lamp is lit.
    pub slider_enabled: bool,
    pub pending_color: bool,
    pub targeted: bool,
}

impl LampView {
    pub fn new(lamp: &Lamp, target: Option<&str>) -> Self {
        let state = lamp.state;
        Self {
            id: lamp.id.clone(),
            name: lamp.name.clone(),
            is_on: state.on,
            bri: state.bri,
            bulb_color: if state.on {
                state.color().css()
            } else {
                DARK_BULB.to_string()
            },
            power_color: power_icon(state.on),
            brightness_text: format!("Brightness: {}", state.bri),
            slider_enabled: state.on,
            pending_color: lamp.saved_color.is_some(),
            targeted: target == Some(lamp.id.as_str()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    pub plugs: Vec<PlugView>,
    pub lamps: Vec<LampView>,
    pub target: Option<String>,
    /// Hex color under the pointer, once it moved over the wheel.
    pub sample: Option<String>,
}

pub fn project(registry: &DeviceRegistry, selection: &ColorSelection) -> DashboardView {
    let target = selection.target();
    DashboardView {
        plugs: registry.plugs().iter().map(PlugView::from).collect(),
        lamps: registry
            .lamps()
            .iter()
            .map(|lamp| LampView::new(lamp, target.as_deref()))
            .collect(),
        sample: selection.sample().map(|rgb| rgb.hex()),
        target,
    }
}
