//! In-memory device model shared by the synchronizer, the controls and the web UI.
//!
//! The registry owns every plug and lamp record. Everything else reads through
//! it and mutates it with merge-style patches, so a patch only ever touches the
//! fields it carries.

use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

use crate::color::NativeColor;
use crate::error::{DashboardError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    Plug,
    Lamp,
}

impl DeviceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceKind::Plug => "plug",
            DeviceKind::Lamp => "lamp",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Plug {
    pub id: String,
    pub address: String,
    pub name: String,
    pub is_on: bool,
    /// Last known power draw in watts.
    pub power: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LampState {
    pub on: bool,
    pub hue: u16,
    pub sat: u8,
    pub bri: u8,
}

impl LampState {
    pub fn color(&self) -> NativeColor {
        NativeColor::new(self.hue, self.sat, self.bri)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Lamp {
    pub id: String,
    pub name: String,
    pub state: LampState,
    /// Color chosen while the lamp was off, written on the next power-on.
    pub saved_color: Option<NativeColor>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Device {
    Plug(Plug),
    Lamp(Lamp),
}

impl Device {
    pub fn id(&self) -> &str {
        match self {
            Device::Plug(plug) => &plug.id,
            Device::Lamp(lamp) => &lamp.id,
        }
    }

    pub fn kind(&self) -> DeviceKind {
        match self {
            Device::Plug(_) => DeviceKind::Plug,
            Device::Lamp(_) => DeviceKind::Lamp,
        }
    }

    pub fn into_plug(self) -> Option<Plug> {
        match self {
            Device::Plug(plug) => Some(plug),
            Device::Lamp(_) => None,
        }
    }

    pub fn into_lamp(self) -> Option<Lamp> {
        match self {
            Device::Lamp(lamp) => Some(lamp),
            Device::Plug(_) => None,
        }
    }
}

impl From<Plug> for Device {
    fn from(plug: Plug) -> Self {
        Device::Plug(plug)
    }
}

impl From<Lamp> for Device {
    fn from(lamp: Lamp) -> Self {
        Device::Lamp(lamp)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlugPatch {
    pub address: Option<String>,
    pub name: Option<String>,
    pub is_on: Option<bool>,
    pub power: Option<f64>,
}

impl PlugPatch {
    pub fn power(watts: f64) -> Self {
        Self {
            power: Some(watts),
            ..Default::default()
        }
    }

    pub fn switched(is_on: bool) -> Self {
        Self {
            is_on: Some(is_on),
            ..Default::default()
        }
    }

    fn apply(&self, plug: &mut Plug) {
        if let Some(address) = &self.address {
            plug.address = address.clone();
        }
        if let Some(name) = &self.name {
            plug.name = name.clone();
        }
        if let Some(is_on) = self.is_on {
            plug.is_on = is_on;
        }
        if let Some(power) = self.power {
            plug.power = power;
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LampPatch {
    pub on: Option<bool>,
    pub hue: Option<u16>,
    pub sat: Option<u8>,
    pub bri: Option<u8>,
}

impl LampPatch {
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

    pub fn color(color: NativeColor) -> Self {
        Self {
            hue: Some(color.hue),
            sat: Some(color.sat),
            bri: Some(color.bri),
            ..Default::default()
        }
    }

    fn apply(&self, state: &mut LampState) {
        if let Some(on) = self.on {
            state.on = on;
        }
        if let Some(hue) = self.hue {
            state.hue = hue;
        }
        if let Some(sat) = self.sat {
            state.sat = sat;
        }
        if let Some(bri) = self.bri {
            state.bri = bri;
        }
    }
}

impl From<LampState> for LampPatch {
    fn from(state: LampState) -> Self {
        Self {
            on: Some(state.on),
            hue: Some(state.hue),
            sat: Some(state.sat),
            bri: Some(state.bri),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StatePatch {
    Plug(PlugPatch),
    Lamp(LampPatch),
}

impl From<PlugPatch> for StatePatch {
    fn from(patch: PlugPatch) -> Self {
        StatePatch::Plug(patch)
    }
}

impl From<LampPatch> for StatePatch {
    fn from(patch: LampPatch) -> Self {
        StatePatch::Lamp(patch)
    }
}

#[derive(Debug, Default)]
struct RegistryInner {
    devices: HashMap<String, Device>,
    /// Registration order, used for stable rendering.
    order: Vec<String>,
}

impl RegistryInner {
    fn lamp_mut(&mut self, id: &str) -> Result<&mut Lamp> {
        match self.devices.get_mut(id) {
            Some(Device::Lamp(lamp)) => Ok(lamp),
            Some(Device::Plug(_)) => Err(DashboardError::WrongKind(id.to_string(), "lamp")),
            None => Err(DashboardError::NotFound(id.to_string())),
        }
    }
}

/// Shared device registry.
///
/// Cloning is cheap and every clone refers to the same records.
#[derive(Debug, Clone, Default)]
pub struct DeviceRegistry {
    inner: Arc<RwLock<RegistryInner>>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a device. Fails if a device with the same id already exists.
    pub fn register(&self, device: impl Into<Device>) -> Result<()> {
        let device = device.into();
        let mut inner = self.inner.write();
        let id = device.id().to_string();
        if inner.devices.contains_key(&id) {
            return Err(DashboardError::DuplicateDevice(id));
        }
        inner.order.push(id.clone());
        inner.devices.insert(id, device);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Result<Device> {
        self.inner
            .read()
            .devices
            .get(id)
            .cloned()
            .ok_or_else(|| DashboardError::NotFound(id.to_string()))
    }

    pub fn plug(&self, id: &str) -> Result<Plug> {
        self.get(id)?
            .into_plug()
            .ok_or_else(|| DashboardError::WrongKind(id.to_string(), "plug"))
    }

    pub fn lamp(&self, id: &str) -> Result<Lamp> {
        self.get(id)?
            .into_lamp()
            .ok_or_else(|| DashboardError::WrongKind(id.to_string(), "lamp"))
    }

    /// Merge a partial state into an existing record and return the result.
    ///
    /// A patch that would switch on a lamp holding a saved color is refused;
    /// that transition goes through [`DeviceRegistry::merge_lamp_taking_saved`].
    pub fn update_state(&self, id: &str, patch: impl Into<StatePatch>) -> Result<Device> {
        let patch = patch.into();
        let mut inner = self.inner.write();
        let device = inner
            .devices
            .get_mut(id)
            .ok_or_else(|| DashboardError::NotFound(id.to_string()))?;
        match (device, patch) {
            (Device::Plug(plug), StatePatch::Plug(patch)) => {
                patch.apply(plug);
                Ok(Device::Plug(plug.clone()))
            }
            (Device::Lamp(lamp), StatePatch::Lamp(patch)) => {
                if patch.on == Some(true) && lamp.saved_color.is_some() {
                    return Err(DashboardError::SavedColorPending(id.to_string()));
                }
                patch.apply(&mut lamp.state);
                Ok(Device::Lamp(lamp.clone()))
            }
            (Device::Plug(_), StatePatch::Lamp(_)) => {
                Err(DashboardError::WrongKind(id.to_string(), "lamp"))
            }
            (Device::Lamp(_), StatePatch::Plug(_)) => {
                Err(DashboardError::WrongKind(id.to_string(), "plug"))
            }
        }
    }

    /// Store a color for later if the lamp is off. Returns `false` without
    /// touching the record when the lamp is on.
    pub fn defer_color(&self, id: &str, color: NativeColor) -> Result<bool> {
        let mut inner = self.inner.write();
        let lamp = inner.lamp_mut(id)?;
        if lamp.state.on {
            return Ok(false);
        }
        lamp.saved_color = Some(color);
        Ok(true)
    }

    /// Merge a lamp patch and, if the lamp ends up on, remove and return its
    /// saved color in the same step.
    pub fn merge_lamp_taking_saved(
        &self,
        id: &str,
        patch: LampPatch,
    ) -> Result<(Lamp, Option<NativeColor>)> {
        let mut inner = self.inner.write();
        let lamp = inner.lamp_mut(id)?;
        patch.apply(&mut lamp.state);
        let saved = if lamp.state.on {
            lamp.saved_color.take()
        } else {
            None
        };
        Ok((lamp.clone(), saved))
    }

    /// Lazy listing of the devices of one kind in registration order.
    pub fn list(&self, kind: DeviceKind) -> DeviceList {
        let inner = self.inner.read();
        let ids = inner
            .order
            .iter()
            .filter(|id| inner.devices.get(*id).map(Device::kind) == Some(kind))
            .cloned()
            .collect::<Vec<_>>();
        DeviceList {
            registry: self.clone(),
            ids: ids.into(),
        }
    }

    pub fn plugs(&self) -> Vec<Plug> {
        self.list(DeviceKind::Plug)
            .iter()
            .filter_map(Device::into_plug)
            .collect()
    }

    pub fn lamps(&self) -> Vec<Lamp> {
        self.list(DeviceKind::Lamp)
            .iter()
            .filter_map(Device::into_lamp)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.read().devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().devices.is_empty()
    }

    pub fn count(&self, kind: DeviceKind) -> usize {
        self.inner
            .read()
            .devices
            .values()
            .filter(|d| d.kind() == kind)
            .count()
    }
}

/// Devices of one kind captured at listing time. Records are read from the
/// registry as the iterator advances, so they reflect the latest merges.
/// Iterating again starts over.
#[derive(Debug, Clone)]
pub struct DeviceList {
    registry: DeviceRegistry,
    ids: Arc<[String]>,
}

impl DeviceList {
    pub fn iter(&self) -> impl Iterator<Item = Device> + '_ {
        self.ids.iter().filter_map(|id| self.registry.get(id).ok())
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
