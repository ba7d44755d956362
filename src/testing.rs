use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

use crate::color::NativeColor;
use crate::error::{DashboardError, Result};
use crate::registry::LampState;
use crate::remote::{LampApi, LampStatus, PlugApi, PlugStatus};

#[derive(Debug, Clone, PartialEq)]
pub enum LampCall {
    Power(String, bool),
    Brightness(String, u8),
    Color(String, NativeColor),
}

#[derive(Clone, Default)]
pub struct FakeLampApi {
    pub lamps: Arc<Mutex<Vec<(String, LampStatus)>>>,
    pub calls: Arc<RwLock<Vec<LampCall>>>,
    pub fetches: Arc<RwLock<Vec<String>>>,
    pub failing_fetches: Arc<Mutex<HashSet<String>>>,
    pub should_fail_writes: Arc<AtomicBool>,
}

impl FakeLampApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_lamp(self, id: &str, state: LampState) -> Self {
        self.lamps.lock().push((
            id.to_string(),
            LampStatus {
                name: format!("Lamp {id}"),
                state,
            },
        ));
        self
    }

    pub fn set_remote_state(&self, id: &str, state: LampState) {
        if let Some((_, status)) = self.lamps.lock().iter_mut().find(|(i, _)| i == id) {
            status.state = state;
        }
    }

    fn remote_state(&self, id: &str) -> Option<LampState> {
        self.lamps
            .lock()
            .iter()
            .find(|(i, _)| i == id)
            .map(|(_, s)| s.state)
    }

    pub fn fail_fetch(&self, id: &str) {
        self.failing_fetches.lock().insert(id.to_string());
    }

    pub fn fail_writes(&self, fail: bool) {
        self.should_fail_writes.store(fail, Ordering::Relaxed);
    }

    pub async fn color_calls(&self) -> Vec<(String, NativeColor)> {
        self.calls
            .read()
            .await
            .iter()
            .filter_map(|c| match c {
                LampCall::Color(id, color) => Some((id.clone(), *color)),
                _ => None,
            })
            .collect()
    }

    fn update_remote(&self, id: &str, f: impl FnOnce(&mut LampState)) {
        if let Some((_, status)) = self.lamps.lock().iter_mut().find(|(i, _)| i == id) {
            f(&mut status.state);
        }
    }

    async fn record(&self, call: LampCall) -> Result<()> {
        if self.should_fail_writes.load(Ordering::Relaxed) {
            return Err(DashboardError::RemoteWrite("Fake error".to_string()));
        }
        self.calls.write().await.push(call);
        Ok(())
    }
}

#[async_trait]
impl LampApi for FakeLampApi {
    async fn fetch_fleet_status(&self) -> Result<Vec<(String, LampStatus)>> {
        Ok(self.lamps.lock().clone())
    }

    async fn fetch_state(&self, id: &str) -> Result<LampState> {
        self.fetches.write().await.push(id.to_string());
        if self.failing_fetches.lock().contains(id) {
            return Err(DashboardError::RemoteFetch(format!("Fake error for {id}")));
        }
        self.remote_state(id)
            .ok_or_else(|| DashboardError::RemoteFetch(format!("unknown lamp {id}")))
    }

    async fn set_power(&self, id: &str, on: bool) -> Result<()> {
        self.record(LampCall::Power(id.to_string(), on)).await?;
        self.update_remote(id, |s| s.on = on);
        Ok(())
    }

    async fn set_brightness(&self, id: &str, bri: u8) -> Result<()> {
        self.record(LampCall::Brightness(id.to_string(), bri)).await?;
        self.update_remote(id, |s| s.bri = bri);
        Ok(())
    }

    async fn set_color(&self, id: &str, color: NativeColor) -> Result<()> {
        self.record(LampCall::Color(id.to_string(), color)).await?;
        self.update_remote(id, |s| {
            s.hue = color.hue;
            s.sat = color.sat;
            s.bri = color.bri;
        });
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct FakePlugApi {
    pub plugs: Arc<Mutex<Vec<(String, PlugStatus)>>>,
    pub power: Arc<Mutex<HashMap<String, f64>>>,
    pub switch_calls: Arc<RwLock<Vec<(String, String, bool)>>>,
    pub failing_fetches: Arc<Mutex<HashSet<String>>>,
    pub should_fail_writes: Arc<AtomicBool>,
    pub should_fail_listing: Arc<AtomicBool>,
}

impl FakePlugApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_plug(self, id: &str, power: f64) -> Self {
        let host = self.plugs.lock().len() + 10;
        self.plugs.lock().push((
            id.to_string(),
            PlugStatus {
                address: format!("10.0.0.{host}"),
                name: format!("Plug {id}"),
                is_on: false,
                power,
            },
        ));
        self.power.lock().insert(id.to_string(), power);
        self
    }

    pub fn set_power(&self, id: &str, watts: f64) {
        self.power.lock().insert(id.to_string(), watts);
    }

    pub fn fail_fetch(&self, id: &str) {
        self.failing_fetches.lock().insert(id.to_string());
    }

    pub fn fail_writes(&self, fail: bool) {
        self.should_fail_writes.store(fail, Ordering::Relaxed);
    }
}

#[async_trait]
impl PlugApi for FakePlugApi {
    async fn fetch_fleet_status(&self) -> Result<Vec<(String, PlugStatus)>> {
        if self.should_fail_listing.load(Ordering::Relaxed) {
            return Err(DashboardError::RemoteFetch("Fake error".to_string()));
        }
        Ok(self.plugs.lock().clone())
    }

    async fn fetch_power(&self, id: &str) -> Result<f64> {
        if self.failing_fetches.lock().contains(id) {
            return Err(DashboardError::RemoteFetch(format!("Fake error for {id}")));
        }
        self.power
            .lock()
            .get(id)
            .copied()
            .ok_or_else(|| DashboardError::RemoteFetch(format!("unknown plug {id}")))
    }

    async fn set_state(&self, id: &str, address: &str, on: bool) -> Result<()> {
        if self.should_fail_writes.load(Ordering::Relaxed) {
            return Err(DashboardError::RemoteWrite("Fake error".to_string()));
        }
        self.switch_calls
            .write()
            .await
            .push((id.to_string(), address.to_string(), on));
        Ok(())
    }
}
