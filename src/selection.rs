//! Color wheel interaction: which lamp the wheel targets and the color under
//! the pointer.

use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::color::{NativeColor, Pointer, Rgb, WidgetRect, sample_at};
use crate::error::Result;
use crate::policy::{ColorOutcome, DeferredColorPolicy};
use crate::registry::DeviceRegistry;

#[derive(Debug, Default)]
struct SelectionInner {
    target: Option<String>,
    sample: Option<Rgb>,
}

#[derive(Debug, Clone, Default)]
pub struct ColorSelection {
    inner: Arc<Mutex<SelectionInner>>,
}

impl ColorSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Point the wheel at a lamp. Fails if no such lamp is registered.
    pub fn select(&self, registry: &DeviceRegistry, id: &str) -> Result<()> {
        registry.lamp(id)?;
        self.inner.lock().target = Some(id.to_string());
        debug!("Color wheel now targets lamp {id}");
        Ok(())
    }

    pub fn clear(&self) {
        self.inner.lock().target = None;
    }

    pub fn target(&self) -> Option<String> {
        self.inner.lock().target.clone()
    }

    pub fn sample(&self) -> Option<Rgb> {
        self.inner.lock().sample
    }

    /// Sample the wheel under the pointer and keep it as the current preview.
    /// Positions that cannot be mapped leave the previous sample in place.
    pub fn track(&self, pointer: Pointer, rect: WidgetRect) -> Option<Rgb> {
        let rgb = sample_at(pointer, rect)?;
        self.inner.lock().sample = Some(rgb);
        Some(rgb)
    }

    /// Send the current sample to the targeted lamp and release the target.
    /// Without a target, or before the pointer ever moved, nothing is written.
    pub async fn commit(&self, policy: &DeferredColorPolicy) -> Result<Option<ColorOutcome>> {
        let (id, sample) = {
            let mut inner = self.inner.lock();
            let Some(sample) = inner.sample else {
                debug!("Color wheel clicked before any pointer sample");
                return Ok(None);
            };
            let Some(id) = inner.target.take() else {
                warn!("Color wheel clicked without a lamp selected");
                return Ok(None);
            };
            (id, sample)
        };

        let color = NativeColor::from(sample);
        debug!("Color wheel picked {} for lamp {id}", sample.hex());
        policy.select_color(&id, color).await.map(Some)
    }
}
