//! Pointer position on the circular color picker to RGB.
//!
//! The wheel is a ring of six anchor colors laid out clockwise from the top,
//! fading to white toward the center.

use serde::{Deserialize, Serialize};

use super::Rgb;

/// Anchor colors clockwise from the top. The last entry closes the cycle.
pub const PALETTE: [Rgb; 7] = [
    Rgb::new(0xe4, 0x3f, 0x00),
    Rgb::new(0xfa, 0xe4, 0x10),
    Rgb::new(0x55, 0xcc, 0x3b),
    Rgb::new(0x09, 0xad, 0xff),
    Rgb::new(0x6b, 0x0e, 0xfd),
    Rgb::new(0xe7, 0x0d, 0x86),
    Rgb::new(0xe4, 0x3f, 0x00),
];

/// Normalized radius from which the ring color is used unblended.
pub const SATURATED_RADIUS: f64 = 0.8;

/// Pointer position in page coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pointer {
    pub x: f64,
    pub y: f64,
}

/// Bounding box of the wheel widget in page coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WidgetRect {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl WidgetRect {
    pub fn centered(cx: f64, cy: f64, radius: f64) -> Self {
        Self {
            left: cx - radius,
            top: cy - radius,
            right: cx + radius,
            bottom: cy + radius,
        }
    }

    /// Maps a pointer to `[-1, 1]` on both axes, x to the right and y up.
    /// Returns `None` for a degenerate (zero-sized) widget.
    pub fn normalize(&self, pointer: Pointer) -> Option<(f64, f64)> {
        let width = self.right - self.left;
        let height = self.bottom - self.top;
        if width <= 0.0 || height <= 0.0 {
            return None;
        }
        let x = 2.0 * (pointer.x - self.left) / width - 1.0;
        let y = 1.0 - 2.0 * (pointer.y - self.top) / height;
        Some((x, y))
    }
}

/// Clockwise heading in degrees, 0 at the top, in `[0, 360)`.
pub fn heading(x: f64, y: f64) -> f64 {
    (90.0 - y.atan2(x).to_degrees()).rem_euclid(360.0)
}

/// Unrounded ring color at the given heading.
pub fn ring_color(heading: f64) -> [f64; 3] {
    let segments = (PALETTE.len() - 1) as f64;
    let position = heading.rem_euclid(360.0) / 360.0 * segments;
    let i0 = position.floor() as usize % PALETTE.len();
    let i1 = (i0 + 1) % PALETTE.len();
    let w1 = position - position.floor();
    let w0 = 1.0 - w1;
    let (c0, c1) = (PALETTE[i0], PALETTE[i1]);
    [
        c0.r as f64 * w0 + c1.r as f64 * w1,
        c0.g as f64 * w0 + c1.g as f64 * w1,
        c0.b as f64 * w0 + c1.b as f64 * w1,
    ]
}

/// Weight of the ring color against white for a normalized radius.
pub fn color_weight(radius: f64) -> f64 {
    let r = radius.clamp(0.0, 1.0);
    if r < SATURATED_RADIUS {
        r / SATURATED_RADIUS
    } else {
        1.0
    }
}

/// Color under a normalized pointer position.
pub fn sample(x: f64, y: f64) -> Rgb {
    let ring = ring_color(heading(x, y));
    let cw = color_weight((x * x + y * y).sqrt());
    let ww = 1.0 - cw;
    let blend = |c: f64| (c * cw + 255.0 * ww).round().clamp(0.0, 255.0) as u8;
    Rgb::new(blend(ring[0]), blend(ring[1]), blend(ring[2]))
}

/// Color under a pointer for the given widget geometry.
pub fn sample_at(pointer: Pointer, rect: WidgetRect) -> Option<Rgb> {
    rect.normalize(pointer).map(|(x, y)| sample(x, y))
}
