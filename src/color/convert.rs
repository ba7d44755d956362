use serde::{Deserialize, Serialize};

use super::Rgb;

pub const HUE_MAX: u16 = 65535;
pub const SAT_MAX: u8 = 254;
pub const BRI_MAX: u8 = 254;

/// Color in the lamp protocol's integer ranges: hue `0..=65535`,
/// saturation and brightness `0..=254`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NativeColor {
    pub hue: u16,
    pub sat: u8,
    pub bri: u8,
}

impl NativeColor {
    pub const fn new(hue: u16, sat: u8, bri: u8) -> Self {
        Self { hue, sat, bri }
    }

    /// CSS color used to paint a lit bulb icon.
    pub fn css(&self) -> String {
        native_to_rgb(*self).hex()
    }
}

impl From<Rgb> for NativeColor {
    fn from(rgb: Rgb) -> Self {
        rgb_to_native(rgb)
    }
}

impl From<NativeColor> for Rgb {
    fn from(color: NativeColor) -> Self {
        native_to_rgb(color)
    }
}

fn scale(unit: f64, max: f64) -> f64 {
    (unit * max).round().clamp(0.0, max)
}

/// HSB conversion. Grey levels (including white and black) have hue 0 and
/// saturation 0.
pub fn rgb_to_native(rgb: Rgb) -> NativeColor {
    let r = rgb.r as f64 / 255.0;
    let g = rgb.g as f64 / 255.0;
    let b = rgb.b as f64 / 255.0;
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let bri = scale(max, BRI_MAX as f64) as u8;
    if delta == 0.0 {
        return NativeColor::new(0, 0, bri);
    }
    let sat = scale(delta / max, SAT_MAX as f64) as u8;

    let sector = if max == r {
        ((g - b) / delta).rem_euclid(6.0)
    } else if max == g {
        (b - r) / delta + 2.0
    } else {
        (r - g) / delta + 4.0
    };
    let hue = scale(sector / 6.0, HUE_MAX as f64) as u16;

    NativeColor::new(hue, sat, bri)
}

/// Inverse of [`rgb_to_native`]. Bulb icons are painted with it.
pub fn native_to_rgb(color: NativeColor) -> Rgb {
    let h = color.hue as f64 / HUE_MAX as f64 * 6.0;
    let s = color.sat as f64 / SAT_MAX as f64;
    let v = color.bri as f64 / BRI_MAX as f64;

    let c = s * v;
    let x = c * (1.0 - (h.rem_euclid(2.0) - 1.0).abs());
    let m = v - c;
    let (r, g, b) = match h.floor() as u8 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let channel = |u: f64| scale(u + m, 255.0) as u8;
    Rgb::new(channel(r), channel(g), channel(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::wheel::PALETTE;

    fn assert_close(a: Rgb, b: Rgb) {
        let d = |x: u8, y: u8| (x as i16 - y as i16).abs();
        assert!(
            d(a.r, b.r) <= 2 && d(a.g, b.g) <= 2 && d(a.b, b.b) <= 2,
            "{a:?} != {b:?}"
        );
    }

    #[test]
    fn white_and_black_have_no_hue() {
        assert_eq!(rgb_to_native(Rgb::WHITE), NativeColor::new(0, 0, 254));
        assert_eq!(rgb_to_native(Rgb::new(0, 0, 0)), NativeColor::new(0, 0, 0));
        assert_eq!(rgb_to_native(Rgb::new(128, 128, 128)).sat, 0);
    }

    #[test]
    fn primaries() {
        assert_eq!(rgb_to_native(Rgb::new(255, 0, 0)), NativeColor::new(0, 254, 254));
        assert_eq!(
            rgb_to_native(Rgb::new(0, 255, 0)),
            NativeColor::new(21845, 254, 254)
        );
        assert_eq!(
            rgb_to_native(Rgb::new(0, 0, 255)),
            NativeColor::new(43690, 254, 254)
        );
    }

    #[test]
    fn round_trip_is_visually_equivalent() {
        let samples = [
            Rgb::WHITE,
            Rgb::new(0, 0, 0),
            Rgb::new(255, 0, 0),
            Rgb::new(12, 200, 99),
            Rgb::new(168, 216, 38),
            Rgb::new(132, 214, 255),
            Rgb::new(250, 10, 240),
        ];
        for rgb in samples.into_iter().chain(PALETTE) {
            assert_close(native_to_rgb(rgb_to_native(rgb)), rgb);
        }
    }

    #[test]
    fn css_paints_the_hsb_color() {
        assert_eq!(NativeColor::new(0, 254, 254).css(), "#ff0000");
        assert_eq!(NativeColor::new(0, 0, 254).css(), "#ffffff");
        assert_eq!(NativeColor::new(32768, 127, 0).css(), "#000000");
    }
}
