//! Colour handling for pixel comparison.
//!
//! Perceptual comparison converts sRGB pixels to CIE L*a*b* (D65) and
//! measures distance with CIEDE2000, so a tolerance of ~2.3 corresponds to a
//! just-noticeable difference.

use crate::result::GoldshotError;
use image::Rgba;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Colour painted over differing pixels in diff images
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HighlightColor {
    /// Red channel
    pub r: u8,
    /// Green channel
    pub g: u8,
    /// Blue channel
    pub b: u8,
}

impl HighlightColor {
    /// `#ff00ff`, the default diff highlight
    pub const MAGENTA: Self = Self::new(255, 0, 255);

    /// Create a new colour
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Opaque RGBA pixel of this colour
    #[must_use]
    pub const fn to_rgba(self) -> Rgba<u8> {
        Rgba([self.r, self.g, self.b, 255])
    }

    /// `#rrggbb` representation
    #[must_use]
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl Default for HighlightColor {
    fn default() -> Self {
        Self::MAGENTA
    }
}

impl FromStr for HighlightColor {
    type Err = GoldshotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || GoldshotError::InvalidColor {
            value: s.to_string(),
        };
        let hex = s.trim().strip_prefix('#').ok_or_else(invalid)?;
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(invalid());
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());
        Ok(Self::new(channel(0)?, channel(2)?, channel(4)?))
    }
}

impl std::fmt::Display for HighlightColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// A colour in CIE L*a*b* space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lab {
    /// Lightness (0-100)
    pub l: f64,
    /// Green-red axis
    pub a: f64,
    /// Blue-yellow axis
    pub b: f64,
}

impl Lab {
    /// Create a Lab colour from components
    #[must_use]
    pub const fn new(l: f64, a: f64, b: f64) -> Self {
        Self { l, a, b }
    }

    /// Convert an sRGB pixel (alpha ignored) to Lab under D65
    #[must_use]
    pub fn from_rgba(pixel: Rgba<u8>) -> Self {
        let Rgba([r, g, b, _]) = pixel;
        let (r, g, b) = (linearize(r), linearize(g), linearize(b));

        let x = (0.412_456_4 * r + 0.357_576_1 * g + 0.180_437_5 * b) / 0.950_47;
        let y = 0.212_672_9 * r + 0.715_152_2 * g + 0.072_175_0 * b;
        let z = (0.019_333_9 * r + 0.119_192_0 * g + 0.950_304_1 * b) / 1.088_83;

        let (fx, fy, fz) = (lab_f(x), lab_f(y), lab_f(z));
        Self {
            l: 116.0 * fy - 16.0,
            a: 500.0 * (fx - fy),
            b: 200.0 * (fy - fz),
        }
    }
}

fn linearize(channel: u8) -> f64 {
    let c = f64::from(channel) / 255.0;
    if c <= 0.040_45 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

fn lab_f(t: f64) -> f64 {
    const DELTA: f64 = 6.0 / 29.0;
    if t > DELTA * DELTA * DELTA {
        t.cbrt()
    } else {
        t / (3.0 * DELTA * DELTA) + 4.0 / 29.0
    }
}

fn hue_degrees(b: f64, a: f64) -> f64 {
    if a == 0.0 && b == 0.0 {
        return 0.0;
    }
    let h = b.atan2(a).to_degrees();
    if h < 0.0 {
        h + 360.0
    } else {
        h
    }
}

/// CIEDE2000 colour difference (kL = kC = kH = 1)
#[must_use]
pub fn ciede2000(first: Lab, second: Lab) -> f64 {
    const POW25_7: f64 = 6_103_515_625.0;

    let c1 = first.a.hypot(first.b);
    let c2 = second.a.hypot(second.b);
    let c_bar7 = ((c1 + c2) / 2.0).powi(7);
    let g = 0.5 * (1.0 - (c_bar7 / (c_bar7 + POW25_7)).sqrt());

    let a1 = (1.0 + g) * first.a;
    let a2 = (1.0 + g) * second.a;
    let c1p = a1.hypot(first.b);
    let c2p = a2.hypot(second.b);
    let h1p = hue_degrees(first.b, a1);
    let h2p = hue_degrees(second.b, a2);

    let delta_l = second.l - first.l;
    let delta_c = c2p - c1p;
    let chroma_product = c1p * c2p;

    let delta_h_angle = if chroma_product == 0.0 {
        0.0
    } else {
        let diff = h2p - h1p;
        if diff.abs() <= 180.0 {
            diff
        } else if diff > 180.0 {
            diff - 360.0
        } else {
            diff + 360.0
        }
    };
    let delta_h = 2.0 * chroma_product.sqrt() * (delta_h_angle.to_radians() / 2.0).sin();

    let l_bar = (first.l + second.l) / 2.0;
    let c_bar_p = (c1p + c2p) / 2.0;
    let h_bar = if chroma_product == 0.0 {
        h1p + h2p
    } else if (h1p - h2p).abs() <= 180.0 {
        (h1p + h2p) / 2.0
    } else if h1p + h2p < 360.0 {
        (h1p + h2p + 360.0) / 2.0
    } else {
        (h1p + h2p - 360.0) / 2.0
    };

    let t = 1.0 - 0.17 * (h_bar - 30.0).to_radians().cos()
        + 0.24 * (2.0 * h_bar).to_radians().cos()
        + 0.32 * (3.0 * h_bar + 6.0).to_radians().cos()
        - 0.20 * (4.0 * h_bar - 63.0).to_radians().cos();

    let delta_theta = 30.0 * (-((h_bar - 275.0) / 25.0).powi(2)).exp();
    let c_bar_p7 = c_bar_p.powi(7);
    let r_c = 2.0 * (c_bar_p7 / (c_bar_p7 + POW25_7)).sqrt();
    let l_offset = (l_bar - 50.0).powi(2);
    let s_l = 1.0 + 0.015 * l_offset / (20.0 + l_offset).sqrt();
    let s_c = 1.0 + 0.045 * c_bar_p;
    let s_h = 1.0 + 0.015 * c_bar_p * t;
    let r_t = -(2.0 * delta_theta).to_radians().sin() * r_c;

    let dl = delta_l / s_l;
    let dc = delta_c / s_c;
    let dh = delta_h / s_h;
    (dl * dl + dc * dc + dh * dh + r_t * dc * dh).sqrt()
}

/// Perceptual distance between two pixels
#[must_use]
pub fn perceptual_diff(a: Rgba<u8>, b: Rgba<u8>) -> f64 {
    if a == b {
        return 0.0;
    }
    ciede2000(Lab::from_rgba(a), Lab::from_rgba(b))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn close(actual: f64, expected: f64) -> bool {
        (actual - expected).abs() < 1e-3
    }

    #[test]
    fn test_ciede2000_reference_pairs() {
        // Sharma, Wu & Dalal (2005) test data
        let cases = [
            ((50.0, 2.6772, -79.7751), (50.0, 0.0, -82.7485), 2.0425),
            ((50.0, 3.1571, -77.2803), (50.0, 0.0, -82.7485), 2.8615),
            ((50.0, 0.0, 0.0), (50.0, -1.0, 2.0), 2.3669),
            ((50.0, 2.5, 0.0), (73.0, 25.0, -18.0), 27.1492),
            ((60.2574, -34.0099, 36.2677), (60.4626, -34.1751, 39.4387), 1.2644),
        ];
        for ((l1, a1, b1), (l2, a2, b2), expected) in cases {
            let de = ciede2000(Lab::new(l1, a1, b1), Lab::new(l2, a2, b2));
            assert!(close(de, expected), "expected {expected}, got {de}");
        }
    }

    #[test]
    fn test_ciede2000_symmetric() {
        let a = Lab::new(50.0, 2.6772, -79.7751);
        let b = Lab::new(50.0, 0.0, -82.7485);
        assert!(close(ciede2000(a, b), ciede2000(b, a)));
    }

    #[test]
    fn test_lab_white_and_black() {
        let white = Lab::from_rgba(Rgba([255, 255, 255, 255]));
        assert!((white.l - 100.0).abs() < 0.01);
        assert!(white.a.abs() < 0.01);
        assert!(white.b.abs() < 0.01);

        let black = Lab::from_rgba(Rgba([0, 0, 0, 255]));
        assert!(black.l.abs() < 0.01);
    }

    #[test]
    fn test_perceptual_diff() {
        let white = Rgba([255, 255, 255, 255]);
        let black = Rgba([0, 0, 0, 255]);
        let near_white = Rgba([254, 254, 254, 255]);

        assert!((perceptual_diff(white, white) - 0.0).abs() < f64::EPSILON);
        assert!(perceptual_diff(white, black) > 90.0);
        assert!(perceptual_diff(white, near_white) < 2.5);
    }

    #[test]
    fn test_highlight_color_parse() {
        let magenta: HighlightColor = "#ff00ff".parse().unwrap();
        assert_eq!(magenta, HighlightColor::MAGENTA);
        assert_eq!(magenta.to_hex(), "#ff00ff");
        assert_eq!(magenta.to_rgba(), Rgba([255, 0, 255, 255]));
        assert_eq!("#1A2b3C".parse::<HighlightColor>().unwrap(), HighlightColor::new(0x1a, 0x2b, 0x3c));

        assert!("ff00ff".parse::<HighlightColor>().is_err());
        assert!("#ff00f".parse::<HighlightColor>().is_err());
        assert!("#gg0000".parse::<HighlightColor>().is_err());
    }
}
