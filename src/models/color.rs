use serde::{Deserialize, Serialize};

use crate::models::ColorError;

pub const L_MIN: f64 = 0.0;
pub const L_MAX: f64 = 100.0;
pub const AB_MIN: f64 = -128.0;
pub const AB_MAX: f64 = 127.0;

/// Perceptual color in CIELAB
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LabColor {
    pub l: f64,
    pub a: f64,
    pub b: f64,
}

impl LabColor {
    /// Create a Lab color without range checks (constants, intermediate values)
    pub const fn new(l: f64, a: f64, b: f64) -> Self {
        Self { l, a, b }
    }

    /// Create a Lab color, rejecting out-of-range components
    pub fn try_new(l: f64, a: f64, b: f64) -> Result<Self, ColorError> {
        let lab = Self { l, a, b };
        lab.validate()?;
        Ok(lab)
    }

    /// Check L in [0, 100] and a/b in [-128, 127]
    pub fn validate(&self) -> Result<(), ColorError> {
        if !self.l.is_finite() || !(L_MIN..=L_MAX).contains(&self.l) {
            return Err(ColorError::InvalidLab {
                component: "L",
                value: self.l,
            });
        }
        if !self.a.is_finite() || !(AB_MIN..=AB_MAX).contains(&self.a) {
            return Err(ColorError::InvalidLab {
                component: "a",
                value: self.a,
            });
        }
        if !self.b.is_finite() || !(AB_MIN..=AB_MAX).contains(&self.b) {
            return Err(ColorError::InvalidLab {
                component: "b",
                value: self.b,
            });
        }
        Ok(())
    }

    /// Clamp to the valid Lab bounds
    pub fn clamped(self) -> Self {
        Self {
            l: self.l.clamp(L_MIN, L_MAX),
            a: self.a.clamp(AB_MIN, AB_MAX),
            b: self.b.clamp(AB_MIN, AB_MAX),
        }
    }

    /// C*ab
    pub fn chroma(&self) -> f64 {
        self.a.hypot(self.b)
    }

    /// Hue angle in degrees, [0, 360)
    pub fn hue_degrees(&self) -> f64 {
        let h = self.b.atan2(self.a).to_degrees();
        if h < 0.0 {
            h + 360.0
        } else {
            h
        }
    }
}

/// CIE XYZ tristimulus values, scaled so that Y of the reference white is 100
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct XyzColor {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl XyzColor {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// Reference white used by Lab <-> XYZ conversions.
///
/// Forward and inverse conversions must use the same white point, otherwise a
/// round trip does not reconstruct the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WhitePoint {
    /// Print viewing conditions (ISO 3664)
    D50,
    #[default]
    D65,
}

pub const D50_WHITE: XyzColor = XyzColor::new(96.422, 100.0, 82.521);
pub const D65_WHITE: XyzColor = XyzColor::new(95.047, 100.0, 108.883);

impl WhitePoint {
    pub fn xyz(&self) -> XyzColor {
        match self {
            WhitePoint::D50 => D50_WHITE,
            WhitePoint::D65 => D65_WHITE,
        }
    }
}

/// 8-bit sRGB color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RgbColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl RgbColor {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#rrggbb` (leading `#` optional)
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim().trim_start_matches('#');
        if hex.len() != 6 {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
        Some(Self {
            r: channel(0)?,
            g: channel(2)?,
            b: channel(4)?,
        })
    }

    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}
