use serde::{Deserialize, Serialize};

use crate::models::LabColor;

/// Printing substrate, drives scattering, base color and absorption
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubstrateType {
    #[default]
    Coated,
    Uncoated,
    Plastic,
    Metal,
    Transparent,
}

impl SubstrateType {
    /// Multiplier applied to the summed K/S before inversion
    pub fn scattering_coefficient(&self) -> f64 {
        match self {
            SubstrateType::Coated => 1.0,
            SubstrateType::Uncoated => 1.12,
            SubstrateType::Plastic => 0.95,
            SubstrateType::Metal => 0.9,
            SubstrateType::Transparent => 0.85,
        }
    }

    /// Unprinted substrate color
    pub fn base_lab(&self) -> LabColor {
        match self {
            SubstrateType::Coated => LabColor::new(95.0, 0.0, -2.0),
            SubstrateType::Uncoated => LabColor::new(93.0, 0.0, 3.0),
            SubstrateType::Plastic => LabColor::new(92.0, -0.5, 1.0),
            SubstrateType::Metal => LabColor::new(72.0, 0.0, 2.0),
            SubstrateType::Transparent => LabColor::new(100.0, 0.0, 0.0),
        }
    }

    /// How much of the ink film stays on the surface, [0, 1]
    pub fn holdout(&self) -> f64 {
        match self {
            SubstrateType::Coated => 0.95,
            SubstrateType::Uncoated => 0.8,
            SubstrateType::Plastic => 1.0,
            SubstrateType::Metal => 1.0,
            SubstrateType::Transparent => 0.7,
        }
    }

    /// Fractional L* loss from ink soaking into the substrate
    pub fn absorption(&self) -> f64 {
        match self {
            SubstrateType::Coated => 0.02,
            SubstrateType::Uncoated => 0.08,
            SubstrateType::Plastic => 0.0,
            SubstrateType::Metal => 0.0,
            SubstrateType::Transparent => 0.0,
        }
    }
}

/// Press technology, selects the dot-gain calibration curve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrintingMethod {
    #[default]
    Offset,
    Flexo,
    Gravure,
    Digital,
    Screen,
}

impl PrintingMethod {
    /// Calibration points (nominal %, printed %), ascending and monotonic
    pub fn dot_gain_curve(&self) -> &'static [(f64, f64)] {
        match self {
            PrintingMethod::Offset => &[
                (0.0, 0.0),
                (25.0, 33.0),
                (50.0, 65.0),
                (75.0, 87.0),
                (100.0, 100.0),
            ],
            PrintingMethod::Flexo => &[
                (0.0, 0.0),
                (25.0, 38.0),
                (50.0, 72.0),
                (75.0, 91.0),
                (100.0, 100.0),
            ],
            PrintingMethod::Gravure => &[
                (0.0, 0.0),
                (25.0, 30.0),
                (50.0, 60.0),
                (75.0, 84.0),
                (100.0, 100.0),
            ],
            PrintingMethod::Digital => &[
                (0.0, 0.0),
                (25.0, 27.0),
                (50.0, 54.0),
                (75.0, 79.0),
                (100.0, 100.0),
            ],
            PrintingMethod::Screen => &[
                (0.0, 0.0),
                (25.0, 35.0),
                (50.0, 68.0),
                (75.0, 89.0),
                (100.0, 100.0),
            ],
        }
    }
}

/// Which physical effects `mix` applies.
///
/// Passed by value so the mixing function stays pure. Optimization loops can
/// switch everything off and fall back to linear Lab averaging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct MixingModel {
    pub kubelka_munk: bool,
    pub medium_effects: bool,
    pub substrate_scattering: bool,
    pub dot_gain: bool,
    pub substrate_blend: bool,
    pub substrate: SubstrateType,
    pub printing_method: PrintingMethod,
}

impl Default for MixingModel {
    fn default() -> Self {
        Self {
            kubelka_munk: true,
            medium_effects: true,
            substrate_scattering: true,
            dot_gain: false,
            substrate_blend: false,
            substrate: SubstrateType::default(),
            printing_method: PrintingMethod::default(),
        }
    }
}

impl MixingModel {
    /// Ratio-weighted Lab average, no physical effects
    pub fn linear() -> Self {
        Self {
            kubelka_munk: false,
            medium_effects: false,
            substrate_scattering: false,
            dot_gain: false,
            substrate_blend: false,
            ..Default::default()
        }
    }

    /// Every effect enabled for the given press setup
    pub fn full(substrate: SubstrateType, printing_method: PrintingMethod) -> Self {
        Self {
            kubelka_munk: true,
            medium_effects: true,
            substrate_scattering: true,
            dot_gain: true,
            substrate_blend: true,
            substrate,
            printing_method,
        }
    }
}
