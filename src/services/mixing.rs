//! Ink mixing using Kubelka-Munk theory
//!
//! Each ink's lightness is mapped to a diffuse reflectance and then to its
//! absorption/scattering ratio K/S. K/S values are additive, so the mixture
//! K/S is the weighted sum, converted back to reflectance. a*/b* follow the
//! same weights. Medium, substrate and dot-gain effects are switched through
//! [`MixingModel`].

use serde::{Deserialize, Serialize};

use crate::models::{Candidate, ColorError, InkCategory, LabColor, MixingModel};
use crate::services::colorimetry::{lightness_to_reflectance, reflectance_to_lightness};
use crate::services::dot_gain::apply_gain;

/// Tolerance on Σ ratios for committed mixes
pub const RATIO_SUM_TOLERANCE: f64 = 1e-3;
/// L* added by a mix made entirely of medium
pub const MEDIUM_MAX_LIGHTENING: f64 = 15.0;
/// K/S of the transparent base
pub const MEDIUM_KS: f64 = 1e-5;
/// Share of colorant opacity removed per unit of medium
pub const MEDIUM_OPACITY_REDUCTION: f64 = 0.5;
/// Share of a*/b* removed per unit of medium
pub const MEDIUM_DESATURATION: f64 = 0.8;

const WEIGHT_EPSILON: f64 = 1e-12;

/// One ink as seen by the mixing model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MixComponent {
    pub lab: LabColor,
    pub category: InkCategory,
    pub opacity: f64,
}

impl MixComponent {
    pub fn new(lab: LabColor, category: InkCategory) -> Self {
        Self {
            lab,
            category,
            opacity: category.default_opacity(),
        }
    }

    pub fn with_opacity(mut self, opacity: f64) -> Self {
        self.opacity = opacity;
        self
    }

    fn is_medium(&self) -> bool {
        self.category == InkCategory::Medium
    }
}

impl From<&Candidate> for MixComponent {
    fn from(candidate: &Candidate) -> Self {
        Self {
            lab: candidate.lab,
            category: candidate.category,
            opacity: candidate.opacity,
        }
    }
}

/// A film printed over whatever lies beneath it
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InkLayer {
    pub lab: LabColor,
    /// 0 = fully transparent, 1 = fully hiding
    pub opacity: f64,
}

/// Convert reflectance R to Kubelka-Munk K/S ratio
/// Formula: K/S = (1 - R)² / (2R)
#[inline]
pub fn reflectance_to_ks(r: f64) -> f64 {
    let r = r.clamp(0.01, 0.99);
    (1.0 - r).powi(2) / (2.0 * r)
}

/// Convert Kubelka-Munk K/S ratio back to reflectance R
/// Formula: R = 1 + K/S - √(K/S² + 2·K/S)
#[inline]
pub fn ks_to_reflectance(ks: f64) -> f64 {
    if ks <= 0.0 {
        return 1.0;
    }
    let r = 1.0 + ks - (ks * ks + 2.0 * ks).sqrt();
    r.clamp(0.0, 1.0)
}

/// Mix colors treated as process inks.
///
/// Ratios must lie in [0, 1] and sum to 1 within [`RATIO_SUM_TOLERANCE`].
pub fn mix(colors: &[LabColor], ratios: &[f64], model: &MixingModel) -> Result<LabColor, ColorError> {
    let components: Vec<MixComponent> = colors
        .iter()
        .map(|lab| MixComponent::new(*lab, InkCategory::Process))
        .collect();
    mix_inks(&components, ratios, model)
}

/// Mix inks with category and opacity information
pub fn mix_inks(
    components: &[MixComponent],
    ratios: &[f64],
    model: &MixingModel,
) -> Result<LabColor, ColorError> {
    validate_mix(components, ratios)?;
    Ok(mix_unchecked(components, ratios, model))
}

fn validate_mix(components: &[MixComponent], ratios: &[f64]) -> Result<(), ColorError> {
    if components.is_empty() {
        return Err(ColorError::EmptyMix);
    }
    if components.len() != ratios.len() {
        return Err(ColorError::LengthMismatch {
            colors: components.len(),
            ratios: ratios.len(),
        });
    }
    if let Some(&bad) = ratios
        .iter()
        .find(|r| !r.is_finite() || !(0.0..=1.0).contains(*r))
    {
        return Err(ColorError::InvalidRatio(bad));
    }
    let sum: f64 = ratios.iter().sum();
    if (sum - 1.0).abs() > RATIO_SUM_TOLERANCE {
        return Err(ColorError::RatioSum(sum));
    }
    for component in components {
        component.lab.validate()?;
    }
    Ok(())
}

/// Mix without input validation, for callers that already hold normalized
/// ratios (optimizer inner loops).
///
/// With medium effects on, the medium is kept out of the colorant
/// proportions: colorants are mixed (and blended with the substrate) on their
/// own shares, the medium dilutes their K/S, and its lightening and
/// desaturation are applied last.
pub fn mix_unchecked(components: &[MixComponent], ratios: &[f64], model: &MixingModel) -> LabColor {
    let (medium_fraction, colorant_total) = components.iter().zip(ratios).fold(
        (0.0, 0.0),
        |(medium, colorant), (c, &r)| {
            if model.medium_effects && c.is_medium() {
                (medium + r, colorant)
            } else {
                (medium, colorant + r)
            }
        },
    );
    if colorant_total <= WEIGHT_EPSILON {
        // Nothing but medium: it keeps its own appearance
        return linear_mix(components, ratios).clamped();
    }

    let shares: Vec<f64> = components
        .iter()
        .zip(ratios)
        .map(|(c, &r)| {
            if model.medium_effects && c.is_medium() {
                0.0
            } else {
                r / colorant_total
            }
        })
        .collect();
    let shares = if model.dot_gain {
        gain_weights(&shares, model)
    } else {
        shares
    };

    let mixed = if model.kubelka_munk {
        kubelka_munk_mix(components, &shares, medium_fraction, model)
    } else {
        linear_mix(components, &shares)
    };

    let mixed = if model.substrate_blend {
        blend_with_substrate(mixed, components, &shares, model)
    } else {
        mixed
    };
    apply_medium(mixed, medium_fraction).clamped()
}

/// Replace each colorant's share by its printed coverage, then renormalize
fn gain_weights(shares: &[f64], model: &MixingModel) -> Vec<f64> {
    let mut weights: Vec<f64> = shares
        .iter()
        .map(|&s| apply_gain(model.printing_method, s * 100.0) / 100.0)
        .collect();
    let sum: f64 = weights.iter().sum();
    if sum > WEIGHT_EPSILON {
        for w in weights.iter_mut() {
            *w /= sum;
        }
    }
    weights
}

/// Ratio-weighted Lab average
pub fn linear_mix(components: &[MixComponent], ratios: &[f64]) -> LabColor {
    let total: f64 = ratios.iter().sum();
    if total <= WEIGHT_EPSILON {
        return components
            .first()
            .map(|c| c.lab)
            .unwrap_or(LabColor::new(100.0, 0.0, 0.0));
    }
    let (mut l, mut a, mut b) = (0.0, 0.0, 0.0);
    for (c, &r) in components.iter().zip(ratios) {
        l += c.lab.l * r;
        a += c.lab.a * r;
        b += c.lab.b * r;
    }
    LabColor::new(l / total, a / total, b / total)
}

/// K/S mix of the colorants, diluted by `medium_fraction` of near-clear base.
///
/// `shares` cover the colorants only and sum to 1; a*/b* do not depend on the
/// medium here.
fn kubelka_munk_mix(
    components: &[MixComponent],
    shares: &[f64],
    medium_fraction: f64,
    model: &MixingModel,
) -> LabColor {
    let colorant_amount = (1.0 - medium_fraction) * (1.0 - MEDIUM_OPACITY_REDUCTION * medium_fraction);

    let mut colorant_weight = 0.0;
    let mut ks_sum = 0.0;
    let mut a_sum = 0.0;
    let mut b_sum = 0.0;
    for (c, &s) in components.iter().zip(shares) {
        let w = s * c.opacity;
        ks_sum += w * reflectance_to_ks(lightness_to_reflectance(c.lab.l));
        a_sum += w * c.lab.a;
        b_sum += w * c.lab.b;
        colorant_weight += w;
    }
    if colorant_weight <= WEIGHT_EPSILON {
        return linear_mix(components, shares);
    }

    let mut ks = (colorant_amount * ks_sum + medium_fraction * MEDIUM_KS)
        / (colorant_amount * colorant_weight + medium_fraction);
    if model.substrate_scattering {
        ks *= model.substrate.scattering_coefficient();
    }

    LabColor::new(
        reflectance_to_lightness(ks_to_reflectance(ks)),
        a_sum / colorant_weight,
        b_sum / colorant_weight,
    )
}

/// Medium lightening and desaturation, after every other effect
fn apply_medium(mixed: LabColor, medium_fraction: f64) -> LabColor {
    if medium_fraction <= 0.0 {
        return mixed;
    }
    let keep = 1.0 - MEDIUM_DESATURATION * medium_fraction;
    LabColor::new(
        (mixed.l + MEDIUM_MAX_LIGHTENING * medium_fraction).min(100.0),
        mixed.a * keep,
        mixed.b * keep,
    )
}

/// Alpha-blend the ink film with the substrate, then darken for absorption
fn blend_with_substrate(
    mixed: LabColor,
    components: &[MixComponent],
    ratios: &[f64],
    model: &MixingModel,
) -> LabColor {
    let total: f64 = ratios.iter().sum();
    let ink_opacity = if total > WEIGHT_EPSILON {
        components
            .iter()
            .zip(ratios)
            .map(|(c, &r)| c.opacity * r)
            .sum::<f64>()
            / total
    } else {
        0.0
    };
    let substrate = model.substrate;
    let alpha = (ink_opacity * substrate.holdout()).clamp(0.0, 1.0);
    let base = substrate.base_lab();
    let blend = |ink: f64, paper: f64| alpha * ink + (1.0 - alpha) * paper;
    LabColor::new(
        blend(mixed.l, base.l) * (1.0 - substrate.absorption()),
        blend(mixed.a, base.a),
        blend(mixed.b, base.b),
    )
}

/// Compose ink layers printed one over another on a substrate.
///
/// Each layer's reflectance filters what lies beneath in proportion to its
/// transparency; chroma of transparent layers adds to the underlying color.
pub fn overprint(layers: &[InkLayer], substrate: LabColor) -> LabColor {
    layers.iter().fold(substrate, |below, layer| {
        let o = layer.opacity.clamp(0.0, 1.0);
        let r_layer = lightness_to_reflectance(layer.lab.l);
        let r_below = lightness_to_reflectance(below.l);
        let r = o * r_layer + (1.0 - o) * r_layer * r_below;
        LabColor::new(
            reflectance_to_lightness(r),
            layer.lab.a + (1.0 - o) * below.a,
            layer.lab.b + (1.0 - o) * below.b,
        )
        .clamped()
    })
}
