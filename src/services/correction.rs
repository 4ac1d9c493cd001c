//! Correction of a printed recipe that missed its target
//!
//! Works on the measured difference between target and print: decides
//! whether an incremental correction makes sense, ranks catalog inks that
//! push the color in the needed direction, and falls back to a table of
//! named special inks when the catalog has nothing suitable.

use crate::config::{CorrectionSettings, EngineConfig};
use crate::models::{
    ColorDifference, ColorError, CorrectionAxis, CorrectionOutcome, CorrectionSuggestion,
    Feasibility, InfeasibleReason, InkCatalog, LabColor, LabDelta, RecipeComponent,
    SpecialInkSuggestion,
};
use crate::services::delta_e::delta_e_00;
use crate::services::scoring::coverage_of;

/// Per-axis difference below which an axis needs no correction
const AXIS_THRESHOLD: f64 = 0.5;
/// Penalty weight for an ink that pushes an axis the wrong way
const OPPOSING_PENALTY: f64 = 0.5;
/// Largest mix fraction the single-axis estimate may ask for
const MAX_FRACTION: f64 = 0.95;
/// Fallback thresholds for the special ink table
const SPECIAL_AB_THRESHOLD: f64 = 1.0;
const SPECIAL_L_THRESHOLD: f64 = 2.0;

/// Special inks suggested when no catalog ink fits, by deficient axis
const SPECIAL_INKS: [(CorrectionAxis, &str, f64, f64, LabDelta, &str); 6] = [
    (
        CorrectionAxis::Lighter,
        "Opaque White",
        2.0,
        10.0,
        LabDelta::new(4.0, 0.0, 0.0),
        "Lightens and slightly desaturates",
    ),
    (
        CorrectionAxis::Darker,
        "Toner Black",
        0.5,
        3.0,
        LabDelta::new(-4.0, 0.0, 0.0),
        "Very strong, add in small steps",
    ),
    (
        CorrectionAxis::Redder,
        "Rhodamine Red",
        1.0,
        5.0,
        LabDelta::new(-0.5, 4.0, -1.0),
        "Raises a* with little shift in b*",
    ),
    (
        CorrectionAxis::Greener,
        "Green Shade",
        1.0,
        5.0,
        LabDelta::new(-0.5, -4.0, 0.5),
        "Lowers a*",
    ),
    (
        CorrectionAxis::Yellower,
        "Warm Yellow",
        1.0,
        5.0,
        LabDelta::new(0.5, 0.5, 4.0),
        "Raises b*",
    ),
    (
        CorrectionAxis::Bluer,
        "Reflex Blue",
        1.0,
        5.0,
        LabDelta::new(-1.0, 0.5, -4.0),
        "Lowers b*, darkens slightly",
    ),
];

/// Compute the correction for a recipe that printed `actual` instead of `target`
pub fn correct(
    target: LabColor,
    actual: LabColor,
    current_recipe: &[RecipeComponent],
    catalog: &InkCatalog,
    config: &EngineConfig,
) -> Result<CorrectionOutcome, ColorError> {
    target.validate()?;
    actual.validate()?;
    let tac = recipe_coverage(current_recipe, catalog, config)?;

    let settings = &config.correction;
    let difference = ColorDifference {
        delta: LabDelta::between(actual, target),
        delta_e: delta_e_00(target, actual),
    };
    let unchanged = |feasibility: Feasibility| CorrectionOutcome {
        color_difference: difference,
        feasibility,
        correction_inks: Vec::new(),
        special_inks: Vec::new(),
        suggested_recipe: current_recipe.to_vec(),
        predicted_color: actual,
    };

    if difference.delta_e < settings.within_tolerance {
        return Ok(unchanged(Feasibility::possible(format!(
            "Delta E {:.2} is within tolerance, no correction needed",
            difference.delta_e
        ))));
    }
    if difference.delta_e > settings.max_delta_e {
        tracing::debug!(delta_e = difference.delta_e, "Correction infeasible, difference too large");
        return Ok(unchanged(Feasibility::impossible(
            InfeasibleReason::ColorDifferenceTooLarge,
            format!(
                "Delta E {:.2} exceeds {:.1}; remake the recipe instead of correcting it",
                difference.delta_e, settings.max_delta_e
            ),
        )));
    }
    let headroom = config.coverage.tac_limit - tac;
    if headroom < settings.min_tac_headroom {
        tracing::debug!(tac, headroom, "Correction infeasible, no coverage headroom");
        return Ok(unchanged(Feasibility::impossible(
            InfeasibleReason::InsufficientTacHeadroom,
            format!(
                "Only {headroom:.1}% coverage headroom left; remake the recipe with less ink"
            ),
        )));
    }

    let correction_inks = suitable_inks(actual, difference.delta, catalog, settings);
    if correction_inks.is_empty() {
        let special_inks = special_inks_for(difference.delta);
        tracing::debug!(
            suggestions = special_inks.len(),
            "No suitable catalog ink, falling back to special inks"
        );
        return Ok(CorrectionOutcome {
            special_inks,
            ..unchanged(Feasibility::impossible(
                InfeasibleReason::NoCandidates,
                "No catalog ink moves the color toward the target; add one of the suggested special inks",
            ))
        });
    }

    let predicted_color = predict_corrected_color(actual, &correction_inks);
    let suggested_recipe = apply_additions(current_recipe, &correction_inks);
    Ok(CorrectionOutcome {
        color_difference: difference,
        feasibility: Feasibility::possible(format!(
            "Add {}",
            correction_inks
                .iter()
                .map(|s| format!("{:.1}% {}", s.percentage, s.ink_name))
                .collect::<Vec<_>>()
                .join(", ")
        )),
        correction_inks,
        special_inks: Vec::new(),
        suggested_recipe,
        predicted_color,
    })
}

/// Expected color after the corrections: the sum of their impacts, clamped
pub fn predict_corrected_color(actual: LabColor, corrections: &[CorrectionSuggestion]) -> LabColor {
    corrections
        .iter()
        .fold(actual, |color, s| {
            LabColor::new(
                color.l + s.expected_impact.dl,
                color.a + s.expected_impact.da,
                color.b + s.expected_impact.db,
            )
        })
        .clamped()
}

fn recipe_coverage(
    recipe: &[RecipeComponent],
    catalog: &InkCatalog,
    config: &EngineConfig,
) -> Result<f64, ColorError> {
    let mut tac = 0.0;
    for component in recipe {
        let ink = catalog
            .get(&component.ink_id)
            .ok_or_else(|| ColorError::UnknownInk(component.ink_id.clone()))?;
        if !component.percentage.is_finite() || component.percentage < 0.0 {
            return Err(ColorError::InvalidRatio(component.percentage));
        }
        tac += coverage_of(
            ink.category,
            component.concentration,
            component.percentage,
            &config.coverage,
        );
    }
    Ok(tac)
}

/// Rank full-strength catalog inks by how well their offset from `actual`
/// lines up with the needed correction, axis by axis.
fn suitable_inks(
    actual: LabColor,
    needed: LabDelta,
    catalog: &InkCatalog,
    settings: &CorrectionSettings,
) -> Vec<CorrectionSuggestion> {
    let need = [needed.dl, needed.da, needed.db];
    let total_need: f64 = need
        .iter()
        .filter(|n| n.abs() > AXIS_THRESHOLD)
        .map(|n| n.abs())
        .sum();
    if total_need == 0.0 {
        return Vec::new();
    }

    let mut suggestions: Vec<CorrectionSuggestion> = catalog
        .inks()
        .iter()
        .filter_map(|ink| {
            let full = ink.full_strength()?;
            let offset = LabDelta::between(actual, full);
            let pull = [offset.dl, offset.da, offset.db];
            let reach = pull.iter().map(|p| p * p).sum::<f64>().sqrt();
            if reach < AXIS_THRESHOLD {
                return None;
            }

            let mut suitability = 0.0;
            let mut fraction_sum = 0.0;
            let mut weight_sum = 0.0;
            for (n, p) in need.iter().zip(pull) {
                if n.abs() <= AXIS_THRESHOLD {
                    continue;
                }
                // Axis importance times the share of the ink's pull along it
                let weight = n.abs() / total_need;
                let alignment = p.abs() / reach;
                if p * n > 0.0 {
                    suitability += weight * alignment;
                    // Adding a fraction f of the ink moves this axis by f * pull
                    fraction_sum += weight * (n / p).min(MAX_FRACTION);
                    weight_sum += weight;
                } else {
                    suitability -= OPPOSING_PENALTY * weight * alignment;
                }
            }
            if suitability <= 0.0 || weight_sum == 0.0 {
                return None;
            }

            let fraction = fraction_sum / weight_sum;
            let percentage = (100.0 * fraction / (1.0 - fraction))
                .clamp(settings.min_add_percentage, settings.max_add_percentage);
            let share = percentage / (100.0 + percentage);
            Some(CorrectionSuggestion {
                ink_id: ink.id.clone(),
                ink_name: ink.name.clone(),
                percentage,
                expected_impact: LabDelta::new(
                    offset.dl * share,
                    offset.da * share,
                    offset.db * share,
                ),
                suitability,
            })
        })
        .collect();

    suggestions.sort_by(|a, b| {
        b.suitability
            .total_cmp(&a.suitability)
            .then_with(|| a.ink_id.cmp(&b.ink_id))
    });
    suggestions.truncate(settings.max_inks);
    suggestions
}

fn special_inks_for(needed: LabDelta) -> Vec<SpecialInkSuggestion> {
    let wanted = |axis: CorrectionAxis| match axis {
        CorrectionAxis::Lighter => needed.dl > SPECIAL_L_THRESHOLD,
        CorrectionAxis::Darker => needed.dl < -SPECIAL_L_THRESHOLD,
        CorrectionAxis::Redder => needed.da > SPECIAL_AB_THRESHOLD,
        CorrectionAxis::Greener => needed.da < -SPECIAL_AB_THRESHOLD,
        CorrectionAxis::Yellower => needed.db > SPECIAL_AB_THRESHOLD,
        CorrectionAxis::Bluer => needed.db < -SPECIAL_AB_THRESHOLD,
    };
    SPECIAL_INKS
        .iter()
        .filter(|(axis, ..)| wanted(*axis))
        .map(|&(axis, name, min, max, impact, note)| SpecialInkSuggestion {
            name: name.to_string(),
            axis,
            min_percentage: min,
            max_percentage: max,
            expected_impact: impact,
            note: note.to_string(),
        })
        .collect()
}

/// Current recipe plus additions at full strength, renormalized to 100%
fn apply_additions(
    current: &[RecipeComponent],
    additions: &[CorrectionSuggestion],
) -> Vec<RecipeComponent> {
    let mut recipe: Vec<RecipeComponent> = current.to_vec();
    for addition in additions {
        match recipe
            .iter_mut()
            .find(|c| c.ink_id == addition.ink_id && c.concentration == 100)
        {
            Some(existing) => existing.percentage += addition.percentage,
            None => recipe.push(RecipeComponent {
                ink_id: addition.ink_id.clone(),
                ink_name: addition.ink_name.clone(),
                concentration: 100,
                ratio: 0.0,
                percentage: addition.percentage,
                plate_percentage: None,
            }),
        }
    }
    let total: f64 = recipe.iter().map(|c| c.percentage).sum();
    if total > 0.0 {
        for component in recipe.iter_mut() {
            component.percentage *= 100.0 / total;
            component.ratio = component.percentage / 100.0;
            component.plate_percentage = None;
        }
    }
    recipe
}
