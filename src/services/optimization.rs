//! Mixing ratio optimization
//!
//! Minimizes Delta E00 between the mixed color and the target over ratios
//! r in [0, 1]^n with Σr = 1. The primary method is gradient descent with
//! momentum on forward finite differences; a coordinate search serves as the
//! cheap alternative and as a final polish.

use ndarray::Array1;

use crate::config::OptimizerSettings;
use crate::models::{ColorError, LabColor, MixingModel};
use crate::services::delta_e::delta_e_00;
use crate::services::mixing::{mix_unchecked, MixComponent};

const SUM_EPSILON: f64 = 1e-12;
/// Minimum Delta E gain for the coordinate search to accept a move
const IMPROVEMENT_EPSILON: f64 = 1e-9;

/// Best ratios found for one candidate subset
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizationResult {
    /// Normalized: Σ ratios = 1
    pub ratios: Vec<f64>,
    pub color: LabColor,
    pub delta_e: f64,
    pub iterations: usize,
    pub converged: bool,
}

struct Objective<'a> {
    components: &'a [MixComponent],
    target: LabColor,
    model: &'a MixingModel,
}

impl Objective<'_> {
    fn evaluate(&self, ratios: &Array1<f64>) -> (LabColor, f64) {
        let color = match ratios.as_slice() {
            Some(slice) => mix_unchecked(self.components, slice, self.model),
            None => mix_unchecked(self.components, &ratios.to_vec(), self.model),
        };
        (color, delta_e_00(color, self.target))
    }
}

/// Scale to Σ = 1; a vector with no mass is reset to uniform
fn normalize(ratios: &mut Array1<f64>) {
    let sum = ratios.sum();
    if sum > SUM_EPSILON {
        *ratios /= sum;
    } else {
        let n = ratios.len();
        ratios.fill(1.0 / n as f64);
    }
}

fn validate(components: &[MixComponent], target: LabColor) -> Result<(), ColorError> {
    if components.is_empty() {
        return Err(ColorError::EmptyMix);
    }
    target.validate()?;
    for component in components {
        component.lab.validate()?;
    }
    Ok(())
}

/// Gradient descent with momentum, polished by the coordinate search when
/// `settings.refine` is set.
pub fn optimize_ratios(
    components: &[MixComponent],
    target: LabColor,
    model: &MixingModel,
    settings: &OptimizerSettings,
) -> Result<OptimizationResult, ColorError> {
    validate(components, target)?;
    let objective = Objective {
        components,
        target,
        model,
    };
    let result = gradient_descent(&objective, settings);
    if !settings.refine || result.converged || components.len() == 1 {
        return Ok(result);
    }
    let refined = coordinate_search(&objective, Array1::from(result.ratios.clone()), settings);
    if refined.delta_e < result.delta_e {
        Ok(OptimizationResult {
            iterations: result.iterations + refined.iterations,
            ..refined
        })
    } else {
        Ok(result)
    }
}

/// Single-ink-at-a-time search from uniform ratios
pub fn coordinate_descent(
    components: &[MixComponent],
    target: LabColor,
    model: &MixingModel,
    settings: &OptimizerSettings,
) -> Result<OptimizationResult, ColorError> {
    validate(components, target)?;
    let objective = Objective {
        components,
        target,
        model,
    };
    let n = components.len();
    Ok(coordinate_search(
        &objective,
        Array1::from_elem(n, 1.0 / n as f64),
        settings,
    ))
}

fn gradient_descent(objective: &Objective, settings: &OptimizerSettings) -> OptimizationResult {
    let n = objective.components.len();
    let mut ratios = Array1::from_elem(n, 1.0 / n as f64);
    let (mut best_color, mut best_error) = objective.evaluate(&ratios);
    let mut best_ratios = ratios.clone();

    if n == 1 {
        return OptimizationResult {
            ratios: best_ratios.to_vec(),
            color: best_color,
            delta_e: best_error,
            iterations: 0,
            converged: best_error < settings.tolerance,
        };
    }

    let mut velocity: Array1<f64> = Array1::zeros(n);
    let mut alpha = settings.learning_rate;
    let delta = settings.gradient_epsilon;
    let mut iterations = 0;
    let mut converged = false;

    for iteration in 0..settings.max_iterations {
        iterations = iteration + 1;
        let (color, current_error) = objective.evaluate(&ratios);

        // The walk is not monotonic, keep the best iterate
        if current_error < best_error {
            best_error = current_error;
            best_color = color;
            best_ratios = ratios.clone();
        }

        if current_error < settings.tolerance {
            converged = true;
            break;
        }

        if iteration > 0 && iteration % settings.decay_interval == 0 {
            alpha *= settings.lr_decay;
        }

        // Forward differences on the renormalized perturbation
        let gradient = Array1::from_shape_fn(n, |i| {
            let mut nudged = ratios.clone();
            nudged[i] += delta;
            normalize(&mut nudged);
            (objective.evaluate(&nudged).1 - current_error) / delta
        });

        // Keep steps bounded by the learning rate on steep surfaces
        let steepest = gradient.iter().fold(0.0_f64, |m, g| m.max(g.abs()));
        let gradient = if steepest > 1.0 {
            gradient / steepest
        } else {
            gradient
        };

        velocity = &velocity * settings.momentum - &gradient * alpha;
        ratios += &velocity;
        ratios.mapv_inplace(|r| r.clamp(0.0, 1.0));
        normalize(&mut ratios);
    }

    if !converged {
        let (color, error) = objective.evaluate(&ratios);
        if error < best_error {
            best_error = error;
            best_color = color;
            best_ratios = ratios;
        }
    }

    OptimizationResult {
        ratios: best_ratios.to_vec(),
        color: best_color,
        delta_e: best_error,
        iterations,
        converged: best_error < settings.tolerance,
    }
}

/// Try ±step on every ratio, take the move with the lowest Delta E, halve
/// the step when none improves.
fn coordinate_search(
    objective: &Objective,
    start: Array1<f64>,
    settings: &OptimizerSettings,
) -> OptimizationResult {
    let n = objective.components.len();
    let mut ratios = start;
    normalize(&mut ratios);
    let (mut color, mut error) = objective.evaluate(&ratios);
    let mut step = settings.coordinate_step;
    let mut iterations = 0;

    while n > 1 && iterations < settings.max_iterations && error >= settings.tolerance {
        iterations += 1;
        match best_coordinate_move(objective, &ratios, step) {
            Some((trial, trial_color, trial_error)) if trial_error < error - IMPROVEMENT_EPSILON => {
                ratios = trial;
                color = trial_color;
                error = trial_error;
            }
            _ => {
                step /= 2.0;
                if step < settings.min_coordinate_step {
                    break;
                }
            }
        }
    }

    OptimizationResult {
        ratios: ratios.to_vec(),
        color,
        delta_e: error,
        iterations,
        converged: error < settings.tolerance,
    }
}

/// Lowest-error neighbor of `ratios` one `step` away along a single ratio
fn best_coordinate_move(
    objective: &Objective,
    ratios: &Array1<f64>,
    step: f64,
) -> Option<(Array1<f64>, LabColor, f64)> {
    let mut best: Option<(Array1<f64>, LabColor, f64)> = None;
    for i in 0..ratios.len() {
        for direction in [1.0, -1.0] {
            let mut trial = ratios.clone();
            trial[i] = (trial[i] + direction * step).clamp(0.0, 1.0);
            normalize(&mut trial);
            let (trial_color, trial_error) = objective.evaluate(&trial);
            if best.as_ref().map_or(true, |(_, _, e)| trial_error < *e) {
                best = Some((trial, trial_color, trial_error));
            }
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::InkCategory;
    use crate::services::mixing::mix;

    const CYAN: LabColor = LabColor::new(55.0, -37.0, -50.0);
    const WHITE: LabColor = LabColor::new(95.0, 0.0, -1.0);
    const BLACK: LabColor = LabColor::new(18.0, 0.5, 0.0);
    const MAGENTA: LabColor = LabColor::new(48.0, 74.0, -3.0);

    fn process(labs: &[LabColor]) -> Vec<MixComponent> {
        labs.iter()
            .map(|lab| MixComponent::new(*lab, InkCategory::Process))
            .collect()
    }

    fn assert_normalized(ratios: &[f64]) {
        let sum: f64 = ratios.iter().sum();
        assert!((sum - 1.0).abs() < 1e-3, "sum {sum}");
        assert!(ratios.iter().all(|r| (0.0..=1.0).contains(r)));
    }

    #[test]
    fn single_ink_is_trivially_full_strength() {
        let result = optimize_ratios(
            &process(&[CYAN]),
            LabColor::new(60.0, -30.0, -40.0),
            &MixingModel::default(),
            &OptimizerSettings::default(),
        )
        .unwrap();
        assert_eq!(result.ratios, vec![1.0]);
        assert!(!result.converged);
    }

    #[test]
    fn recovers_reachable_mix() {
        let model = MixingModel::default();
        let target = mix(&[CYAN, WHITE], &[0.3, 0.7], &model).unwrap();
        let result = optimize_ratios(
            &process(&[CYAN, WHITE]),
            target,
            &model,
            &OptimizerSettings::default(),
        )
        .unwrap();
        assert!(result.delta_e < 0.5, "delta e {}", result.delta_e);
        assert!((result.ratios[0] - 0.3).abs() < 0.05, "{:?}", result.ratios);
        assert_normalized(&result.ratios);
    }

    #[test]
    fn coordinate_descent_recovers_reachable_mix() {
        let model = MixingModel::default();
        let target = mix(&[BLACK, WHITE], &[0.12, 0.88], &model).unwrap();
        let result = coordinate_descent(
            &process(&[BLACK, WHITE]),
            target,
            &model,
            &OptimizerSettings::default(),
        )
        .unwrap();
        assert!(result.delta_e < 0.5, "delta e {}", result.delta_e);
        assert_normalized(&result.ratios);
    }

    #[test]
    fn coordinate_move_takes_lowest_error_neighbor() {
        let model = MixingModel::linear();
        let components = process(&[CYAN, BLACK, WHITE]);
        let objective = Objective {
            components: &components,
            target: WHITE,
            model: &model,
        };
        let start = Array1::from_elem(3, 1.0 / 3.0);
        let (_, start_error) = objective.evaluate(&start);

        let mut first_improving = None;
        let mut lowest = f64::INFINITY;
        for i in 0..3 {
            for direction in [1.0, -1.0] {
                let mut trial = start.clone();
                trial[i] += direction * 0.1;
                normalize(&mut trial);
                let (_, e) = objective.evaluate(&trial);
                if first_improving.is_none() && e < start_error {
                    first_improving = Some(e);
                }
                lowest = lowest.min(e);
            }
        }

        let (ratios, _, error) = best_coordinate_move(&objective, &start, 0.1).unwrap();
        assert_eq!(error, lowest);
        // Less cyan helps, but more white helps most
        assert!(error < first_improving.unwrap() - 1.0, "{error} vs {first_improving:?}");
        assert!(ratios[2] > start[2]);
        assert_normalized(ratios.as_slice().unwrap());
    }

    #[test]
    fn best_iterate_never_worse_than_start() {
        let model = MixingModel::default();
        let components = process(&[CYAN, MAGENTA, BLACK]);
        let target = LabColor::new(40.0, 30.0, -40.0);
        let start = mix(&[CYAN, MAGENTA, BLACK], &[1.0 / 3.0; 3], &model).unwrap();
        let settings = OptimizerSettings {
            refine: false,
            ..Default::default()
        };
        let result = optimize_ratios(&components, target, &model, &settings).unwrap();
        assert!(result.delta_e <= delta_e_00(start, target) + 1e-12);
        assert_normalized(&result.ratios);
    }

    #[test]
    fn rejects_invalid_input() {
        let settings = OptimizerSettings::default();
        let model = MixingModel::default();
        assert!(matches!(
            optimize_ratios(&[], LabColor::new(50.0, 0.0, 0.0), &model, &settings),
            Err(ColorError::EmptyMix)
        ));
        assert!(matches!(
            optimize_ratios(
                &process(&[CYAN]),
                LabColor::new(50.0, 200.0, 0.0),
                &model,
                &settings
            ),
            Err(ColorError::InvalidLab { .. })
        ));
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn lab() -> impl Strategy<Value = LabColor> {
            (5.0_f64..=98.0, -90.0_f64..=90.0, -90.0_f64..=90.0)
                .prop_map(|(l, a, b)| LabColor::new(l, a, b))
        }

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(32))]

            #[test]
            fn returned_ratios_are_normalized(
                inks in prop::collection::vec(lab(), 2..=4),
                target in lab(),
            ) {
                let settings = OptimizerSettings {
                    max_iterations: 60,
                    ..Default::default()
                };
                let result = optimize_ratios(
                    &process(&inks),
                    target,
                    &MixingModel::default(),
                    &settings,
                ).unwrap();
                let sum: f64 = result.ratios.iter().sum();
                prop_assert!((sum - 1.0).abs() < 1e-3, "sum {}", sum);
                prop_assert!(result.ratios.iter().all(|r| (0.0..=1.0).contains(r)));
                prop_assert!(result.delta_e.is_finite());
            }
        }
    }
}
