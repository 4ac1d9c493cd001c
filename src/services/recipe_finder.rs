//! Recipe search service for finding ink combinations that match a target color
//!
//! Candidates are combined into subsets of increasing size, each subset's
//! ratios are optimized for Delta E00, and the results are scored, filtered
//! against the coverage limit and ranked.

use std::collections::HashSet;
use std::num::NonZeroUsize;

use rand::rngs::StdRng;
use rand::SeedableRng;
#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::config::EngineConfig;
use crate::models::{
    Candidate, ColorError, CorrectionOutcome, Feasibility, InfeasibleReason, InkCatalog, LabColor,
    MixingModel, QualityLabel, RecipeComponent, RecipeOptions, RecipeResult, RecipeSearchResult,
};
use crate::services::candidates::generate_candidates;
use crate::services::combinations::{plan_for, prefilter, subsets_of_size};
use crate::services::correction;
use crate::services::delta_e::delta_e_00;
use crate::services::dot_gain::compensate;
use crate::services::mixing::{mix_unchecked, MixComponent};
use crate::services::optimization::optimize_ratios;
use crate::services::scoring::{
    coverage_of, recipe_cache_key, score, significant_ratios, RecipeCache,
};

/// Substrate a neutral target is measured against
const NEUTRAL_SUBSTRATE: LabColor = LabColor::new(95.0, 0.0, 0.0);
/// Share of the substrate tint showing through a typical ink film
const SUBSTRATE_COMPENSATION: f64 = 0.25;
const TAC_EPSILON: f64 = 1e-9;

/// Aim point that cancels the substrate tint: the target moved away from the
/// substrate's deviation from neutral paper.
pub fn substrate_adjusted_target(target: LabColor, substrate: LabColor) -> LabColor {
    LabColor::new(
        target.l - SUBSTRATE_COMPENSATION * (substrate.l - NEUTRAL_SUBSTRATE.l),
        target.a - SUBSTRATE_COMPENSATION * (substrate.a - NEUTRAL_SUBSTRATE.a),
        target.b - SUBSTRATE_COMPENSATION * (substrate.b - NEUTRAL_SUBSTRATE.b),
    )
    .clamped()
}

/// Per-call search parameters shared by every subset evaluation
struct SearchContext<'a> {
    target: LabColor,
    adjusted_target: Option<LabColor>,
    model: MixingModel,
    options: &'a RecipeOptions,
}

impl SearchContext<'_> {
    fn aim(&self) -> LabColor {
        self.adjusted_target.unwrap_or(self.target)
    }
}

/// What happened to one subset
enum SubsetOutcome {
    Found(RecipeResult),
    OverCoverage(f64),
}

/// Recipe service that finds ink combinations for a target color and
/// corrects recipes that missed their target.
///
/// Holds the engine configuration and a bounded result cache; all other state
/// is per call, so one service can be shared across threads.
pub struct RecipeService {
    config: EngineConfig,
    cache: RecipeCache,
}

impl RecipeService {
    /// Create a service after validating the configuration
    pub fn new(config: EngineConfig) -> Result<Self, ColorError> {
        config.validate()?;
        let capacity = NonZeroUsize::new(config.cache_capacity).ok_or_else(|| {
            ColorError::InvalidOptions("cache_capacity must be at least 1".into())
        })?;
        Ok(Self {
            config,
            cache: RecipeCache::new(capacity),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn cache(&self) -> &RecipeCache {
        &self.cache
    }

    /// Find up to `options.max_results` recipes for `target`, best first.
    ///
    /// Repeated calls with the same target, options and catalog return the
    /// cached result.
    pub fn find_recipes(
        &self,
        target: LabColor,
        catalog: &InkCatalog,
        options: &RecipeOptions,
    ) -> Result<RecipeSearchResult, ColorError> {
        target.validate()?;
        options.validate()?;
        let model = options.mixing.unwrap_or(self.config.mixing);

        let key = recipe_cache_key(target, options, &model, &catalog.fingerprint());
        if let Some(cached) = self.cache.get(&key) {
            return Ok(cached);
        }

        let result = self.search(target, catalog, options, model)?;
        self.cache.insert(key, result.clone());
        Ok(result)
    }

    /// Best recipe only
    pub fn find_recipe(
        &self,
        target: LabColor,
        catalog: &InkCatalog,
        options: &RecipeOptions,
    ) -> Result<Option<RecipeResult>, ColorError> {
        let search = self.find_recipes(target, catalog, options)?;
        Ok(search.results.into_iter().next())
    }

    /// Suggest corrective additions for a recipe whose print measured `actual`
    pub fn correct(
        &self,
        target: LabColor,
        actual: LabColor,
        current_recipe: &[RecipeComponent],
        catalog: &InkCatalog,
    ) -> Result<CorrectionOutcome, ColorError> {
        correction::correct(target, actual, current_recipe, catalog, &self.config)
    }

    fn search(
        &self,
        target: LabColor,
        catalog: &InkCatalog,
        options: &RecipeOptions,
        model: MixingModel,
    ) -> Result<RecipeSearchResult, ColorError> {
        let ctx = SearchContext {
            target,
            adjusted_target: options
                .substrate_lab
                .map(|substrate| substrate_adjusted_target(target, substrate)),
            model,
            options,
        };

        let mut candidates = generate_candidates(
            catalog,
            &options.preferred_concentrations,
            options.include_white,
        );
        if candidates.is_empty() {
            tracing::debug!("No candidates for the requested concentrations");
            return Ok(RecipeSearchResult {
                results: Vec::new(),
                feasibility: Feasibility::impossible(
                    InfeasibleReason::NoCandidates,
                    "No catalog ink is available at the requested concentrations",
                ),
            });
        }
        let search = &self.config.search;
        if search.prefilter && candidates.len() > search.prefilter_top_m {
            candidates = prefilter(&candidates, ctx.aim(), search.prefilter_top_m);
        }

        let mut rng = match options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut results = Vec::new();
        let mut over_coverage = 0usize;
        let max_size = options.max_inks.min(candidates.len());

        'sizes: for size in 1..=max_size {
            let subsets = subsets_of_size(&candidates, size, search, &mut rng);
            tracing::debug!(
                size,
                candidates = candidates.len(),
                subsets = subsets.len(),
                plan = ?plan_for(candidates.len(), size, search),
                "Evaluating subsets"
            );

            for outcome in self.evaluate_subsets(&candidates, &subsets, &ctx)? {
                match outcome {
                    SubsetOutcome::Found(result) => {
                        let excellent = result.delta_e < search.excellent_threshold;
                        results.push(result);
                        if excellent && search.early_termination {
                            tracing::debug!(size, "Excellent match found, stopping search");
                            break 'sizes;
                        }
                    }
                    SubsetOutcome::OverCoverage(tac) => {
                        tracing::trace!(tac, "Subset rejected over coverage limit");
                        over_coverage += 1;
                    }
                }
            }
        }

        let results = rank(results, options.max_results);
        let feasibility = self.feasibility(&results, over_coverage);
        Ok(RecipeSearchResult {
            results,
            feasibility,
        })
    }

    /// Evaluate subsets in enumeration order; parallel evaluation keeps the order
    fn evaluate_subsets(
        &self,
        candidates: &[Candidate],
        subsets: &[Vec<usize>],
        ctx: &SearchContext,
    ) -> Result<Vec<SubsetOutcome>, ColorError> {
        #[cfg(feature = "parallel")]
        {
            subsets
                .par_iter()
                .map(|subset| self.evaluate_subset(candidates, subset, ctx))
                .collect()
        }
        #[cfg(not(feature = "parallel"))]
        {
            subsets
                .iter()
                .map(|subset| self.evaluate_subset(candidates, subset, ctx))
                .collect()
        }
    }

    fn evaluate_subset(
        &self,
        candidates: &[Candidate],
        subset: &[usize],
        ctx: &SearchContext,
    ) -> Result<SubsetOutcome, ColorError> {
        let members: Vec<&Candidate> = subset.iter().map(|&i| &candidates[i]).collect();
        let components: Vec<MixComponent> =
            members.iter().map(|c| MixComponent::from(*c)).collect();
        let optimized = optimize_ratios(&components, ctx.aim(), &ctx.model, &self.config.optimizer)?;
        tracing::trace!(
            inks = ?members.iter().map(|c| c.key()).collect::<Vec<_>>(),
            delta_e = optimized.delta_e,
            iterations = optimized.iterations,
            converged = optimized.converged,
            "Optimized subset"
        );
        Ok(self.create_result(&members, &components, &optimized.ratios, ctx))
    }

    fn create_result(
        &self,
        members: &[&Candidate],
        components: &[MixComponent],
        ratios: &[f64],
        ctx: &SearchContext,
    ) -> SubsetOutcome {
        let kept = significant_ratios(ratios, self.config.scoring.min_ratio);
        let kept_components: Vec<MixComponent> = kept.iter().map(|&(i, _)| components[i]).collect();
        let kept_ratios: Vec<f64> = kept.iter().map(|&(_, r)| r).collect();

        // Achieved color and Delta E follow the reported (filtered) ratios
        let achieved = mix_unchecked(&kept_components, &kept_ratios, &ctx.model);
        let delta_e = delta_e_00(achieved, ctx.aim());

        let mut total_cost = 0.0;
        let mut tac = 0.0;
        let mut recipe = Vec::with_capacity(kept.len());
        for &(i, ratio) in &kept {
            let candidate = members[i];
            let percentage = ratio * 100.0;
            total_cost += ratio * candidate.unit_cost;
            tac += coverage_of(
                candidate.category,
                candidate.concentration,
                percentage,
                &self.config.coverage,
            );
            recipe.push(RecipeComponent {
                ink_id: candidate.ink_id.clone(),
                ink_name: candidate.ink_name.clone(),
                concentration: candidate.concentration,
                ratio,
                percentage,
                plate_percentage: ctx
                    .model
                    .dot_gain
                    .then(|| compensate(ctx.model.printing_method, percentage)),
            });
        }

        if tac > self.config.coverage.tac_limit + TAC_EPSILON {
            return SubsetOutcome::OverCoverage(tac);
        }

        SubsetOutcome::Found(RecipeResult {
            target: ctx.target,
            adjusted_target: ctx.adjusted_target,
            achieved,
            delta_e,
            total_cost,
            tac,
            score: score(
                delta_e,
                total_cost,
                recipe.len(),
                ctx.options.cost_weight,
                self.config.scoring.ink_count_penalty,
            ),
            quality: QualityLabel::from_delta_e(delta_e),
            components: recipe,
        })
    }

    fn feasibility(&self, results: &[RecipeResult], over_coverage: usize) -> Feasibility {
        let Some(best) = results.first() else {
            return if over_coverage > 0 {
                Feasibility::impossible(
                    InfeasibleReason::TacLimitExceeded,
                    format!(
                        "All {over_coverage} combinations exceed the {}% coverage limit",
                        self.config.coverage.tac_limit
                    ),
                )
            } else {
                Feasibility::impossible(
                    InfeasibleReason::NoCandidates,
                    "No ink combination could be evaluated",
                )
            };
        };

        let limit = self.config.scoring.max_acceptable_delta_e;
        if best.delta_e > limit {
            tracing::debug!(delta_e = best.delta_e, limit, "Target outside catalog gamut");
            return Feasibility::impossible(
                InfeasibleReason::ColorDifferenceTooLarge,
                format!(
                    "Closest match is Delta E {:.2}; the target is outside the catalog gamut, \
                     add a suitable spot ink or revise the target",
                    best.delta_e
                ),
            );
        }
        Feasibility::possible(format!(
            "Best match Delta E {:.2} ({})",
            best.delta_e,
            best.quality.as_str()
        ))
    }
}

impl Default for RecipeService {
    fn default() -> Self {
        let config = EngineConfig::default();
        let capacity = NonZeroUsize::new(config.cache_capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            config,
            cache: RecipeCache::new(capacity),
        }
    }
}

/// Sort by score (stable, so ties keep enumeration order), drop repeated ink
/// sets and keep the top `max_results`.
fn rank(mut results: Vec<RecipeResult>, max_results: usize) -> Vec<RecipeResult> {
    results.sort_by(|a, b| a.score.total_cmp(&b.score));
    let mut seen = HashSet::new();
    results
        .into_iter()
        .filter(|result| {
            let inks: Vec<String> = result
                .components
                .iter()
                .map(|c| format!("{}@{}", c.ink_id, c.concentration))
                .collect();
            seen.insert(inks)
        })
        .take(max_results)
        .collect()
}
