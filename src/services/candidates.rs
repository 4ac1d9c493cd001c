//! Candidate generation: expands catalog inks into (ink, concentration) units

use crate::models::{Candidate, InkCatalog, InkDefinition, LabColor};
use crate::services::delta_e::delta_e_00;

/// Cost multiplier for diluted inks; interpolated between table entries
const CONCENTRATION_COST: [(u8, f64); 3] = [(40, 1.5), (70, 1.2), (100, 1.0)];

/// Relative production cost of an ink at `level` percent
pub fn concentration_cost_factor(level: u8) -> f64 {
    let (first, last) = (CONCENTRATION_COST[0], CONCENTRATION_COST[2]);
    if level <= first.0 {
        return first.1;
    }
    if level >= last.0 {
        return last.1;
    }
    for pair in CONCENTRATION_COST.windows(2) {
        let ((lo, lo_cost), (hi, hi_cost)) = (pair[0], pair[1]);
        if level <= hi {
            let t = (level - lo) as f64 / (hi - lo) as f64;
            return lo_cost + t * (hi_cost - lo_cost);
        }
    }
    last.1
}

/// Emit one candidate per ink and requested level.
///
/// A level is used when the ink defines it or when it lies between two
/// defined levels (interpolated sample). Levels outside an ink's range are
/// skipped rather than duplicating the nearest sample. Requested levels are
/// deduplicated, so no ink appears twice at the same concentration.
pub fn generate_candidates(
    catalog: &InkCatalog,
    levels: &[u8],
    include_white: bool,
) -> Vec<Candidate> {
    let mut levels = levels.to_vec();
    levels.sort_unstable_by(|a, b| b.cmp(a));
    levels.dedup();

    catalog
        .inks()
        .iter()
        .filter(|ink| include_white || !ink.is_white())
        .flat_map(|ink| {
            levels
                .iter()
                .filter(|&&level| ink.covers(level))
                .filter_map(move |&level| candidate_for(ink, level))
        })
        .collect()
}

fn candidate_for(ink: &InkDefinition, level: u8) -> Option<Candidate> {
    let lab = ink.sample_at(level).ok()?;
    Some(Candidate {
        ink_id: ink.id.clone(),
        ink_name: ink.name.clone(),
        category: ink.category,
        concentration: level,
        lab,
        unit_cost: ink.cost * concentration_cost_factor(level),
        opacity: ink.opacity(),
    })
}

/// Candidates ordered by Delta E00 to `target`, closest first
pub fn rank_by_proximity(candidates: &[Candidate], target: LabColor) -> Vec<(usize, f64)> {
    let mut ranked: Vec<(usize, f64)> = candidates
        .iter()
        .enumerate()
        .map(|(i, c)| (i, delta_e_00(c.lab, target)))
        .collect();
    ranked.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
    ranked
}
