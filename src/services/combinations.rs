//! Subset selection over candidates
//!
//! Small search spaces are enumerated in lexicographic index order without
//! recursion. Large ones are sampled with a caller-supplied RNG, so a seeded
//! generator gives reproducible searches.

use std::collections::HashSet;

use rand::seq::index;
use rand::Rng;

use crate::config::SearchSettings;
use crate::models::{Candidate, LabColor};
use crate::services::candidates::rank_by_proximity;

/// Attempts per requested sample before giving up on finding new subsets
const SAMPLE_ATTEMPT_FACTOR: usize = 20;

/// How subsets of one size are produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubsetPlan {
    Enumerate,
    Sample,
}

/// C(n, k), saturating at `usize::MAX`
pub fn binomial(n: usize, k: usize) -> usize {
    if k > n {
        return 0;
    }
    let k = k.min(n - k);
    let mut result: usize = 1;
    for i in 0..k {
        result = match result.checked_mul(n - i) {
            Some(v) => v / (i + 1),
            None => return usize::MAX,
        };
    }
    result
}

/// Lexicographic k-combinations of `0..n`
#[derive(Debug, Clone)]
pub struct Combinations {
    n: usize,
    indices: Vec<usize>,
    started: bool,
    done: bool,
}

impl Combinations {
    pub fn new(n: usize, k: usize) -> Self {
        Self {
            n,
            indices: (0..k).collect(),
            started: false,
            done: k == 0 || k > n,
        }
    }
}

impl Iterator for Combinations {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if !self.started {
            self.started = true;
            return Some(self.indices.clone());
        }
        let k = self.indices.len();
        // Rightmost index that can still move
        let pivot = (0..k).rev().find(|&i| self.indices[i] < self.n - k + i);
        match pivot {
            Some(i) => {
                self.indices[i] += 1;
                for j in i + 1..k {
                    self.indices[j] = self.indices[j - 1] + 1;
                }
                Some(self.indices.clone())
            }
            None => {
                self.done = true;
                None
            }
        }
    }
}

/// A subset may hold each base ink at most once
pub fn has_duplicate_base(candidates: &[Candidate], subset: &[usize]) -> bool {
    let mut seen = HashSet::with_capacity(subset.len());
    subset
        .iter()
        .any(|&i| !seen.insert(candidates[i].ink_id.as_str()))
}

pub fn plan_for(n: usize, k: usize, settings: &SearchSettings) -> SubsetPlan {
    if binomial(n, k) > settings.enumeration_ceiling {
        SubsetPlan::Sample
    } else {
        SubsetPlan::Enumerate
    }
}

/// Valid subsets of size `k`, in deterministic order for a given RNG state
pub fn subsets_of_size<R: Rng + ?Sized>(
    candidates: &[Candidate],
    k: usize,
    settings: &SearchSettings,
    rng: &mut R,
) -> Vec<Vec<usize>> {
    match plan_for(candidates.len(), k, settings) {
        SubsetPlan::Enumerate => Combinations::new(candidates.len(), k)
            .filter(|subset| !has_duplicate_base(candidates, subset))
            .collect(),
        SubsetPlan::Sample => sample_subsets(candidates, k, settings.sample_budget, rng),
    }
}

/// Up to `budget` distinct random subsets, deduplicated by sorted indices
pub fn sample_subsets<R: Rng + ?Sized>(
    candidates: &[Candidate],
    k: usize,
    budget: usize,
    rng: &mut R,
) -> Vec<Vec<usize>> {
    let n = candidates.len();
    if k == 0 || k > n {
        return Vec::new();
    }
    let mut seen: HashSet<Vec<usize>> = HashSet::new();
    let mut subsets = Vec::new();
    let max_attempts = budget.saturating_mul(SAMPLE_ATTEMPT_FACTOR);
    for _ in 0..max_attempts {
        if subsets.len() >= budget {
            break;
        }
        let mut subset = index::sample(rng, n, k).into_vec();
        subset.sort_unstable();
        if has_duplicate_base(candidates, &subset) || !seen.insert(subset.clone()) {
            continue;
        }
        subsets.push(subset);
    }
    subsets
}

/// Restrict the search to the `top_m` candidates closest to `target` plus
/// the essential inks (full-strength process inks and white), keeping the
/// original candidate order.
pub fn prefilter(candidates: &[Candidate], target: LabColor, top_m: usize) -> Vec<Candidate> {
    let mut keep: HashSet<usize> = rank_by_proximity(candidates, target)
        .into_iter()
        .take(top_m)
        .map(|(i, _)| i)
        .collect();
    keep.extend(
        candidates
            .iter()
            .enumerate()
            .filter(|(_, c)| c.is_essential())
            .map(|(i, _)| i),
    );
    candidates
        .iter()
        .enumerate()
        .filter(|(i, _)| keep.contains(i))
        .map(|(_, c)| c.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::InkCategory;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn candidate(id: &str, level: u8, category: InkCategory, l: f64) -> Candidate {
        Candidate {
            ink_id: id.to_string(),
            ink_name: id.to_string(),
            category,
            concentration: level,
            lab: LabColor::new(l, 0.0, 0.0),
            unit_cost: 1.0,
            opacity: 0.85,
        }
    }

    fn pool(n: usize) -> Vec<Candidate> {
        (0..n)
            .map(|i| candidate(&format!("ink{i}"), 100, InkCategory::Spot, i as f64))
            .collect()
    }

    #[test]
    fn binomial_values() {
        assert_eq!(binomial(5, 0), 1);
        assert_eq!(binomial(5, 2), 10);
        assert_eq!(binomial(30, 5), 142_506);
        assert_eq!(binomial(3, 4), 0);
    }

    #[test]
    fn enumerates_all_combinations_in_order() {
        let all: Vec<Vec<usize>> = Combinations::new(4, 2).collect();
        assert_eq!(
            all,
            vec![
                vec![0, 1],
                vec![0, 2],
                vec![0, 3],
                vec![1, 2],
                vec![1, 3],
                vec![2, 3]
            ]
        );
        assert_eq!(Combinations::new(6, 3).count(), 20);
        assert_eq!(Combinations::new(3, 0).count(), 0);
        assert_eq!(Combinations::new(2, 3).count(), 0);
    }

    #[test]
    fn rejects_same_ink_at_two_levels() {
        let candidates = vec![
            candidate("cyan", 100, InkCategory::Process, 55.0),
            candidate("cyan", 70, InkCategory::Process, 65.0),
            candidate("white", 100, InkCategory::Spot, 95.0),
        ];
        let mut rng = StdRng::seed_from_u64(1);
        let subsets = subsets_of_size(&candidates, 2, &SearchSettings::default(), &mut rng);
        assert_eq!(subsets, vec![vec![0, 2], vec![1, 2]]);
    }

    #[test]
    fn switches_to_sampling_above_ceiling() {
        let settings = SearchSettings {
            enumeration_ceiling: 50,
            sample_budget: 30,
            ..Default::default()
        };
        let candidates = pool(20);
        assert_eq!(plan_for(20, 3, &settings), SubsetPlan::Sample);
        let mut rng = StdRng::seed_from_u64(7);
        let subsets = subsets_of_size(&candidates, 3, &settings, &mut rng);
        assert_eq!(subsets.len(), 30);
        let distinct: HashSet<_> = subsets.iter().cloned().collect();
        assert_eq!(distinct.len(), 30);
        assert!(subsets.iter().all(|s| s.windows(2).all(|w| w[0] < w[1])));
    }

    #[test]
    fn seeded_sampling_is_reproducible() {
        let candidates = pool(25);
        let a = sample_subsets(&candidates, 4, 50, &mut StdRng::seed_from_u64(42));
        let b = sample_subsets(&candidates, 4, 50, &mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
    }

    #[test]
    fn sampling_stops_when_space_is_exhausted() {
        let candidates = pool(4);
        let subsets = sample_subsets(&candidates, 2, 100, &mut StdRng::seed_from_u64(3));
        assert_eq!(subsets.len(), 6);
    }

    #[test]
    fn prefilter_keeps_essential_inks() {
        let mut candidates = pool(10);
        candidates.push(candidate("black", 100, InkCategory::Process, 90.0));
        candidates.push(candidate("black", 40, InkCategory::Process, 95.0));
        candidates.push(candidate("white", 100, InkCategory::Spot, 96.0));
        let kept = prefilter(&candidates, LabColor::new(0.0, 0.0, 0.0), 3);
        let keys: Vec<String> = kept.iter().map(Candidate::key).collect();
        assert_eq!(
            keys,
            vec!["ink0@100", "ink1@100", "ink2@100", "black@100", "white@100"]
        );
    }
}
