//! Result scoring, coverage accounting and the recipe cache

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use lru::LruCache;
use sha2::{Digest, Sha256};

use crate::config::CoverageSettings;
use crate::models::{InkCategory, LabColor, MixingModel, RecipeOptions, RecipeSearchResult};

/// Lower is better
pub fn score(
    delta_e: f64,
    total_cost: f64,
    ink_count: usize,
    cost_weight: f64,
    ink_count_penalty: f64,
) -> f64 {
    delta_e + cost_weight * total_cost + ink_count_penalty * ink_count as f64
}

/// Coverage of one recipe line: percentage × strength × category weight
pub fn coverage_of(
    category: InkCategory,
    concentration: u8,
    percentage: f64,
    settings: &CoverageSettings,
) -> f64 {
    percentage * (concentration as f64 / 100.0) * settings.weight(category)
}

/// Drop ratios below `min_ratio` and renormalize the rest.
///
/// Returns (index, ratio) pairs in input order. If every ratio is below the
/// threshold the largest one is kept.
pub fn significant_ratios(ratios: &[f64], min_ratio: f64) -> Vec<(usize, f64)> {
    let mut kept: Vec<(usize, f64)> = ratios
        .iter()
        .copied()
        .enumerate()
        .filter(|(_, r)| *r >= min_ratio)
        .collect();
    if kept.is_empty() {
        if let Some((i, r)) = ratios
            .iter()
            .copied()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(&b.1))
        {
            kept.push((i, r));
        }
    }
    let total: f64 = kept.iter().map(|(_, r)| r).sum();
    if total > 0.0 {
        for (_, r) in kept.iter_mut() {
            *r /= total;
        }
    }
    kept
}

/// Compute a cache key from the normalized query.
///
/// The key is a SHA256 hash of the target (4 decimals), the options that
/// affect the result, the resolved mixing model and the catalog fingerprint.
pub fn recipe_cache_key(
    target: LabColor,
    options: &RecipeOptions,
    model: &MixingModel,
    catalog_fingerprint: &str,
) -> String {
    let mut hasher = Sha256::new();

    hasher.update(format!("{:.4},{:.4},{:.4}", target.l, target.a, target.b).as_bytes());
    hasher.update(b"|inks:");
    hasher.update(options.max_inks.to_le_bytes());
    hasher.update(b"|levels:");
    let mut levels = options.preferred_concentrations.clone();
    levels.sort_unstable();
    levels.dedup();
    hasher.update(&levels);
    hasher.update(b"|white:");
    hasher.update([options.include_white as u8]);
    hasher.update(format!("|cost:{:.6}", options.cost_weight).as_bytes());
    hasher.update(b"|results:");
    hasher.update(options.max_results.to_le_bytes());
    if let Some(substrate) = &options.substrate_lab {
        hasher.update(
            format!(
                "|substrate:{:.4},{:.4},{:.4}",
                substrate.l, substrate.a, substrate.b
            )
            .as_bytes(),
        );
    }
    if let Some(seed) = options.seed {
        hasher.update(b"|seed:");
        hasher.update(seed.to_le_bytes());
    }
    hasher.update(format!("|model:{model:?}").as_bytes());
    hasher.update(b"|catalog:");
    hasher.update(catalog_fingerprint.as_bytes());

    let result = hasher.finalize();
    hex::encode(&result[..16])
}

/// Bounded LRU cache of search results.
///
/// Entries are never replaced once stored; the least recently used entry is
/// evicted when the cache is full.
pub struct RecipeCache {
    entries: Mutex<LruCache<String, RecipeSearchResult>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl RecipeCache {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<String, RecipeSearchResult>> {
        // A panic while holding the lock cannot leave an entry half-written
        match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn get(&self, key: &str) -> Option<RecipeSearchResult> {
        let result = self.lock().get(key).cloned();
        if result.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(cache_key = %key, "Recipe cache hit");
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        result
    }

    pub fn insert(&self, key: String, value: RecipeSearchResult) {
        let mut entries = self.lock();
        if entries.contains(&key) {
            return;
        }
        if entries.len() == entries.cap().get() {
            if let Some((evicted, _)) = entries.pop_lru() {
                tracing::debug!(key = %evicted, "Recipe cache: evicted least recently used entry");
            }
        }
        tracing::debug!(cache_key = %key, size = entries.len() + 1, "Recipe cache: stored result");
        entries.put(key, value);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// (hits, misses)
    pub fn stats(&self) -> (u64, u64) {
        (
            self.hits.load(Ordering::Relaxed),
            self.misses.load(Ordering::Relaxed),
        )
    }
}
