//! Assertion helpers for recipe results.

use inkmix::RecipeResult;

/// Percentages sum to 100 and every ratio survived the 1% filter
pub fn assert_well_formed(result: &RecipeResult) {
    let total: f64 = result.components.iter().map(|c| c.percentage).sum();
    assert!(
        (total - 100.0).abs() < 1e-6,
        "Percentages should sum to 100, got {total}"
    );
    for component in &result.components {
        assert!(
            component.ratio >= 0.01,
            "{} kept with ratio {}",
            component.ink_id,
            component.ratio
        );
    }
}

/// Combined percentage of the given inks
pub fn share_of(result: &RecipeResult, ink_ids: &[&str]) -> f64 {
    result
        .components
        .iter()
        .filter(|c| ink_ids.contains(&c.ink_id.as_str()))
        .map(|c| c.percentage)
        .sum()
}
