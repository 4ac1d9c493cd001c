pub mod candidates;
pub mod colorimetry;
pub mod combinations;
pub mod correction;
pub mod delta_e;
pub mod dot_gain;
pub mod mixing;
pub mod optimization;
pub mod recipe_finder;
pub mod scoring;

pub use correction::{correct, predict_corrected_color};
pub use delta_e::{delta_e, DeltaEMethod};
pub use mixing::{mix, mix_inks, overprint, InkLayer, MixComponent};
pub use optimization::{coordinate_descent, optimize_ratios, OptimizationResult};
pub use recipe_finder::RecipeService;
pub use scoring::RecipeCache;
