/// Errors that can occur during color mixing and recipe search
///
/// Only malformed input is an error. "No good recipe" and infeasible
/// corrections are reported as data (see [`crate::models::Feasibility`]).
#[derive(Debug, thiserror::Error)]
pub enum ColorError {
    #[error("Lab component {component} out of range: {value}")]
    InvalidLab { component: &'static str, value: f64 },
    #[error("Length mismatch: {colors} colors but {ratios} ratios")]
    LengthMismatch { colors: usize, ratios: usize },
    #[error("Cannot mix an empty set of inks")]
    EmptyMix,
    #[error("Invalid ratio: {0}")]
    InvalidRatio(f64),
    #[error("Ratios must sum to 1, got {0}")]
    RatioSum(f64),
    #[error("Unknown ink: {0}")]
    UnknownInk(String),
    #[error("Ink '{ink}' has no sample for concentration {level}%")]
    MissingConcentration { ink: String, level: u8 },
    #[error("Invalid options: {0}")]
    InvalidOptions(String),
    #[error("Catalog error: {0}")]
    Catalog(#[from] serde_json::Error),
}
