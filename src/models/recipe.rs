use serde::{Deserialize, Serialize};

use crate::models::{ColorError, LabColor, MixingModel};

/// Options for one recipe search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecipeOptions {
    pub max_inks: usize,
    pub preferred_concentrations: Vec<u8>,
    pub include_white: bool,
    /// Weight of total cost in the score, [0, 1]
    pub cost_weight: f64,
    pub max_results: usize,
    /// Substrate color to compensate the target against
    pub substrate_lab: Option<LabColor>,
    /// Seed for sampled searches; `None` draws from entropy and is not reproducible
    pub seed: Option<u64>,
    /// Overrides the engine's default mixing model
    pub mixing: Option<MixingModel>,
}

impl Default for RecipeOptions {
    fn default() -> Self {
        Self {
            max_inks: 3,
            preferred_concentrations: vec![100, 70, 40],
            include_white: true,
            cost_weight: 0.1,
            max_results: 5,
            substrate_lab: None,
            seed: None,
            mixing: None,
        }
    }
}

impl RecipeOptions {
    pub fn validate(&self) -> Result<(), ColorError> {
        if self.max_inks == 0 {
            return Err(ColorError::InvalidOptions("max_inks must be at least 1".into()));
        }
        if self.max_results == 0 {
            return Err(ColorError::InvalidOptions(
                "max_results must be at least 1".into(),
            ));
        }
        if self.preferred_concentrations.is_empty() {
            return Err(ColorError::InvalidOptions(
                "at least one concentration level is required".into(),
            ));
        }
        if let Some(level) = self
            .preferred_concentrations
            .iter()
            .find(|&&level| level == 0 || level > 100)
        {
            return Err(ColorError::InvalidOptions(format!(
                "concentration {level}% is not in 1..=100"
            )));
        }
        if !(0.0..=1.0).contains(&self.cost_weight) {
            return Err(ColorError::InvalidOptions(format!(
                "cost_weight {} is not in [0, 1]",
                self.cost_weight
            )));
        }
        if let Some(substrate) = &self.substrate_lab {
            substrate.validate()?;
        }
        Ok(())
    }
}

/// Qualitative label from fixed Delta E00 bands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QualityLabel {
    Excellent,
    Good,
    Acceptable,
    Fair,
    Poor,
}

impl QualityLabel {
    pub fn from_delta_e(delta_e: f64) -> Self {
        if delta_e < 1.0 {
            QualityLabel::Excellent
        } else if delta_e < 2.0 {
            QualityLabel::Good
        } else if delta_e < 3.5 {
            QualityLabel::Acceptable
        } else if delta_e <= 5.0 {
            QualityLabel::Fair
        } else {
            QualityLabel::Poor
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QualityLabel::Excellent => "Excellent",
            QualityLabel::Good => "Good",
            QualityLabel::Acceptable => "Acceptable",
            QualityLabel::Fair => "Fair",
            QualityLabel::Poor => "Poor",
        }
    }
}

/// One ink line of a recipe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeComponent {
    pub ink_id: String,
    pub ink_name: String,
    pub concentration: u8,
    pub ratio: f64,
    pub percentage: f64,
    /// Plate value compensating press dot gain, when the model applies it
    pub plate_percentage: Option<f64>,
}

/// Result of a recipe optimization, immutable once returned
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeResult {
    pub target: LabColor,
    /// Target after substrate compensation, when a substrate was given
    pub adjusted_target: Option<LabColor>,
    pub achieved: LabColor,
    pub components: Vec<RecipeComponent>,
    pub delta_e: f64,
    pub total_cost: f64,
    /// Weighted total area coverage, percent
    pub tac: f64,
    pub score: f64,
    pub quality: QualityLabel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InfeasibleReason {
    ColorDifferenceTooLarge,
    InsufficientTacHeadroom,
    TacLimitExceeded,
    NoCandidates,
}

/// Structured "can this be done" answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feasibility {
    pub is_possible: bool,
    pub reason: Option<InfeasibleReason>,
    pub recommendation: String,
}

impl Feasibility {
    pub fn possible(recommendation: impl Into<String>) -> Self {
        Self {
            is_possible: true,
            reason: None,
            recommendation: recommendation.into(),
        }
    }

    pub fn impossible(reason: InfeasibleReason, recommendation: impl Into<String>) -> Self {
        Self {
            is_possible: false,
            reason: Some(reason),
            recommendation: recommendation.into(),
        }
    }
}

/// Ranked results of a recipe search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeSearchResult {
    pub results: Vec<RecipeResult>,
    pub feasibility: Feasibility,
}

impl RecipeSearchResult {
    pub fn best(&self) -> Option<&RecipeResult> {
        self.results.first()
    }
}

/// Signed per-axis Lab difference
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LabDelta {
    pub dl: f64,
    pub da: f64,
    pub db: f64,
}

impl LabDelta {
    pub const fn new(dl: f64, da: f64, db: f64) -> Self {
        Self { dl, da, db }
    }

    /// `to - from`
    pub fn between(from: LabColor, to: LabColor) -> Self {
        Self {
            dl: to.l - from.l,
            da: to.a - from.a,
            db: to.b - from.b,
        }
    }
}

/// Target minus actual, plus the overall Delta E00
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorDifference {
    pub delta: LabDelta,
    pub delta_e: f64,
}

/// An ink from the catalog to add to the running recipe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrectionSuggestion {
    pub ink_id: String,
    pub ink_name: String,
    /// Percentage to add, relative to the current batch
    pub percentage: f64,
    pub expected_impact: LabDelta,
    pub suitability: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CorrectionAxis {
    Lighter,
    Darker,
    Redder,
    Greener,
    Yellower,
    Bluer,
}

/// Generic special ink recommended when no catalog ink fits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecialInkSuggestion {
    pub name: String,
    pub axis: CorrectionAxis,
    pub min_percentage: f64,
    pub max_percentage: f64,
    pub expected_impact: LabDelta,
    pub note: String,
}

/// Answer of the correction engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrectionOutcome {
    pub color_difference: ColorDifference,
    pub feasibility: Feasibility,
    pub correction_inks: Vec<CorrectionSuggestion>,
    pub special_inks: Vec<SpecialInkSuggestion>,
    /// Current recipe plus the additions, renormalized to 100%
    pub suggested_recipe: Vec<RecipeComponent>,
    pub predicted_color: LabColor,
}
