//! Engine configuration
//!
//! Every section has defaults, so a JSON document only needs the values it
//! changes. The core never reads files; callers pass the document text.

use serde::{Deserialize, Serialize};

use crate::models::{ColorError, InkCategory, MixingModel};

/// Gradient descent and coordinate search hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerSettings {
    pub max_iterations: usize,
    pub learning_rate: f64,
    pub momentum: f64,
    /// Learning rate multiplier applied every `decay_interval` iterations
    pub lr_decay: f64,
    pub decay_interval: usize,
    /// Forward finite-difference step
    pub gradient_epsilon: f64,
    /// Stop once Delta E00 drops below this
    pub tolerance: f64,
    pub coordinate_step: f64,
    pub min_coordinate_step: f64,
    /// Polish the best gradient iterate with the coordinate search
    pub refine: bool,
}

impl Default for OptimizerSettings {
    fn default() -> Self {
        Self {
            max_iterations: 300,
            learning_rate: 0.02,
            momentum: 0.9,
            lr_decay: 0.9,
            decay_interval: 25,
            gradient_epsilon: 0.001,
            tolerance: 0.5,
            coordinate_step: 0.05,
            min_coordinate_step: 0.0025,
            refine: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    /// Above this many subsets of one size, switch to random sampling
    pub enumeration_ceiling: usize,
    pub sample_budget: usize,
    pub prefilter: bool,
    /// Candidates kept by the proximity pre-filter, process inks excluded
    pub prefilter_top_m: usize,
    pub excellent_threshold: f64,
    pub early_termination: bool,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            enumeration_ceiling: 2000,
            sample_budget: 400,
            prefilter: true,
            prefilter_top_m: 8,
            excellent_threshold: 1.0,
            early_termination: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringSettings {
    pub ink_count_penalty: f64,
    /// Ratios below this are dropped from formatted recipes
    pub min_ratio: f64,
    /// Best Delta E above this makes the search infeasible
    pub max_acceptable_delta_e: f64,
}

impl Default for ScoringSettings {
    fn default() -> Self {
        Self {
            ink_count_penalty: 0.1,
            min_ratio: 0.01,
            max_acceptable_delta_e: 10.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoverageSettings {
    /// Total area coverage ceiling, percent
    pub tac_limit: f64,
    pub process_weight: f64,
    pub spot_weight: f64,
    pub metallic_weight: f64,
    pub fluorescent_weight: f64,
    pub medium_weight: f64,
    pub custom_weight: f64,
}

impl Default for CoverageSettings {
    fn default() -> Self {
        Self {
            tac_limit: 300.0,
            process_weight: 1.0,
            spot_weight: 1.0,
            metallic_weight: 1.2,
            fluorescent_weight: 1.0,
            medium_weight: 0.0,
            custom_weight: 1.0,
        }
    }
}

impl CoverageSettings {
    pub fn weight(&self, category: InkCategory) -> f64 {
        match category {
            InkCategory::Process => self.process_weight,
            InkCategory::Spot => self.spot_weight,
            InkCategory::Metallic => self.metallic_weight,
            InkCategory::Fluorescent => self.fluorescent_weight,
            InkCategory::Medium => self.medium_weight,
            InkCategory::Custom => self.custom_weight,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrectionSettings {
    /// Above this Delta E00 the recipe should be remade
    pub max_delta_e: f64,
    /// Minimum remaining TAC, percentage points
    pub min_tac_headroom: f64,
    /// Below this Delta E00 no correction is needed
    pub within_tolerance: f64,
    pub min_add_percentage: f64,
    pub max_add_percentage: f64,
    pub max_inks: usize,
}

impl Default for CorrectionSettings {
    fn default() -> Self {
        Self {
            max_delta_e: 10.0,
            min_tac_headroom: 10.0,
            within_tolerance: 1.0,
            min_add_percentage: 1.0,
            max_add_percentage: 20.0,
            max_inks: 3,
        }
    }
}

/// Top-level engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub optimizer: OptimizerSettings,
    pub search: SearchSettings,
    pub scoring: ScoringSettings,
    pub coverage: CoverageSettings,
    pub correction: CorrectionSettings,
    pub mixing: MixingModel,
    pub cache_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            optimizer: OptimizerSettings::default(),
            search: SearchSettings::default(),
            scoring: ScoringSettings::default(),
            coverage: CoverageSettings::default(),
            correction: CorrectionSettings::default(),
            mixing: MixingModel::default(),
            cache_capacity: 256,
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ColorError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ColorError> {
        let opt = &self.optimizer;
        if opt.gradient_epsilon <= 0.0 || opt.learning_rate <= 0.0 {
            return Err(ColorError::InvalidOptions(
                "learning_rate and gradient_epsilon must be positive".into(),
            ));
        }
        if !(0.0..1.0).contains(&opt.momentum) {
            return Err(ColorError::InvalidOptions("momentum must be in [0, 1)".into()));
        }
        if opt.decay_interval == 0 {
            return Err(ColorError::InvalidOptions(
                "decay_interval must be at least 1".into(),
            ));
        }
        if opt.coordinate_step <= 0.0 || opt.min_coordinate_step <= 0.0 {
            return Err(ColorError::InvalidOptions(
                "coordinate steps must be positive".into(),
            ));
        }
        if self.cache_capacity == 0 {
            return Err(ColorError::InvalidOptions(
                "cache_capacity must be at least 1".into(),
            ));
        }
        if self.correction.min_add_percentage > self.correction.max_add_percentage {
            return Err(ColorError::InvalidOptions(
                "min_add_percentage exceeds max_add_percentage".into(),
            ));
        }
        Ok(())
    }
}
