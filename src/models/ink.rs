use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::models::{ColorError, LabColor};

/// Ink families, used for opacity defaults and TAC weighting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InkCategory {
    Process,
    Spot,
    Metallic,
    Fluorescent,
    /// Transparent base used to dilute other inks
    Medium,
    Custom,
}

impl InkCategory {
    /// Relative hiding power when no measured opacity is available
    pub fn default_opacity(&self) -> f64 {
        match self {
            InkCategory::Process => 0.85,
            InkCategory::Spot => 0.9,
            InkCategory::Metallic => 0.98,
            InkCategory::Fluorescent => 0.6,
            InkCategory::Medium => 0.05,
            InkCategory::Custom => 0.85,
        }
    }
}

/// Measured physical properties, all optional
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InkProperties {
    pub opacity: Option<f64>,
    pub viscosity: Option<f64>,
    pub gloss: Option<f64>,
}

/// Catalog entry: Lab samples per concentration level (percent)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InkDefinition {
    pub id: String,
    pub name: String,
    pub category: InkCategory,
    pub concentrations: BTreeMap<u8, LabColor>,
    #[serde(default)]
    pub properties: InkProperties,
    /// Production cost per unit at full strength
    #[serde(default = "default_cost")]
    pub cost: f64,
}

fn default_cost() -> f64 {
    1.0
}

impl InkDefinition {
    pub fn new(id: &str, name: &str, category: InkCategory) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            category,
            concentrations: BTreeMap::new(),
            properties: InkProperties::default(),
            cost: default_cost(),
        }
    }

    pub fn with_sample(mut self, level: u8, lab: LabColor) -> Self {
        self.concentrations.insert(level, lab);
        self
    }

    pub fn with_cost(mut self, cost: f64) -> Self {
        self.cost = cost;
        self
    }

    pub fn with_opacity(mut self, opacity: f64) -> Self {
        self.properties.opacity = Some(opacity);
        self
    }

    pub fn opacity(&self) -> f64 {
        self.properties
            .opacity
            .unwrap_or_else(|| self.category.default_opacity())
    }

    pub fn is_white(&self) -> bool {
        self.id.to_lowercase().contains("white") || self.name.to_lowercase().contains("white")
    }

    pub fn is_medium(&self) -> bool {
        self.category == InkCategory::Medium
    }

    /// The full-strength sample, or the strongest defined level
    pub fn full_strength(&self) -> Option<LabColor> {
        self.concentrations
            .get(&100)
            .or_else(|| self.concentrations.values().next_back())
            .copied()
    }

    /// Whether `level` is defined or lies between two defined levels
    pub fn covers(&self, level: u8) -> bool {
        match (
            self.concentrations.keys().next(),
            self.concentrations.keys().next_back(),
        ) {
            (Some(&lo), Some(&hi)) => (lo..=hi).contains(&level),
            _ => false,
        }
    }

    /// Sample for a concentration level.
    ///
    /// Defined levels are returned as-is, levels between two defined ones are
    /// linearly interpolated, levels outside the defined range fall back to
    /// the nearest defined level.
    pub fn sample_at(&self, level: u8) -> Result<LabColor, ColorError> {
        if let Some(lab) = self.concentrations.get(&level) {
            return Ok(*lab);
        }
        let below = self.concentrations.range(..level).next_back();
        let above = self.concentrations.range(level..).next();
        match (below, above) {
            (Some((&lo, lo_lab)), Some((&hi, hi_lab))) => {
                let t = (level - lo) as f64 / (hi - lo) as f64;
                Ok(LabColor::new(
                    lo_lab.l + (hi_lab.l - lo_lab.l) * t,
                    lo_lab.a + (hi_lab.a - lo_lab.a) * t,
                    lo_lab.b + (hi_lab.b - lo_lab.b) * t,
                ))
            }
            (Some((_, lab)), None) | (None, Some((_, lab))) => Ok(*lab),
            (None, None) => Err(ColorError::MissingConcentration {
                ink: self.id.clone(),
                level,
            }),
        }
    }

    fn validate(&self) -> Result<(), ColorError> {
        if !self.concentrations.contains_key(&100) {
            return Err(ColorError::MissingConcentration {
                ink: self.id.clone(),
                level: 100,
            });
        }
        for lab in self.concentrations.values() {
            lab.validate()?;
        }
        Ok(())
    }
}

/// Per-ink replacement values applied on top of a base catalog
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InkOverride {
    #[serde(default)]
    pub concentrations: BTreeMap<u8, LabColor>,
    pub cost: Option<f64>,
    pub opacity: Option<f64>,
}

/// Custom values keyed by ink id
pub type CatalogOverrides = HashMap<String, InkOverride>;

/// Immutable snapshot of the ink catalog for one or more calls.
///
/// Serialized as a bare array of inks; deserialization runs the same checks
/// as [`InkCatalog::new`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<InkDefinition>", into = "Vec<InkDefinition>")]
pub struct InkCatalog {
    inks: Vec<InkDefinition>,
}

impl InkCatalog {
    /// Build a catalog; every ink must define a sample at 100%
    pub fn new(inks: Vec<InkDefinition>) -> Result<Self, ColorError> {
        for ink in &inks {
            ink.validate()?;
        }
        Ok(Self { inks })
    }

    pub fn from_json_str(json: &str) -> Result<Self, ColorError> {
        let inks: Vec<InkDefinition> = serde_json::from_str(json)?;
        Self::new(inks)
    }

    pub fn inks(&self) -> &[InkDefinition] {
        &self.inks
    }

    pub fn len(&self) -> usize {
        self.inks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inks.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&InkDefinition> {
        self.inks.iter().find(|ink| ink.id == id)
    }

    /// Keep only the listed ink ids
    pub fn restricted_to(&self, ids: &[&str]) -> Self {
        Self {
            inks: self
                .inks
                .iter()
                .filter(|ink| ids.contains(&ink.id.as_str()))
                .cloned()
                .collect(),
        }
    }

    /// Resolve overrides into a new snapshot; the base catalog is untouched
    pub fn with_overrides(&self, overrides: &CatalogOverrides) -> Result<Self, ColorError> {
        if let Some(unknown) = overrides.keys().find(|id| self.get(id).is_none()) {
            return Err(ColorError::UnknownInk(unknown.clone()));
        }
        let inks = self
            .inks
            .iter()
            .map(|ink| {
                let mut ink = ink.clone();
                if let Some(ov) = overrides.get(&ink.id) {
                    ink.concentrations
                        .extend(ov.concentrations.iter().map(|(k, v)| (*k, *v)));
                    if let Some(cost) = ov.cost {
                        ink.cost = cost;
                    }
                    if let Some(opacity) = ov.opacity {
                        ink.properties.opacity = Some(opacity);
                    }
                }
                ink
            })
            .collect();
        Self::new(inks)
    }

    /// Stable digest of the catalog contents, used in cache keys
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for ink in &self.inks {
            hasher.update(ink.id.as_bytes());
            hasher.update(b"|");
            hasher.update(ink.cost.to_bits().to_le_bytes());
            hasher.update(ink.opacity().to_bits().to_le_bytes());
            for (level, lab) in &ink.concentrations {
                hasher.update([*level]);
                hasher.update(lab.l.to_bits().to_le_bytes());
                hasher.update(lab.a.to_bits().to_le_bytes());
                hasher.update(lab.b.to_bits().to_le_bytes());
            }
            hasher.update(b";");
        }
        hex::encode(&hasher.finalize()[..16])
    }
}

/// An (ink, concentration) pair considered as one mixable unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub ink_id: String,
    pub ink_name: String,
    pub category: InkCategory,
    pub concentration: u8,
    pub lab: LabColor,
    pub unit_cost: f64,
    pub opacity: f64,
}

impl Candidate {
    /// `ink@level`, unique within one candidate set
    pub fn key(&self) -> String {
        format!("{}@{}", self.ink_id, self.concentration)
    }

    pub fn is_white(&self) -> bool {
        self.ink_id.to_lowercase().contains("white")
            || self.ink_name.to_lowercase().contains("white")
    }

    /// Full-strength process inks and the white base are always searched
    pub fn is_essential(&self) -> bool {
        self.concentration == 100 && (self.category == InkCategory::Process || self.is_white())
    }
}

impl TryFrom<Vec<InkDefinition>> for InkCatalog {
    type Error = ColorError;

    fn try_from(inks: Vec<InkDefinition>) -> Result<Self, Self::Error> {
        Self::new(inks)
    }
}

impl From<InkCatalog> for Vec<InkDefinition> {
    fn from(catalog: InkCatalog) -> Self {
        catalog.inks
    }
}
