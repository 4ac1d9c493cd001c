//! Test catalogs and options.

use inkmix::{InkCatalog, InkCategory, InkDefinition, LabColor, RecipeOptions};

/// Process set as it would arrive from a catalog file
pub const PROCESS_CATALOG_JSON: &str = r#"[
    {
        "id": "cyan",
        "name": "Process Cyan",
        "category": "process",
        "concentrations": {
            "100": { "l": 55.0, "a": -37.0, "b": -50.0 },
            "40": { "l": 79.0, "a": -19.0, "b": -27.0 }
        }
    },
    {
        "id": "magenta",
        "name": "Process Magenta",
        "category": "process",
        "concentrations": {
            "100": { "l": 48.0, "a": 74.0, "b": -3.0 },
            "40": { "l": 75.0, "a": 35.0, "b": -6.0 }
        }
    },
    {
        "id": "yellow",
        "name": "Process Yellow",
        "category": "process",
        "concentrations": {
            "100": { "l": 89.0, "a": -5.0, "b": 93.0 },
            "40": { "l": 93.0, "a": -4.0, "b": 42.0 }
        }
    },
    {
        "id": "black",
        "name": "Process Black",
        "category": "process",
        "concentrations": {
            "100": { "l": 18.0, "a": 0.5, "b": 0.0 },
            "40": { "l": 60.0, "a": 0.0, "b": 0.0 }
        },
        "cost": 0.8
    },
    {
        "id": "white",
        "name": "Opaque White",
        "category": "spot",
        "concentrations": {
            "100": { "l": 95.0, "a": 0.0, "b": -1.0 }
        },
        "properties": { "opacity": 0.92 },
        "cost": 0.6
    }
]"#;

pub fn process_catalog() -> InkCatalog {
    InkCatalog::from_json_str(PROCESS_CATALOG_JSON).unwrap()
}

/// Neutral inks only
pub fn grayscale_catalog() -> InkCatalog {
    InkCatalog::new(vec![
        InkDefinition::new("black", "Process Black", InkCategory::Process)
            .with_sample(100, LabColor::new(18.0, 0.5, 0.0)),
        InkDefinition::new("gray", "Neutral Gray", InkCategory::Spot)
            .with_sample(100, LabColor::new(50.0, 0.0, 0.0)),
        InkDefinition::new("white", "Opaque White", InkCategory::Spot)
            .with_sample(100, LabColor::new(95.0, 0.0, -1.0)),
    ])
    .unwrap()
}

/// No ink lighter than L* 50
pub fn dark_catalog() -> InkCatalog {
    InkCatalog::new(vec![
        InkDefinition::new("black", "Process Black", InkCategory::Process)
            .with_sample(100, LabColor::new(18.0, 0.5, 0.0)),
        InkDefinition::new("rubine", "Rubine Red", InkCategory::Spot)
            .with_sample(100, LabColor::new(45.0, 62.0, 8.0)),
        InkDefinition::new("blue", "Reflex Blue", InkCategory::Spot)
            .with_sample(100, LabColor::new(28.0, 22.0, -55.0)),
        InkDefinition::new("brown", "Warm Brown", InkCategory::Spot)
            .with_sample(100, LabColor::new(40.0, 14.0, 20.0)),
    ])
    .unwrap()
}

pub fn seeded_options(seed: u64) -> RecipeOptions {
    RecipeOptions {
        seed: Some(seed),
        ..Default::default()
    }
}
