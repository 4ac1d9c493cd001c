//! Inkmix - ink recipe formulation and correction
//!
//! Finds mixtures of catalog inks that reproduce a target CIELAB color,
//! predicts mixed colors with a Kubelka-Munk model and suggests corrective
//! additions when a print misses its target.

pub mod config;
pub mod models;
pub mod services;

pub use config::EngineConfig;
pub use models::*;
pub use services::{correct, mix, RecipeService};
