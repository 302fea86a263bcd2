//! Seed catalog of global units and conversions.
//!
//! The catalog is embedded JSON parsed on demand into an owned value.
//! Callers construct it once at startup and pass it down; there is no
//! process-global cached copy.

use serde::Deserialize;
use std::collections::HashSet;
use thiserror::Error;

/// Embedded JSON data file.
static UNITS_JSON: &str = include_str!("data/units.json");

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Invalid catalog JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Conversion references unknown unit: {0}")]
    UnknownUnit(String),
}

/// A unit as stored in the seed data.
///
/// The category is a plain string here ("mass", "volume", "grouping");
/// consumers map it onto their own category type.
#[derive(Debug, Clone, Deserialize)]
pub struct SeedUnit {
    pub name: String,
    pub category: String,
    pub singular: String,
    pub plural: String,
    #[serde(default)]
    pub aliases: Vec<String>,
}

/// A fully defined global conversion between two seed units.
#[derive(Debug, Clone, Deserialize)]
pub struct SeedConversion {
    pub from_unit: String,
    pub from_qty: f64,
    pub to_unit: String,
    pub to_qty: f64,
}

/// Parsed seed catalog: global units plus global conversions.
#[derive(Debug, Clone, Deserialize)]
pub struct SeedCatalog {
    pub units: Vec<SeedUnit>,
    pub conversions: Vec<SeedConversion>,
}

impl SeedCatalog {
    /// Parse the embedded catalog.
    ///
    /// Every conversion is checked to reference units present in the
    /// catalog, so downstream consumers never see a dangling edge.
    pub fn load() -> Result<Self, CatalogError> {
        let catalog: SeedCatalog = serde_json::from_str(UNITS_JSON)?;

        let names: HashSet<&str> = catalog.units.iter().map(|u| u.name.as_str()).collect();
        for conversion in &catalog.conversions {
            for name in [&conversion.from_unit, &conversion.to_unit] {
                if !names.contains(name.as_str()) {
                    return Err(CatalogError::UnknownUnit(name.clone()));
                }
            }
        }

        Ok(catalog)
    }

    /// Look up a seed unit by its canonical name.
    pub fn unit(&self, name: &str) -> Option<&SeedUnit> {
        self.units.iter().find(|u| u.name == name)
    }
}
