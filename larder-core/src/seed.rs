//! Adapter from the embedded seed catalog to engine types.

use thiserror::Error;
use uuid::Uuid;

use larder_unit_data::{CatalogError, SeedCatalog};

use crate::conversion::{ConversionScope, UnitConversion};
use crate::error::ConversionError;
use crate::source::UnitDataSource;
use crate::unit::{Unit, UnitCategory};

#[derive(Error, Debug)]
pub enum SeedError {
    #[error("Invalid seed catalog: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Unknown category '{category}' for seed unit '{unit}'")]
    UnknownCategory { unit: String, category: String },

    #[error("Seed conversion references unknown unit: {0}")]
    UnknownUnit(String),

    #[error("Invalid seed conversion: {0}")]
    Conversion(#[from] ConversionError),
}

/// [`UnitDataSource`] backed by the embedded global catalog.
///
/// Entity-scoped conversions are a persistence concern; this source never
/// supplies any. Construct once at startup and pass down.
pub struct SeedUnitSource {
    units: Vec<Unit>,
    conversions: Vec<UnitConversion>,
}

impl SeedUnitSource {
    /// Load and validate the embedded catalog.
    pub fn load() -> Result<Self, SeedError> {
        Self::from_catalog(&SeedCatalog::load()?)
    }

    /// Build engine types from an already loaded catalog.
    pub fn from_catalog(catalog: &SeedCatalog) -> Result<Self, SeedError> {
        let mut units = Vec::new();
        for seed in &catalog.units {
            let category = UnitCategory::from_str(&seed.category).ok_or_else(|| {
                SeedError::UnknownCategory {
                    unit: seed.name.clone(),
                    category: seed.category.clone(),
                }
            })?;
            units.push(
                Unit::new(&seed.name, category)
                    .with_display(&seed.singular, &seed.plural)
                    .with_aliases(&seed.aliases),
            );
        }

        let find = |name: &str| -> Result<Unit, SeedError> {
            units
                .iter()
                .find(|unit| unit.name == name)
                .cloned()
                .ok_or_else(|| SeedError::UnknownUnit(name.to_string()))
        };
        let mut conversions = Vec::new();
        for seed in &catalog.conversions {
            conversions.push(UnitConversion::defined(
                find(&seed.from_unit)?,
                find(&seed.to_unit)?,
                seed.from_qty,
                seed.to_qty,
                ConversionScope::Global,
            )?);
        }

        Ok(Self { units, conversions })
    }
}

impl UnitDataSource for SeedUnitSource {
    fn global_units(&self) -> Vec<Unit> {
        self.units.clone()
    }

    fn global_unit_conversions(&self) -> Vec<UnitConversion> {
        self.conversions.clone()
    }

    fn entity_unit_conversions(&self, _entity_id: Uuid) -> Vec<UnitConversion> {
        Vec::new()
    }
}
