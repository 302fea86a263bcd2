//! Unit conversion engine for dietary data.
//!
//! Models physical measurement units (mass, volume, and count-based
//! grouping units), composes globally defined and per-ingredient custom
//! conversions into an undirected weighted graph, and answers conversion
//! and rescaling queries over it. The graph may be disconnected (e.g. mass
//! and volume with no density bridge defined); that is an expected state,
//! reported as a no-path error, not a failure of the engine.

pub mod conversion;
pub mod error;
pub mod seed;
pub mod source;
pub mod unit;
pub mod units_system;

pub use conversion::{ConversionScope, UnitConversion};
pub use error::{ConversionError, UnitsSystemError};
pub use seed::{SeedError, SeedUnitSource};
pub use source::{MockUnitSource, UnitDataSource};
pub use unit::{Unit, UnitCategory};
pub use units_system::{IngredientUnitsSystem, BASE_UNIT_NAME};
