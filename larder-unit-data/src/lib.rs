//! Embedded catalog of measurement units for dietary data.
//!
//! This crate provides the seed set of global units (mass, volume, and
//! count-based grouping units) and the globally valid conversions between
//! them, used to bootstrap a unit-conversion session.
//!
//! # Example
//!
//! ```
//! use larder_unit_data::SeedCatalog;
//!
//! let catalog = SeedCatalog::load().unwrap();
//! let gram = catalog.unit("gram").unwrap();
//! assert_eq!(gram.category, "mass");
//! ```

mod catalog;

pub use catalog::{CatalogError, SeedCatalog, SeedConversion, SeedUnit};
