//! Data-supplier boundary between the engine and the persistence layer.
//!
//! The engine never reads storage itself; units and conversions are handed
//! in through this trait, already materialized.

use std::collections::HashMap;
use uuid::Uuid;

use crate::conversion::UnitConversion;
use crate::unit::Unit;

/// Trait for unit data suppliers, enabling mockability in tests.
pub trait UnitDataSource {
    /// All globally known units.
    fn global_units(&self) -> Vec<Unit>;

    /// Globally valid conversions (fully defined).
    fn global_unit_conversions(&self) -> Vec<UnitConversion>;

    /// Conversions scoped to one entity (fully defined; may be empty).
    fn entity_unit_conversions(&self, entity_id: Uuid) -> Vec<UnitConversion>;
}

/// In-memory unit data source for testing.
#[derive(Default)]
pub struct MockUnitSource {
    units: Vec<Unit>,
    global_conversions: Vec<UnitConversion>,
    entity_conversions: HashMap<Uuid, Vec<UnitConversion>>,
}

impl MockUnitSource {
    /// Create a new empty mock source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a global unit.
    pub fn with_unit(mut self, unit: Unit) -> Self {
        self.units.push(unit);
        self
    }

    /// Add several global units.
    pub fn with_units<I>(mut self, units: I) -> Self
    where
        I: IntoIterator<Item = Unit>,
    {
        self.units.extend(units);
        self
    }

    /// Add a global conversion.
    pub fn with_global_conversion(mut self, conversion: UnitConversion) -> Self {
        self.global_conversions.push(conversion);
        self
    }

    /// Add a conversion scoped to one entity.
    pub fn with_entity_conversion(
        mut self,
        entity_id: Uuid,
        conversion: UnitConversion,
    ) -> Self {
        self.entity_conversions
            .entry(entity_id)
            .or_default()
            .push(conversion);
        self
    }
}

impl UnitDataSource for MockUnitSource {
    fn global_units(&self) -> Vec<Unit> {
        self.units.clone()
    }

    fn global_unit_conversions(&self) -> Vec<UnitConversion> {
        self.global_conversions.clone()
    }

    fn entity_unit_conversions(&self, entity_id: Uuid) -> Vec<UnitConversion> {
        self.entity_conversions
            .get(&entity_id)
            .cloned()
            .unwrap_or_default()
    }
}
