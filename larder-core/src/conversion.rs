//! Pairwise unit conversions.
//!
//! A conversion relates two distinct units by a ratio of quantities,
//! e.g. "1000 gram = 1 kilogram" or "1 slice = 40 gram". Quantities are
//! optional so a conversion can be created as a placeholder and completed
//! later; only a fully defined conversion can be used for computation.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ConversionError;
use crate::unit::Unit;

/// Whether a conversion applies to every entity or to a single one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionScope {
    /// Available to every entity (e.g. "1000 g = 1 kg").
    Global,
    /// Only valid for one specific ingredient (e.g. "1 slice = 40 g").
    Entity(Uuid),
}

/// A stored ratio between two distinct units.
///
/// The unit pair is fixed at construction; quantities may be edited through
/// the validating setters. Deserialization funnels through the same
/// validation, so a persisted conversion cannot smuggle in a self-loop or
/// a non-positive quantity. Two conversions compare equal when they relate
/// the same unordered pair of units, regardless of direction or ratio.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "RawUnitConversion")]
pub struct UnitConversion {
    pub id: Option<Uuid>,
    from_unit: Unit,
    to_unit: Unit,
    from_qty: Option<f64>,
    to_qty: Option<f64>,
    scope: ConversionScope,
}

impl UnitConversion {
    /// Create a placeholder conversion with no quantities yet.
    pub fn new(
        from_unit: Unit,
        to_unit: Unit,
        scope: ConversionScope,
    ) -> Result<Self, ConversionError> {
        if from_unit == to_unit {
            return Err(ConversionError::IdenticalUnits);
        }
        Ok(Self {
            id: None,
            from_unit,
            to_unit,
            from_qty: None,
            to_qty: None,
            scope,
        })
    }

    /// Create a fully defined conversion, validating both quantities.
    pub fn defined(
        from_unit: Unit,
        to_unit: Unit,
        from_qty: f64,
        to_qty: f64,
        scope: ConversionScope,
    ) -> Result<Self, ConversionError> {
        let mut conversion = Self::new(from_unit, to_unit, scope)?;
        conversion.set_from_qty(Some(from_qty))?;
        conversion.set_to_qty(Some(to_qty))?;
        Ok(conversion)
    }

    pub fn from_unit(&self) -> &Unit {
        &self.from_unit
    }

    pub fn to_unit(&self) -> &Unit {
        &self.to_unit
    }

    pub fn from_qty(&self) -> Option<f64> {
        self.from_qty
    }

    pub fn to_qty(&self) -> Option<f64> {
        self.to_qty
    }

    pub fn scope(&self) -> ConversionScope {
        self.scope
    }

    /// Set the "from" quantity. `None` means "not yet supplied" and is
    /// always accepted; a set value must be strictly positive.
    pub fn set_from_qty(&mut self, qty: Option<f64>) -> Result<(), ConversionError> {
        Self::check_qty(qty)?;
        self.from_qty = qty;
        Ok(())
    }

    /// Set the "to" quantity. Same validation as [`Self::set_from_qty`].
    pub fn set_to_qty(&mut self, qty: Option<f64>) -> Result<(), ConversionError> {
        Self::check_qty(qty)?;
        self.to_qty = qty;
        Ok(())
    }

    fn check_qty(qty: Option<f64>) -> Result<(), ConversionError> {
        match qty {
            Some(q) if q <= 0.0 || !q.is_finite() => {
                Err(ConversionError::NonPositiveQuantity(q))
            }
            _ => Ok(()),
        }
    }

    /// True when both quantities are set.
    pub fn is_defined(&self) -> bool {
        self.from_qty.is_some() && self.to_qty.is_some()
    }

    /// The multiplicative factor from `from_unit` to `to_unit`.
    pub fn ratio(&self) -> Result<f64, ConversionError> {
        match (self.from_qty, self.to_qty) {
            (Some(from), Some(to)) => Ok(to / from),
            _ => Err(ConversionError::Undefined),
        }
    }

    /// Convert a quantity expressed in `from_unit` to `to_unit`.
    pub fn convert_quantity(&self, quantity: f64) -> Result<f64, ConversionError> {
        Ok(quantity * self.ratio()?)
    }

    /// Convert a quantity expressed in `to_unit` back to `from_unit`.
    pub fn reverse_convert_quantity(&self, quantity: f64) -> Result<f64, ConversionError> {
        Ok(quantity / self.ratio()?)
    }

    /// True when both conversions relate the same unordered unit pair.
    pub fn same_pair(&self, other: &Self) -> bool {
        self.links(&other.from_unit, &other.to_unit)
    }

    /// True when this conversion relates the given pair, in either direction.
    pub fn links(&self, a: &Unit, b: &Unit) -> bool {
        (self.from_unit == *a && self.to_unit == *b)
            || (self.from_unit == *b && self.to_unit == *a)
    }
}

impl PartialEq for UnitConversion {
    fn eq(&self, other: &Self) -> bool {
        self.same_pair(other)
    }
}

/// Unvalidated mirror of [`UnitConversion`] used during deserialization.
#[derive(Deserialize)]
struct RawUnitConversion {
    id: Option<Uuid>,
    from_unit: Unit,
    to_unit: Unit,
    from_qty: Option<f64>,
    to_qty: Option<f64>,
    scope: ConversionScope,
}

impl TryFrom<RawUnitConversion> for UnitConversion {
    type Error = ConversionError;

    fn try_from(raw: RawUnitConversion) -> Result<Self, Self::Error> {
        let mut conversion = UnitConversion::new(raw.from_unit, raw.to_unit, raw.scope)?;
        conversion.id = raw.id;
        conversion.set_from_qty(raw.from_qty)?;
        conversion.set_to_qty(raw.to_qty)?;
        Ok(conversion)
    }
}
