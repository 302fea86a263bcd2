//! Measurement unit value type.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};
use uuid::Uuid;

/// Physical category of a measurement unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitCategory {
    Mass,
    Volume,
    /// Count-based units like "slice" or "piece".
    Grouping,
}

impl UnitCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitCategory::Mass => "mass",
            UnitCategory::Volume => "volume",
            UnitCategory::Grouping => "grouping",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "mass" => Some(UnitCategory::Mass),
            "volume" => Some(UnitCategory::Volume),
            "grouping" => Some(UnitCategory::Grouping),
            _ => None,
        }
    }
}

/// A named measurement unit (e.g. "gram", "cup", "slice").
///
/// The persisted id is `None` until the unit is saved. Equality, hashing,
/// and ordering cover only `(name, category)`, so a unit is usable as a
/// graph key before any id has been assigned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Unit {
    pub id: Option<Uuid>,
    pub name: String,
    pub category: UnitCategory,
    pub singular: String,
    pub plural: String,
    /// Alternate spellings accepted during input matching (e.g. "g", "gs").
    pub aliases: Vec<String>,
}

impl Unit {
    /// Create a unit with display labels derived from the name.
    pub fn new(name: impl Into<String>, category: UnitCategory) -> Self {
        let name = name.into();
        Self {
            id: None,
            singular: name.clone(),
            plural: format!("{name}s"),
            name,
            category,
            aliases: Vec::new(),
        }
    }

    pub fn with_display(
        mut self,
        singular: impl Into<String>,
        plural: impl Into<String>,
    ) -> Self {
        self.singular = singular.into();
        self.plural = plural.into();
        self
    }

    pub fn with_aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases = aliases.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = Some(id);
        self
    }

    /// Case-insensitive match against the name, display labels, and aliases.
    pub fn matches_name(&self, input: &str) -> bool {
        let input = input.trim().to_lowercase();
        self.name.to_lowercase() == input
            || self.singular.to_lowercase() == input
            || self.plural.to_lowercase() == input
            || self.aliases.iter().any(|a| a.to_lowercase() == input)
    }
}

impl PartialEq for Unit {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.category == other.category
    }
}

impl Eq for Unit {}

impl Hash for Unit {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.category.hash(state);
    }
}

impl Ord for Unit {
    fn cmp(&self, other: &Self) -> Ordering {
        self.name
            .cmp(&other.name)
            .then_with(|| self.category.as_str().cmp(other.category.as_str()))
    }
}

impl PartialOrd for Unit {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equality_ignores_id() {
        let a = Unit::new("gram", UnitCategory::Mass);
        let b = Unit::new("gram", UnitCategory::Mass).with_id(Uuid::new_v4());
        assert_eq!(a, b);
    }

    #[test]
    fn test_equality_requires_matching_category() {
        let mass = Unit::new("ounce", UnitCategory::Mass);
        let volume = Unit::new("ounce", UnitCategory::Volume);
        assert_ne!(mass, volume);
    }

    #[test]
    fn test_default_display_labels() {
        let unit = Unit::new("slice", UnitCategory::Grouping);
        assert_eq!(unit.singular, "slice");
        assert_eq!(unit.plural, "slices");
    }

    #[test]
    fn test_matches_name_aliases() {
        let gram = Unit::new("gram", UnitCategory::Mass).with_aliases(["g", "gs"]);
        assert!(gram.matches_name("gram"));
        assert!(gram.matches_name("Grams"));
        assert!(gram.matches_name("g"));
        assert!(gram.matches_name(" G "));
        assert!(!gram.matches_name("kg"));
    }

    #[test]
    fn test_category_round_trip() {
        for category in [
            UnitCategory::Mass,
            UnitCategory::Volume,
            UnitCategory::Grouping,
        ] {
            assert_eq!(UnitCategory::from_str(category.as_str()), Some(category));
        }
        assert_eq!(UnitCategory::from_str("length"), None);
    }
}
