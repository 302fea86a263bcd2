//! Per-entity unit conversion graph.
//!
//! Builds an undirected weighted graph from the union of global and
//! entity-scoped conversions, answers conversion queries by breadth-first
//! search, and caches resolved paths until the conversion set changes.
//!
//! One system is constructed per editing session (one ingredient being
//! edited). It is single-threaded by design: the path and name-lookup
//! caches use interior mutability and the type is not `Sync`.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use uuid::Uuid;

use crate::conversion::UnitConversion;
use crate::error::UnitsSystemError;
use crate::source::UnitDataSource;
use crate::unit::Unit;

/// Name of the base unit used for rescaling and default reachability queries.
pub const BASE_UNIT_NAME: &str = "gram";

/// Unordered unit pair, ordered canonically so (a, b) and (b, a) collide.
type PairKey = (Unit, Unit);

/// An edge sequence through the graph, stored in the direction it was found.
type EdgePath = Vec<(Unit, Unit)>;

/// Conversion graph for a single entity's editing session.
///
/// The only supported mutations are [`Self::update_entity_conversions`] and
/// [`Self::remove_entity_conversion`]; both atomically rebuild the adjacency
/// map and clear the caches, so a query never observes a stale factor.
pub struct IngredientUnitsSystem {
    units: Vec<Unit>,
    global_conversions: Vec<UnitConversion>,
    entity_conversions: Vec<UnitConversion>,
    /// unit -> neighbor -> multiplicative factor. Every conversion installs
    /// both the forward factor and its reciprocal. BTreeMap keeps neighbor
    /// iteration (and therefore BFS discovery order) deterministic.
    graph: BTreeMap<Unit, BTreeMap<Unit, f64>>,
    /// Resolved edge paths keyed by unordered unit pair.
    path_cache: RefCell<HashMap<PairKey, EdgePath>>,
    /// Lazily built lowercase-name index.
    name_index: RefCell<Option<HashMap<String, Unit>>>,
}

impl IngredientUnitsSystem {
    /// Build a system from the globally available units and conversions.
    pub fn new(units: Vec<Unit>, global_conversions: Vec<UnitConversion>) -> Self {
        let mut system = Self {
            units,
            global_conversions,
            entity_conversions: Vec::new(),
            graph: BTreeMap::new(),
            path_cache: RefCell::new(HashMap::new()),
            name_index: RefCell::new(None),
        };
        system.rebuild_graph();
        system
    }

    /// Build a session for one entity from a data source, layering that
    /// entity's custom conversions over the global set.
    pub fn for_entity(source: &dyn UnitDataSource, entity_id: Option<Uuid>) -> Self {
        let mut system = Self::new(source.global_units(), source.global_unit_conversions());
        if let Some(id) = entity_id {
            system.update_entity_conversions(source.entity_unit_conversions(id));
        }
        system
    }

    /// Rebuild the adjacency map from the current conversion sets and clear
    /// both caches. Every mutation funnels through here.
    ///
    /// Conversions may introduce units the supplier did not list (e.g. a
    /// custom grouping unit); edge insertion makes those endpoints graph
    /// nodes, so name lookup and reachability see them for exactly as long
    /// as a defined conversion references them.
    fn rebuild_graph(&mut self) {
        let mut graph: BTreeMap<Unit, BTreeMap<Unit, f64>> = BTreeMap::new();
        for unit in &self.units {
            graph.entry(unit.clone()).or_default();
        }

        let mut total = 0usize;
        let mut skipped = 0usize;
        for conversion in self.global_conversions.iter().chain(&self.entity_conversions) {
            total += 1;
            let ratio = match conversion.ratio() {
                Ok(ratio) => ratio,
                Err(_) => {
                    // Placeholder conversions carry no usable factor.
                    skipped += 1;
                    continue;
                }
            };
            let from = conversion.from_unit().clone();
            let to = conversion.to_unit().clone();
            graph
                .entry(from.clone())
                .or_default()
                .insert(to.clone(), ratio);
            graph.entry(to).or_default().insert(from, 1.0 / ratio);
        }

        self.graph = graph;
        self.path_cache.borrow_mut().clear();
        *self.name_index.borrow_mut() = None;

        tracing::debug!(
            units = self.graph.len(),
            conversions = total,
            skipped_undefined = skipped,
            "conversion graph rebuilt"
        );
    }

    /// The multiplicative factor to convert a quantity from one unit to
    /// another, following a path of stored conversions.
    ///
    /// Identity queries return 1.0 without touching the graph. Disconnected
    /// units produce a [`UnitsSystemError::NoConversionPath`] error.
    pub fn get_conversion_factor(
        &self,
        from: &Unit,
        to: &Unit,
    ) -> Result<f64, UnitsSystemError> {
        if from == to {
            return Ok(1.0);
        }

        let key = Self::pair_key(from, to);
        let cached = self.path_cache.borrow().get(&key).cloned();
        if let Some(path) = cached {
            // Cached paths are stored in the direction of the first query;
            // invert the product when asked the other way around.
            if let Some(factor) = self.path_factor(&path) {
                let starts_at_from = path.first().map(|(a, _)| a == from).unwrap_or(false);
                return Ok(if starts_at_from { factor } else { 1.0 / factor });
            }
        }

        let path = self
            .find_path(from, to)
            .ok_or_else(|| UnitsSystemError::NoConversionPath {
                from: from.name.clone(),
                to: to.name.clone(),
            })?;
        let factor = self
            .path_factor(&path)
            .ok_or_else(|| UnitsSystemError::NoConversionPath {
                from: from.name.clone(),
                to: to.name.clone(),
            })?;
        self.path_cache.borrow_mut().insert(key, path);
        Ok(factor)
    }

    /// Convert a quantity from one unit to another.
    pub fn convert_units(
        &self,
        quantity: f64,
        from: &Unit,
        to: &Unit,
    ) -> Result<f64, UnitsSystemError> {
        Ok(quantity * self.get_conversion_factor(from, to)?)
    }

    /// True when a conversion path exists between the two units.
    pub fn can_convert(&self, from: &Unit, to: &Unit) -> bool {
        self.get_conversion_factor(from, to).is_ok()
    }

    /// Every unit reachable from `root` (default: gram), in breadth-first
    /// discovery order. Used to populate unit dropdowns for the current
    /// conversion set.
    pub fn get_available_units(
        &self,
        root: Option<&Unit>,
    ) -> Result<Vec<Unit>, UnitsSystemError> {
        let root = match root {
            Some(unit) => unit.clone(),
            None => self.get_unit_by_name(BASE_UNIT_NAME)?,
        };

        let Some((start, _)) = self.graph.get_key_value(&root) else {
            return Err(UnitsSystemError::UnitNotFound(root.name.clone()));
        };

        let mut visited: HashSet<&Unit> = HashSet::from([start]);
        let mut queue: VecDeque<&Unit> = VecDeque::from([start]);
        let mut reachable = Vec::new();
        while let Some(current) = queue.pop_front() {
            reachable.push(current.clone());
            if let Some(neighbors) = self.graph.get(current) {
                for neighbor in neighbors.keys() {
                    if visited.insert(neighbor) {
                        queue.push_back(neighbor);
                    }
                }
            }
        }
        Ok(reachable)
    }

    /// Merge entity-scoped conversions into this session, then rebuild.
    ///
    /// Each incoming conversion replaces any existing entity conversion for
    /// the same unordered unit pair; otherwise it is added. This is the only
    /// supported way to change the edge set after construction.
    pub fn update_entity_conversions(&mut self, new_conversions: Vec<UnitConversion>) {
        let count = new_conversions.len();
        for conversion in new_conversions {
            match self
                .entity_conversions
                .iter_mut()
                .find(|existing| existing.same_pair(&conversion))
            {
                Some(existing) => *existing = conversion,
                None => self.entity_conversions.push(conversion),
            }
        }
        tracing::debug!(updated = count, "entity conversions updated");
        self.rebuild_graph();
    }

    /// Remove the entity conversion linking the given pair, if present.
    /// Returns whether anything was removed.
    pub fn remove_entity_conversion(&mut self, a: &Unit, b: &Unit) -> bool {
        let before = self.entity_conversions.len();
        self.entity_conversions
            .retain(|conversion| !conversion.links(a, b));
        let removed = self.entity_conversions.len() != before;
        if removed {
            tracing::debug!(from = %a.name, to = %b.name, "entity conversion removed");
            self.rebuild_graph();
        }
        removed
    }

    /// Drop all cached paths. Queries after this re-run BFS. Mutations
    /// already clear the cache; this exists for tests.
    pub fn clear_path_cache(&self) {
        self.path_cache.borrow_mut().clear();
    }

    /// Look up a unit by name, falling back to display labels and aliases.
    ///
    /// The index covers the graph's node set: supplier units plus any unit
    /// a currently live conversion introduced.
    pub fn get_unit_by_name(&self, name: &str) -> Result<Unit, UnitsSystemError> {
        if self.name_index.borrow().is_none() {
            let index: HashMap<String, Unit> = self
                .graph
                .keys()
                .map(|unit| (unit.name.to_lowercase(), unit.clone()))
                .collect();
            *self.name_index.borrow_mut() = Some(index);
        }

        let lookup = name.trim().to_lowercase();
        if let Some(unit) = self
            .name_index
            .borrow()
            .as_ref()
            .and_then(|index| index.get(&lookup))
        {
            return Ok(unit.clone());
        }

        // Alias scan only runs on an index miss.
        self.graph
            .keys()
            .find(|unit| unit.matches_name(name))
            .cloned()
            .ok_or_else(|| UnitsSystemError::UnitNotFound(name.to_string()))
    }

    /// The base unit all rescaling normalizes through.
    pub fn gram(&self) -> Result<Unit, UnitsSystemError> {
        self.get_unit_by_name(BASE_UNIT_NAME)
    }

    /// Re-express `quantity` proportionally against a reference ratio.
    ///
    /// Given a reference like "2 slices weigh 80 g" and a new quantity in
    /// the reference's "from" unit, computes the proportional quantity in
    /// the "to" unit. All three quantities are normalized to grams first,
    /// so both reference units must be connected to gram in the graph.
    ///
    /// A reference "from" quantity that is zero (or converts to zero grams)
    /// is rejected rather than dividing by zero.
    pub fn rescale_quantity(
        &self,
        ref_from_unit: &Unit,
        ref_to_unit: &Unit,
        ref_from_qty: f64,
        ref_to_qty: f64,
        quantity: f64,
    ) -> Result<f64, UnitsSystemError> {
        let gram = self.gram()?;

        let ref_from_grams = self.convert_units(ref_from_qty, ref_from_unit, &gram)?;
        if ref_from_grams == 0.0 {
            return Err(UnitsSystemError::ZeroReferenceQuantity);
        }
        let ref_to_grams = self.convert_units(ref_to_qty, ref_to_unit, &gram)?;
        let quantity_grams = self.convert_units(quantity, ref_from_unit, &gram)?;

        let scaling_factor = quantity_grams / ref_from_grams;
        let result_grams = ref_to_grams * scaling_factor;
        self.convert_units(result_grams, &gram, ref_to_unit)
    }

    /// Breadth-first search for an edge path between two units. Finds a
    /// path with the fewest hops, not the one with any particular factor.
    fn find_path(&self, from: &Unit, to: &Unit) -> Option<EdgePath> {
        let (from, _) = self.graph.get_key_value(from)?;
        let (to, _) = self.graph.get_key_value(to)?;

        let mut visited: HashSet<&Unit> = HashSet::from([from]);
        let mut queue: VecDeque<&Unit> = VecDeque::from([from]);
        let mut parent: HashMap<&Unit, &Unit> = HashMap::new();

        while let Some(current) = queue.pop_front() {
            if current == to {
                let mut path = Vec::new();
                let mut node = current;
                while let Some(&prev) = parent.get(node) {
                    path.push((prev.clone(), node.clone()));
                    node = prev;
                }
                path.reverse();
                return Some(path);
            }
            if let Some(neighbors) = self.graph.get(current) {
                for neighbor in neighbors.keys() {
                    if visited.insert(neighbor) {
                        parent.insert(neighbor, current);
                        queue.push_back(neighbor);
                    }
                }
            }
        }
        None
    }

    /// Product of the edge factors along a path. `None` when an edge is
    /// missing from the current graph (a cleared-but-stale path).
    fn path_factor(&self, path: &[(Unit, Unit)]) -> Option<f64> {
        path.iter().try_fold(1.0, |factor, (a, b)| {
            Some(factor * self.graph.get(a)?.get(b)?)
        })
    }

    fn pair_key(a: &Unit, b: &Unit) -> PairKey {
        if a <= b {
            (a.clone(), b.clone())
        } else {
            (b.clone(), a.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversion::ConversionScope;
    use crate::unit::UnitCategory;

    fn unit(name: &str, category: UnitCategory) -> Unit {
        Unit::new(name, category)
    }

    fn global(from: &Unit, to: &Unit, from_qty: f64, to_qty: f64) -> UnitConversion {
        UnitConversion::defined(
            from.clone(),
            to.clone(),
            from_qty,
            to_qty,
            ConversionScope::Global,
        )
        .unwrap()
    }

    fn mass_system() -> (IngredientUnitsSystem, Unit, Unit, Unit) {
        let gram = unit("gram", UnitCategory::Mass);
        let kilogram = unit("kilogram", UnitCategory::Mass);
        let milligram = unit("milligram", UnitCategory::Mass);
        let conversions = vec![
            global(&gram, &kilogram, 1000.0, 1.0),
            global(&gram, &milligram, 1.0, 1000.0),
        ];
        let system = IngredientUnitsSystem::new(
            vec![gram.clone(), kilogram.clone(), milligram.clone()],
            conversions,
        );
        (system, gram, kilogram, milligram)
    }

    #[test]
    fn test_identity_factor_without_edges() {
        let lone = unit("cup", UnitCategory::Volume);
        let system = IngredientUnitsSystem::new(vec![lone.clone()], vec![]);
        assert_eq!(system.get_conversion_factor(&lone, &lone).unwrap(), 1.0);
    }

    #[test]
    fn test_direct_edge_factor() {
        let (system, gram, kilogram, _) = mass_system();
        assert_eq!(
            system.get_conversion_factor(&gram, &kilogram).unwrap(),
            0.001
        );
        assert_eq!(
            system.get_conversion_factor(&kilogram, &gram).unwrap(),
            1000.0
        );
    }

    #[test]
    fn test_multi_hop_factor() {
        let (system, _, kilogram, milligram) = mass_system();
        // kilogram -> gram -> milligram
        let factor = system
            .get_conversion_factor(&kilogram, &milligram)
            .unwrap();
        assert!((factor - 1_000_000.0).abs() < 1e-3);
    }

    #[test]
    fn test_cached_query_is_direction_aware() {
        let (system, gram, kilogram, _) = mass_system();
        // First query populates the cache; the reverse query must reuse the
        // cached path and invert it.
        assert_eq!(
            system.get_conversion_factor(&gram, &kilogram).unwrap(),
            0.001
        );
        assert_eq!(
            system.get_conversion_factor(&kilogram, &gram).unwrap(),
            1000.0
        );
        system.clear_path_cache();
        assert_eq!(
            system.get_conversion_factor(&kilogram, &gram).unwrap(),
            1000.0
        );
    }

    #[test]
    fn test_disconnected_units_error() {
        let gram = unit("gram", UnitCategory::Mass);
        let litre = unit("litre", UnitCategory::Volume);
        let system = IngredientUnitsSystem::new(vec![gram.clone(), litre.clone()], vec![]);

        assert!(!system.can_convert(&gram, &litre));
        assert!(!system.can_convert(&litre, &gram));
        assert_eq!(
            system.get_conversion_factor(&gram, &litre),
            Err(UnitsSystemError::NoConversionPath {
                from: "gram".to_string(),
                to: "litre".to_string(),
            })
        );
    }

    #[test]
    fn test_bridging_conversion_invalidates_no_path() {
        let gram = unit("gram", UnitCategory::Mass);
        let millilitre = unit("millilitre", UnitCategory::Volume);
        let mut system =
            IngredientUnitsSystem::new(vec![gram.clone(), millilitre.clone()], vec![]);

        // Prime the cache with a failed query.
        assert!(!system.can_convert(&gram, &millilitre));

        // Density-style bridge: 1 ml of this ingredient weighs 0.9 g.
        let entity_id = Uuid::new_v4();
        let bridge = UnitConversion::defined(
            millilitre.clone(),
            gram.clone(),
            1.0,
            0.9,
            ConversionScope::Entity(entity_id),
        )
        .unwrap();
        system.update_entity_conversions(vec![bridge]);

        let factor = system
            .get_conversion_factor(&millilitre, &gram)
            .unwrap();
        assert!((factor - 0.9).abs() < 1e-12);
    }

    #[test]
    fn test_updated_conversion_replaces_old_ratio() {
        let gram = unit("gram", UnitCategory::Mass);
        let slice = unit("slice", UnitCategory::Grouping);
        let entity_id = Uuid::new_v4();
        let mut system = IngredientUnitsSystem::new(vec![gram.clone(), slice.clone()], vec![]);

        system.update_entity_conversions(vec![UnitConversion::defined(
            gram.clone(),
            slice.clone(),
            100.0,
            1.0,
            ConversionScope::Entity(entity_id),
        )
        .unwrap()]);
        assert_eq!(system.convert_units(200.0, &gram, &slice).unwrap(), 2.0);

        // Same pair, new ratio: must replace, not add a parallel edge,
        // and must not serve the stale cached factor.
        system.update_entity_conversions(vec![UnitConversion::defined(
            slice.clone(),
            gram.clone(),
            1.0,
            50.0,
            ConversionScope::Entity(entity_id),
        )
        .unwrap()]);
        assert_eq!(system.convert_units(200.0, &gram, &slice).unwrap(), 4.0);
    }

    #[test]
    fn test_remove_entity_conversion_disconnects() {
        let gram = unit("gram", UnitCategory::Mass);
        let slice = unit("slice", UnitCategory::Grouping);
        let entity_id = Uuid::new_v4();
        let mut system = IngredientUnitsSystem::new(vec![gram.clone(), slice.clone()], vec![]);

        system.update_entity_conversions(vec![UnitConversion::defined(
            gram.clone(),
            slice.clone(),
            100.0,
            1.0,
            ConversionScope::Entity(entity_id),
        )
        .unwrap()]);
        assert!(system.can_convert(&gram, &slice));

        assert!(system.remove_entity_conversion(&slice, &gram));
        assert!(!system.can_convert(&gram, &slice));
        assert!(!system.remove_entity_conversion(&slice, &gram));
    }

    #[test]
    fn test_available_units_is_component_of_root() {
        let gram = unit("gram", UnitCategory::Mass);
        let kilogram = unit("kilogram", UnitCategory::Mass);
        let litre = unit("litre", UnitCategory::Volume);
        let millilitre = unit("millilitre", UnitCategory::Volume);
        let system = IngredientUnitsSystem::new(
            vec![
                gram.clone(),
                kilogram.clone(),
                litre.clone(),
                millilitre.clone(),
            ],
            vec![
                global(&gram, &kilogram, 1000.0, 1.0),
                global(&litre, &millilitre, 1.0, 1000.0),
            ],
        );

        let from_gram = system.get_available_units(None).unwrap();
        assert_eq!(from_gram, vec![gram.clone(), kilogram.clone()]);

        let from_litre = system.get_available_units(Some(&litre)).unwrap();
        assert_eq!(from_litre, vec![litre, millilitre]);
    }

    #[test]
    fn test_removed_conversion_forgets_introduced_unit() {
        // A unit that only exists because a custom conversion referenced it
        // must disappear with that conversion.
        let gram = unit("gram", UnitCategory::Mass);
        let stick = unit("stick", UnitCategory::Grouping);
        let mut system = IngredientUnitsSystem::new(vec![gram.clone()], vec![]);
        system.update_entity_conversions(vec![UnitConversion::defined(
            stick.clone(),
            gram.clone(),
            1.0,
            113.0,
            ConversionScope::Entity(Uuid::new_v4()),
        )
        .unwrap()]);
        assert_eq!(system.get_unit_by_name("stick").unwrap(), stick);

        assert!(system.remove_entity_conversion(&stick, &gram));
        assert_eq!(
            system.get_unit_by_name("stick"),
            Err(UnitsSystemError::UnitNotFound("stick".to_string()))
        );
        assert_eq!(
            system.get_available_units(Some(&stick)),
            Err(UnitsSystemError::UnitNotFound("stick".to_string()))
        );
    }

    #[test]
    fn test_available_units_unknown_root_errors() {
        let gram = unit("gram", UnitCategory::Mass);
        let system = IngredientUnitsSystem::new(vec![gram], vec![]);
        let stone = unit("stone", UnitCategory::Mass);
        assert_eq!(
            system.get_available_units(Some(&stone)),
            Err(UnitsSystemError::UnitNotFound("stone".to_string()))
        );
    }

    #[test]
    fn test_conversion_endpoint_units_are_known() {
        // A conversion can name a unit the supplier never listed.
        let gram = unit("gram", UnitCategory::Mass);
        let stick = unit("stick", UnitCategory::Grouping);
        let system = IngredientUnitsSystem::new(
            vec![gram.clone()],
            vec![global(&stick, &gram, 1.0, 113.0)],
        );
        assert_eq!(system.get_unit_by_name("stick").unwrap(), stick);
        assert!(system.can_convert(&stick, &gram));
    }

    #[test]
    fn test_get_unit_by_name_alias_fallback() {
        let gram = Unit::new("gram", UnitCategory::Mass).with_aliases(["g"]);
        let system = IngredientUnitsSystem::new(vec![gram.clone()], vec![]);
        assert_eq!(system.get_unit_by_name("gram").unwrap(), gram);
        assert_eq!(system.get_unit_by_name("G").unwrap(), gram);
        assert_eq!(
            system.get_unit_by_name("stone"),
            Err(UnitsSystemError::UnitNotFound("stone".to_string()))
        );
    }

    #[test]
    fn test_undefined_conversions_do_not_add_edges() {
        let gram = unit("gram", UnitCategory::Mass);
        let kilogram = unit("kilogram", UnitCategory::Mass);
        let placeholder =
            UnitConversion::new(gram.clone(), kilogram.clone(), ConversionScope::Global)
                .unwrap();
        let system = IngredientUnitsSystem::new(
            vec![gram.clone(), kilogram.clone()],
            vec![placeholder],
        );
        assert!(!system.can_convert(&gram, &kilogram));
    }

    #[test]
    fn test_rescale_zero_reference_rejected() {
        let (system, gram, kilogram, _) = mass_system();
        assert_eq!(
            system.rescale_quantity(&gram, &kilogram, 0.0, 1.0, 5.0),
            Err(UnitsSystemError::ZeroReferenceQuantity)
        );
    }
}
