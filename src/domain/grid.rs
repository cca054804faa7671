use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use super::{Feeder, FeederId};
use crate::error::{AdvisorError, AdvisorResult};

/// Base relation as written in configuration: source feeder -> transfer candidates.
/// It may be asymmetric and use any casing.
pub type RelationTable = BTreeMap<String, Vec<String>>;

/// Adjacency of feeders that can take load from each other, plus their ratings.
///
/// Graphs are immutable once built. [`FeederGraph::build`] normalizes the base
/// relation and closes it under symmetry; [`FeederGraph::symmetrized`] returns a
/// new graph and is a no-op on a graph that is already symmetric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeederGraph {
    partners: BTreeMap<FeederId, BTreeSet<FeederId>>,
    capacities: BTreeMap<FeederId, f64>,
    default_capacity_a: f64,
}

impl FeederGraph {
    /// Build the symmetric transfer graph from a base relation.
    pub fn build(
        base: &RelationTable,
        default_capacity_a: f64,
        capacity_overrides: &BTreeMap<String, f64>,
    ) -> AdvisorResult<Self> {
        let directed = Self::from_directed(base, default_capacity_a, capacity_overrides)?;
        let graph = directed.symmetrized();
        debug!(
            feeders = graph.partners.len(),
            edges = graph.edge_count(),
            "feeder graph built"
        );
        Ok(graph)
    }

    /// Normalize the base relation without closing it under symmetry.
    pub fn from_directed(
        base: &RelationTable,
        default_capacity_a: f64,
        capacity_overrides: &BTreeMap<String, f64>,
    ) -> AdvisorResult<Self> {
        validate_capacity("default", default_capacity_a)?;

        let mut capacities = BTreeMap::new();
        for (name, capacity) in capacity_overrides {
            let id = FeederId::new(name);
            if id.is_empty() {
                return Err(AdvisorError::invalid("capacity override for an empty feeder name"));
            }
            validate_capacity(id.as_str(), *capacity)?;
            capacities.insert(id, *capacity);
        }

        let mut partners: BTreeMap<FeederId, BTreeSet<FeederId>> = BTreeMap::new();
        for (source, targets) in base {
            let source = FeederId::new(source);
            if source.is_empty() {
                return Err(AdvisorError::invalid("feeder relation with an empty source name"));
            }
            let entry = partners.entry(source.clone()).or_default();
            for target in targets {
                let target = FeederId::new(target);
                if target.is_empty() || target == source {
                    continue;
                }
                entry.insert(target);
            }
        }

        Ok(Self {
            partners,
            capacities,
            default_capacity_a,
        })
    }

    /// Return a copy where every `A -> B` relation also has `B -> A`.
    pub fn symmetrized(&self) -> Self {
        let mut partners = self.partners.clone();
        for (source, targets) in &self.partners {
            for target in targets {
                partners
                    .entry(target.clone())
                    .or_default()
                    .insert(source.clone());
            }
        }
        Self {
            partners,
            capacities: self.capacities.clone(),
            default_capacity_a: self.default_capacity_a,
        }
    }

    /// Transfer partners of a feeder. Unknown feeders have none.
    pub fn partners(&self, id: &FeederId) -> BTreeSet<FeederId> {
        self.partners.get(id).cloned().unwrap_or_default()
    }

    /// Rated capacity (A), falling back to the default rating.
    pub fn capacity(&self, id: &FeederId) -> f64 {
        self.capacities
            .get(id)
            .copied()
            .unwrap_or(self.default_capacity_a)
    }

    pub fn feeder(&self, id: &FeederId) -> Feeder {
        Feeder::new(id.clone(), self.capacity(id))
    }

    pub fn contains(&self, id: &FeederId) -> bool {
        self.partners.contains_key(id)
    }

    pub fn feeders(&self) -> impl Iterator<Item = &FeederId> {
        self.partners.keys()
    }

    pub fn default_capacity_a(&self) -> f64 {
        self.default_capacity_a
    }

    pub fn is_symmetric(&self) -> bool {
        self.partners.iter().all(|(source, targets)| {
            targets.iter().all(|target| {
                self.partners
                    .get(target)
                    .is_some_and(|back| back.contains(source))
            })
        })
    }

    /// Number of directed partner entries.
    pub fn edge_count(&self) -> usize {
        self.partners.values().map(BTreeSet::len).sum()
    }
}

fn validate_capacity(name: &str, capacity_a: f64) -> AdvisorResult<()> {
    if !capacity_a.is_finite() || capacity_a <= 0.0 {
        return Err(AdvisorError::invalid(format!(
            "rated capacity for '{name}' must be a positive number of amperes, got {capacity_a}"
        )));
    }
    Ok(())
}
