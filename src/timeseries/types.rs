//! Time series node definitions and the arena that owns them.
//!
//! Nodes are owned by a [`SeriesGraph`] and refer to each other through
//! [`SeriesId`] handles, so one source may feed any number of dependents.

use super::units::Units;
use crate::clock::Clock;
use crate::records::PointRecord;
use serde::Serialize;
use std::collections::BTreeMap;
use std::rc::Rc;

/// Stable handle to a node in a [`SeriesGraph`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SeriesId(usize);

/// One weighted input of an aggregator
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightedSource {
    pub series: SeriesId,
    pub weight: f64,
}

/// What a valid-range node does with out-of-range values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RangeMode {
    /// Discard the point
    Drop,
    /// Clamp the point to the nearest bound
    #[default]
    Saturate,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SeriesKind {
    Passthrough,
    Aggregator { sources: Vec<WeightedSource> },
    MovingAverage { window: u32 },
    Resampler,
    Derivative,
    Offset { offset: f64 },
    Threshold { threshold: f64 },
    CurveFunction { input_units: Units, curve: Vec<(f64, f64)> },
    Multiplier { basis: Option<SeriesId> },
    ValidRange { range: (f64, f64), mode: RangeMode },
    Constant { value: f64 },
}

impl SeriesKind {
    /// Short name used in logs and summaries
    pub fn label(&self) -> &'static str {
        match self {
            SeriesKind::Passthrough => "passthrough",
            SeriesKind::Aggregator { .. } => "aggregator",
            SeriesKind::MovingAverage { .. } => "moving_average",
            SeriesKind::Resampler => "resampler",
            SeriesKind::Derivative => "derivative",
            SeriesKind::Offset { .. } => "offset",
            SeriesKind::Threshold { .. } => "threshold",
            SeriesKind::CurveFunction { .. } => "curve_function",
            SeriesKind::Multiplier { .. } => "multiplier",
            SeriesKind::ValidRange { .. } => "valid_range",
            SeriesKind::Constant { .. } => "constant",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    pub name: String,
    pub units: Units,
    pub clock: Option<Rc<Clock>>,
    pub record: Option<Rc<PointRecord>>,
    /// Single upstream input, attached after every node has been built
    pub source: Option<SeriesId>,
    pub kind: SeriesKind,
}

impl TimeSeries {
    pub fn new(name: impl Into<String>, kind: SeriesKind) -> Self {
        Self {
            name: name.into(),
            units: Units::Dimensionless,
            clock: None,
            record: None,
            source: None,
            kind,
        }
    }

    /// Constants produce values on their own and take no upstream input.
    pub fn accepts_source(&self) -> bool {
        !matches!(self.kind, SeriesKind::Constant { .. })
    }

    /// The multiplying series of a multiplier node, if attached
    pub fn multiplier_basis(&self) -> Option<SeriesId> {
        match self.kind {
            SeriesKind::Multiplier { basis } => basis,
            _ => None,
        }
    }

    /// Inputs of an aggregator node; empty for every other kind
    pub fn aggregated_sources(&self) -> &[WeightedSource] {
        match &self.kind {
            SeriesKind::Aggregator { sources } => sources,
            _ => &[],
        }
    }
}

/// Arena of time series with a name index. Re-declaring a name points the
/// index at the new node; the superseded node is no longer reachable by name.
#[derive(Debug, Default)]
pub struct SeriesGraph {
    nodes: Vec<TimeSeries>,
    index: BTreeMap<String, SeriesId>,
}

impl SeriesGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node, returning its handle and the handle it replaced, if any.
    pub fn insert(&mut self, series: TimeSeries) -> (SeriesId, Option<SeriesId>) {
        let id = SeriesId(self.nodes.len());
        let replaced = self.index.insert(series.name.clone(), id);
        self.nodes.push(series);
        (id, replaced)
    }

    pub fn id_of(&self, name: &str) -> Option<SeriesId> {
        self.index.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn get(&self, id: SeriesId) -> Option<&TimeSeries> {
        self.nodes.get(id.0)
    }

    pub fn get_mut(&mut self, id: SeriesId) -> Option<&mut TimeSeries> {
        self.nodes.get_mut(id.0)
    }

    pub fn by_name(&self, name: &str) -> Option<&TimeSeries> {
        self.id_of(name).and_then(|id| self.get(id))
    }

    /// Name of the node behind a handle
    pub fn name_of(&self, id: SeriesId) -> Option<&str> {
        self.get(id).map(|ts| ts.name.as_str())
    }

    /// Number of named nodes
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Named nodes in name order
    pub fn iter(&self) -> impl Iterator<Item = (SeriesId, &TimeSeries)> {
        self.index.values().map(move |&id| (id, &self.nodes[id.0]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_lookup() {
        let mut graph = SeriesGraph::new();
        let (raw, replaced) = graph.insert(TimeSeries::new("raw", SeriesKind::Passthrough));
        assert!(replaced.is_none());
        let (avg, _) = graph.insert(TimeSeries::new("avg", SeriesKind::MovingAverage { window: 12 }));

        assert_eq!(graph.id_of("raw"), Some(raw));
        assert_eq!(graph.name_of(avg), Some("avg"));
        assert_eq!(graph.len(), 2);
        let names: Vec<&str> = graph.iter().map(|(_, ts)| ts.name.as_str()).collect();
        assert_eq!(names, vec!["avg", "raw"]);
    }

    #[test]
    fn test_redeclared_name_points_at_latest() {
        let mut graph = SeriesGraph::new();
        let (first, _) = graph.insert(TimeSeries::new("flow", SeriesKind::Passthrough));
        let (second, replaced) = graph.insert(TimeSeries::new("flow", SeriesKind::Constant { value: 1.0 }));

        assert_eq!(replaced, Some(first));
        assert_eq!(graph.id_of("flow"), Some(second));
        assert_eq!(graph.len(), 1);
        assert!(!graph.by_name("flow").unwrap().accepts_source());
    }

    #[test]
    fn test_kind_accessors() {
        let ts = TimeSeries::new("m", SeriesKind::Multiplier { basis: None });
        assert_eq!(ts.multiplier_basis(), None);
        assert!(ts.aggregated_sources().is_empty());
        assert_eq!(ts.kind.label(), "multiplier");
        assert_eq!(ts.units, Units::Dimensionless);
    }
}
