//! Deferred links between time series.
//!
//! Time series may name their inputs before those inputs are declared. The
//! builder records each named relationship as a [`PendingEdge`]; once every
//! node exists, [`PendingEdges::resolve`] attaches them in a single pass.
//! An edge that cannot be resolved is reported and left off; the dependent
//! node stays usable.

use super::types::{SeriesGraph, SeriesId, SeriesKind, WeightedSource};
use crate::diagnostics::{Diagnostics, Section};
use log::{debug, info};
use serde::Serialize;

/// A named relationship recorded during construction
#[derive(Debug, Clone, PartialEq)]
pub enum PendingEdge {
    /// `dependent` reads from `source`
    Source { dependent: String, source: String },
    /// `dependent` is multiplied by `basis`
    MultiplierBasis { dependent: String, basis: String },
    /// `dependent` sums each named source scaled by its weight
    Aggregation {
        dependent: String,
        sources: Vec<(String, f64)>,
    },
}

impl PendingEdge {
    pub fn dependent(&self) -> &str {
        match self {
            PendingEdge::Source { dependent, .. }
            | PendingEdge::MultiplierBasis { dependent, .. }
            | PendingEdge::Aggregation { dependent, .. } => dependent,
        }
    }
}

/// Outcome counts of a resolution pass. An aggregation counts once per source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LinkReport {
    pub attached: usize,
    pub skipped: usize,
}

/// Append-only list of edges waiting for the full name table.
#[derive(Debug, Default, Clone)]
pub struct PendingEdges {
    edges: Vec<PendingEdge>,
}

impl PendingEdges {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, edge: PendingEdge) {
        self.edges.push(edge);
    }

    pub fn extend(&mut self, edges: impl IntoIterator<Item = PendingEdge>) {
        self.edges.extend(edges);
    }

    /// Forget the edges of a declaration that a later one with the same name replaced.
    pub fn supersede(&mut self, dependent: &str) {
        self.edges.retain(|edge| edge.dependent() != dependent);
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PendingEdge> {
        self.edges.iter()
    }

    /// Attach every pending edge to the completed graph. Consumes the list.
    pub fn resolve(self, graph: &mut SeriesGraph, diagnostics: &mut Diagnostics) -> LinkReport {
        let mut report = LinkReport::default();

        for edge in self.edges {
            match edge {
                PendingEdge::Source { dependent, source } => {
                    if attach_source(graph, &dependent, &source, diagnostics) {
                        report.attached += 1;
                    } else {
                        report.skipped += 1;
                    }
                }
                PendingEdge::MultiplierBasis { dependent, basis } => {
                    if attach_basis(graph, &dependent, &basis, diagnostics) {
                        report.attached += 1;
                    } else {
                        report.skipped += 1;
                    }
                }
                PendingEdge::Aggregation { dependent, sources } => {
                    let attached = attach_aggregation(graph, &dependent, &sources, diagnostics);
                    report.attached += attached;
                    report.skipped += sources.len() - attached;
                }
            }
        }

        info!(
            "Resolved time series links: {} attached, {} skipped",
            report.attached, report.skipped
        );
        report
    }
}

/// Look up both ends of an edge, reporting whichever is missing.
fn lookup_pair(
    graph: &SeriesGraph,
    dependent: &str,
    other: &str,
    diagnostics: &mut Diagnostics,
) -> Option<(SeriesId, SeriesId)> {
    let Some(dependent_id) = graph.id_of(dependent) else {
        diagnostics.unresolved(
            Section::Links,
            dependent,
            dependent,
            format!("cannot locate time series {}", dependent),
        );
        return None;
    };
    let other_id = lookup_input(graph, dependent, other, diagnostics)?;
    Some((dependent_id, other_id))
}

/// Look up an input named by `dependent`, refusing missing names and self-references.
fn lookup_input(
    graph: &SeriesGraph,
    dependent: &str,
    input: &str,
    diagnostics: &mut Diagnostics,
) -> Option<SeriesId> {
    if input == dependent {
        diagnostics.unresolved(
            Section::Links,
            dependent,
            input,
            format!("time series {} cannot use itself as an input", dependent),
        );
        return None;
    }
    match graph.id_of(input) {
        Some(id) => Some(id),
        None => {
            diagnostics.unresolved(
                Section::Links,
                dependent,
                input,
                format!(
                    "cannot locate source time series {} (specified by time series {})",
                    input, dependent
                ),
            );
            None
        }
    }
}

fn attach_source(
    graph: &mut SeriesGraph,
    dependent: &str,
    source: &str,
    diagnostics: &mut Diagnostics,
) -> bool {
    let Some((dependent_id, source_id)) = lookup_pair(graph, dependent, source, diagnostics) else {
        return false;
    };
    let Some(node) = graph.get_mut(dependent_id) else {
        return false;
    };
    if !node.accepts_source() {
        diagnostics.rejected_link(
            Section::Links,
            dependent,
            source,
            format!(
                "time series {} is a {} and takes no source; ignoring source {}",
                dependent,
                node.kind.label(),
                source
            ),
        );
        return false;
    }
    node.source = Some(source_id);
    debug!("Connected {} -> {}", source, dependent);
    true
}

fn attach_basis(
    graph: &mut SeriesGraph,
    dependent: &str,
    basis: &str,
    diagnostics: &mut Diagnostics,
) -> bool {
    let Some((dependent_id, basis_id)) = lookup_pair(graph, dependent, basis, diagnostics) else {
        return false;
    };
    let Some(node) = graph.get_mut(dependent_id) else {
        return false;
    };
    match &mut node.kind {
        SeriesKind::Multiplier { basis: slot } => {
            *slot = Some(basis_id);
            debug!("Connected multiplier {} * {}", dependent, basis);
            true
        }
        other => {
            let label = other.label();
            diagnostics.rejected_link(
                Section::Links,
                dependent,
                basis,
                format!("time series {} is a {}, not a multiplier; ignoring basis {}", dependent, label, basis),
            );
            false
        }
    }
}

/// Returns the number of sources attached.
fn attach_aggregation(
    graph: &mut SeriesGraph,
    dependent: &str,
    sources: &[(String, f64)],
    diagnostics: &mut Diagnostics,
) -> usize {
    let Some(dependent_id) = graph.id_of(dependent) else {
        diagnostics.unresolved(
            Section::Links,
            dependent,
            dependent,
            format!("cannot locate time series {}", dependent),
        );
        return 0;
    };

    // resolve every pair before touching the node
    let resolved: Vec<(&str, WeightedSource)> = sources
        .iter()
        .filter_map(|(name, weight)| {
            lookup_input(graph, dependent, name, diagnostics).map(|series| {
                (name.as_str(), WeightedSource { series, weight: *weight })
            })
        })
        .collect();

    let Some(node) = graph.get_mut(dependent_id) else {
        return 0;
    };
    match &mut node.kind {
        SeriesKind::Aggregator { sources: attached } => {
            let count = resolved.len();
            attached.extend(resolved.into_iter().map(|(_, source)| source));
            count
        }
        other => {
            let label = other.label();
            for (name, _) in resolved {
                diagnostics.rejected_link(
                    Section::Links,
                    dependent,
                    name,
                    format!("time series {} is a {}, not an aggregator; ignoring source {}", dependent, label, name),
                );
            }
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::DiagnosticKind;
    use crate::timeseries::types::TimeSeries;

    fn graph_with(nodes: Vec<TimeSeries>) -> SeriesGraph {
        let mut graph = SeriesGraph::new();
        for node in nodes {
            graph.insert(node);
        }
        graph
    }

    #[test]
    fn test_single_source() {
        let mut graph = graph_with(vec![
            TimeSeries::new("avg", SeriesKind::MovingAverage { window: 4 }),
            TimeSeries::new("raw", SeriesKind::Passthrough),
        ]);
        let mut edges = PendingEdges::new();
        edges.push(PendingEdge::Source {
            dependent: "avg".into(),
            source: "raw".into(),
        });
        let mut diagnostics = Diagnostics::new();
        let report = edges.resolve(&mut graph, &mut diagnostics);

        assert_eq!(report, LinkReport { attached: 1, skipped: 0 });
        assert_eq!(graph.by_name("avg").unwrap().source, graph.id_of("raw"));
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_missing_source_names_both_ends() {
        let mut graph = graph_with(vec![TimeSeries::new("avg", SeriesKind::Resampler)]);
        let mut edges = PendingEdges::new();
        edges.push(PendingEdge::Source {
            dependent: "avg".into(),
            source: "ghost".into(),
        });
        let mut diagnostics = Diagnostics::new();
        let report = edges.resolve(&mut graph, &mut diagnostics);

        assert_eq!(report.skipped, 1);
        assert!(graph.by_name("avg").unwrap().source.is_none());
        let d = diagnostics.referencing("ghost").next().unwrap();
        assert_eq!(d.subject, "avg");
        assert!(d.message.contains("avg") && d.message.contains("ghost"));
    }

    #[test]
    fn test_self_reference_rejected() {
        let mut graph = graph_with(vec![TimeSeries::new("loop", SeriesKind::Derivative)]);
        let mut edges = PendingEdges::new();
        edges.push(PendingEdge::Source {
            dependent: "loop".into(),
            source: "loop".into(),
        });
        let mut diagnostics = Diagnostics::new();
        edges.resolve(&mut graph, &mut diagnostics);

        assert!(graph.by_name("loop").unwrap().source.is_none());
        assert_eq!(diagnostics.of_kind(DiagnosticKind::UnresolvedReference).count(), 1);
    }

    #[test]
    fn test_constant_takes_no_source() {
        let mut graph = graph_with(vec![
            TimeSeries::new("k", SeriesKind::Constant { value: 2.0 }),
            TimeSeries::new("raw", SeriesKind::Passthrough),
        ]);
        let mut edges = PendingEdges::new();
        edges.push(PendingEdge::Source {
            dependent: "k".into(),
            source: "raw".into(),
        });
        let mut diagnostics = Diagnostics::new();
        let report = edges.resolve(&mut graph, &mut diagnostics);

        assert_eq!(report.skipped, 1);
        assert!(graph.by_name("k").unwrap().source.is_none());

        let rejected: Vec<_> = diagnostics.of_kind(DiagnosticKind::RejectedLink).collect();
        assert_eq!(rejected.len(), 1);
        assert_eq!(rejected[0].reference.as_deref(), Some("raw"));
        let summary = diagnostics.summary();
        assert_eq!(summary.skipped_entities, 0);
        assert_eq!(summary.rejected_links, 1);
    }

    #[test]
    fn test_basis_on_non_multiplier_is_a_rejected_link() {
        let mut graph = graph_with(vec![
            TimeSeries::new("flow", SeriesKind::Passthrough),
            TimeSeries::new("pattern", SeriesKind::Passthrough),
        ]);
        let mut edges = PendingEdges::new();
        edges.push(PendingEdge::MultiplierBasis {
            dependent: "flow".into(),
            basis: "pattern".into(),
        });
        let mut diagnostics = Diagnostics::new();
        let report = edges.resolve(&mut graph, &mut diagnostics);

        assert_eq!(report, LinkReport { attached: 0, skipped: 1 });
        assert_eq!(diagnostics.of_kind(DiagnosticKind::RejectedLink).count(), 1);
        assert_eq!(diagnostics.of_kind(DiagnosticKind::EntityConstruction).count(), 0);
        assert_eq!(diagnostics.summary().skipped_entities, 0);
    }

    #[test]
    fn test_aggregation_skips_only_missing_pairs() {
        let mut graph = graph_with(vec![
            TimeSeries::new("total", SeriesKind::Aggregator { sources: vec![] }),
            TimeSeries::new("a", SeriesKind::Passthrough),
            TimeSeries::new("c", SeriesKind::Passthrough),
        ]);
        let mut edges = PendingEdges::new();
        edges.push(PendingEdge::Aggregation {
            dependent: "total".into(),
            sources: vec![("a".into(), 1.0), ("b".into(), 2.0), ("c".into(), -1.0)],
        });
        let mut diagnostics = Diagnostics::new();
        let report = edges.resolve(&mut graph, &mut diagnostics);

        assert_eq!(report, LinkReport { attached: 2, skipped: 1 });
        let total = graph.by_name("total").unwrap();
        let attached: Vec<(&str, f64)> = total
            .aggregated_sources()
            .iter()
            .map(|s| (graph.name_of(s.series).unwrap(), s.weight))
            .collect();
        assert_eq!(attached, vec![("a", 1.0), ("c", -1.0)]);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics.referencing("b").count(), 1);
    }

    #[test]
    fn test_multiplier_basis() {
        let mut graph = graph_with(vec![
            TimeSeries::new("demand", SeriesKind::Multiplier { basis: None }),
            TimeSeries::new("pattern", SeriesKind::Passthrough),
            TimeSeries::new("orphan", SeriesKind::Multiplier { basis: None }),
        ]);
        let mut edges = PendingEdges::new();
        edges.push(PendingEdge::MultiplierBasis {
            dependent: "demand".into(),
            basis: "pattern".into(),
        });
        edges.push(PendingEdge::MultiplierBasis {
            dependent: "orphan".into(),
            basis: "nowhere".into(),
        });
        let mut diagnostics = Diagnostics::new();
        let report = edges.resolve(&mut graph, &mut diagnostics);

        assert_eq!(report, LinkReport { attached: 1, skipped: 1 });
        assert_eq!(graph.by_name("demand").unwrap().multiplier_basis(), graph.id_of("pattern"));
        assert_eq!(graph.by_name("orphan").unwrap().multiplier_basis(), None);
    }

    #[test]
    fn test_supersede_drops_old_edges() {
        let mut edges = PendingEdges::new();
        edges.push(PendingEdge::Source {
            dependent: "x".into(),
            source: "a".into(),
        });
        edges.push(PendingEdge::Source {
            dependent: "y".into(),
            source: "a".into(),
        });
        edges.supersede("x");
        assert_eq!(edges.len(), 1);
        assert_eq!(edges.iter().next().unwrap().dependent(), "y");
    }
}
