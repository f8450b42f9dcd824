//! Construction of time series nodes from the `timeseries` section.
//!
//! Every constructor applies the generic properties first (name, units, clock,
//! point record, source) and then its own fields. Named inputs are never
//! resolved here; they are recorded as pending edges and attached later.

use super::links::{PendingEdge, PendingEdges};
use super::types::{RangeMode, SeriesGraph, SeriesKind, TimeSeries};
use super::units::Units;
use crate::clock::ClockTable;
use crate::config_tree::{Setting, SettingList};
use crate::diagnostics::{Diagnostics, Section};
use crate::names::DuplicatePolicy;
use crate::records::RecordTable;
use crate::registry::{BuildError, TypeRegistry};
use log::info;
use std::rc::Rc;

/// What a series constructor may consult: the tables built by earlier
/// sections, the diagnostic channel, and a scratch list of deferred edges.
pub struct SeriesContext<'a> {
    pub clocks: &'a ClockTable,
    pub records: &'a RecordTable,
    pub diagnostics: &'a mut Diagnostics,
    pending: Vec<PendingEdge>,
}

impl<'a> SeriesContext<'a> {
    pub fn new(clocks: &'a ClockTable, records: &'a RecordTable, diagnostics: &'a mut Diagnostics) -> Self {
        Self {
            clocks,
            records,
            diagnostics,
            pending: Vec::new(),
        }
    }

    /// Record an edge to be resolved once every node exists.
    pub fn defer(&mut self, edge: PendingEdge) {
        self.pending.push(edge);
    }

    /// Edges recorded by the node under construction
    pub fn into_pending(self) -> Vec<PendingEdge> {
        self.pending
    }
}

fn with_generic_properties(
    setting: &Setting<'_>,
    kind: SeriesKind,
    ctx: &mut SeriesContext<'_>,
) -> Result<TimeSeries, BuildError> {
    let name: String = setting.get("name")?;
    let mut series = TimeSeries::new(name, kind);

    if let Some(unit_name) = setting.get_opt::<String>("units")? {
        match Units::from_name(&unit_name) {
            Some(units) => series.units = units,
            None => ctx.diagnostics.warning(
                Section::TimeSeries,
                &series.name,
                format!("unknown units '{}' for time series {}; using dimensionless", unit_name, series.name),
            ),
        }
    }

    if let Some(clock_name) = setting.get_opt::<String>("clock")? {
        match ctx.clocks.get(&clock_name) {
            Some(clock) => series.clock = Some(Rc::clone(clock)),
            None => ctx.diagnostics.unresolved(
                Section::TimeSeries,
                &series.name,
                &clock_name,
                format!("could not find clock {} for time series {}", clock_name, series.name),
            ),
        }
    }

    // the series is stored externally
    if let Some(record_name) = setting.get_opt::<String>("pointRecord")? {
        match ctx.records.get(&record_name) {
            Some(record) => series.record = Some(Rc::clone(record)),
            None => ctx.diagnostics.unresolved(
                Section::TimeSeries,
                &series.name,
                &record_name,
                format!("could not find point record {} for time series {}", record_name, series.name),
            ),
        }
    }

    // forward declarations are allowed; resolved after all series exist
    if let Some(source) = setting.get_opt::<String>("source")? {
        ctx.defer(PendingEdge::Source {
            dependent: series.name.clone(),
            source,
        });
    }

    Ok(series)
}

pub(crate) fn create_time_series(
    setting: &Setting<'_>,
    ctx: &mut SeriesContext<'_>,
) -> Result<TimeSeries, BuildError> {
    with_generic_properties(setting, SeriesKind::Passthrough, ctx)
}

pub(crate) fn create_aggregator(
    setting: &Setting<'_>,
    ctx: &mut SeriesContext<'_>,
) -> Result<TimeSeries, BuildError> {
    let series = with_generic_properties(setting, SeriesKind::Aggregator { sources: Vec::new() }, ctx)?;

    let mut sources = Vec::new();
    for entry in setting.get_list("sources")?.iter() {
        let name: String = entry.get("source")?;
        let weight = entry.get_or("multiplier", 1.0)?;
        sources.push((name, weight));
    }

    ctx.defer(PendingEdge::Aggregation {
        dependent: series.name.clone(),
        sources,
    });
    Ok(series)
}

pub(crate) fn create_moving_average(
    setting: &Setting<'_>,
    ctx: &mut SeriesContext<'_>,
) -> Result<TimeSeries, BuildError> {
    let mut series = with_generic_properties(setting, SeriesKind::MovingAverage { window: 0 }, ctx)?;
    let window: u32 = setting.get("window")?;
    if window == 0 {
        return Err(BuildError::Invalid(format!(
            "moving average {} needs a window of at least one point",
            series.name
        )));
    }
    series.kind = SeriesKind::MovingAverage { window };
    Ok(series)
}

pub(crate) fn create_resampler(
    setting: &Setting<'_>,
    ctx: &mut SeriesContext<'_>,
) -> Result<TimeSeries, BuildError> {
    with_generic_properties(setting, SeriesKind::Resampler, ctx)
}

pub(crate) fn create_derivative(
    setting: &Setting<'_>,
    ctx: &mut SeriesContext<'_>,
) -> Result<TimeSeries, BuildError> {
    with_generic_properties(setting, SeriesKind::Derivative, ctx)
}

pub(crate) fn create_offset(
    setting: &Setting<'_>,
    ctx: &mut SeriesContext<'_>,
) -> Result<TimeSeries, BuildError> {
    let mut series = with_generic_properties(setting, SeriesKind::Offset { offset: 0.0 }, ctx)?;
    series.kind = SeriesKind::Offset {
        offset: setting.get_or("offsetValue", 0.0)?,
    };
    Ok(series)
}

pub(crate) fn create_threshold(
    setting: &Setting<'_>,
    ctx: &mut SeriesContext<'_>,
) -> Result<TimeSeries, BuildError> {
    let mut series = with_generic_properties(setting, SeriesKind::Threshold { threshold: 0.0 }, ctx)?;
    series.kind = SeriesKind::Threshold {
        threshold: setting.get_or("thresholdValue", 0.0)?,
    };
    Ok(series)
}

pub(crate) fn create_curve_function(
    setting: &Setting<'_>,
    ctx: &mut SeriesContext<'_>,
) -> Result<TimeSeries, BuildError> {
    let mut series = with_generic_properties(
        setting,
        SeriesKind::CurveFunction {
            input_units: Units::Dimensionless,
            curve: Vec::new(),
        },
        ctx,
    )?;

    let input_units = match setting.get_opt::<String>("inputUnits")? {
        Some(unit_name) => Units::from_name(&unit_name).unwrap_or_else(|| {
            ctx.diagnostics.warning(
                Section::TimeSeries,
                &series.name,
                format!("unknown input units '{}' for curve {}; using dimensionless", unit_name, series.name),
            );
            Units::Dimensionless
        }),
        None => Units::Dimensionless,
    };

    let mut curve = Vec::new();
    for coordinate in setting.get_list("function")?.iter() {
        match (coordinate.get_opt::<f64>("x")?, coordinate.get_opt::<f64>("y")?) {
            (Some(x), Some(y)) => curve.push((x, y)),
            _ => ctx.diagnostics.warning(
                Section::TimeSeries,
                &series.name,
                format!("skipping incomplete curve coordinate at {}", coordinate.path()),
            ),
        }
    }

    series.kind = SeriesKind::CurveFunction { input_units, curve };
    Ok(series)
}

pub(crate) fn create_constant(
    setting: &Setting<'_>,
    ctx: &mut SeriesContext<'_>,
) -> Result<TimeSeries, BuildError> {
    let mut series = with_generic_properties(setting, SeriesKind::Constant { value: 0.0 }, ctx)?;
    series.kind = SeriesKind::Constant {
        value: setting.get_or("value", 0.0)?,
    };
    Ok(series)
}

pub(crate) fn create_valid_range(
    setting: &Setting<'_>,
    ctx: &mut SeriesContext<'_>,
) -> Result<TimeSeries, BuildError> {
    let mut series = with_generic_properties(
        setting,
        SeriesKind::ValidRange {
            range: (f64::NEG_INFINITY, f64::INFINITY),
            mode: RangeMode::default(),
        },
        ctx,
    )?;

    let min = setting.get_or("range_min", f64::NEG_INFINITY)?;
    let max = setting.get_or("range_max", f64::INFINITY)?;

    let mut mode = RangeMode::default();
    if let Some(mode_name) = setting.get_opt::<String>("mode")? {
        match mode_name.as_str() {
            "drop" => mode = RangeMode::Drop,
            "saturate" => mode = RangeMode::Saturate,
            _ => ctx.diagnostics.warning(
                Section::TimeSeries,
                &series.name,
                format!("could not resolve mode: {} for time series {} -- check config", mode_name, series.name),
            ),
        }
    }

    series.kind = SeriesKind::ValidRange { range: (min, max), mode };
    Ok(series)
}

pub(crate) fn create_multiplier(
    setting: &Setting<'_>,
    ctx: &mut SeriesContext<'_>,
) -> Result<TimeSeries, BuildError> {
    let series = with_generic_properties(setting, SeriesKind::Multiplier { basis: None }, ctx)?;
    if let Some(basis) = setting.get_opt::<String>("multiplier")? {
        ctx.defer(PendingEdge::MultiplierBasis {
            dependent: series.name.clone(),
            basis,
        });
    }
    Ok(series)
}

/// Build every node in the `timeseries` list.
///
/// Returns the graph with no links attached yet, plus the edges to attach.
/// Edges recorded by an entry that fails, or that loses a duplicate-name
/// contest, never reach the returned list.
pub fn build_time_series(
    list: &SettingList<'_>,
    registry: &TypeRegistry,
    clocks: &ClockTable,
    records: &RecordTable,
    policy: DuplicatePolicy,
    diagnostics: &mut Diagnostics,
) -> (SeriesGraph, PendingEdges) {
    let mut graph = SeriesGraph::new();
    let mut pending = PendingEdges::new();

    for (index, entry) in list.iter().enumerate() {
        let label = entry
            .get::<String>("name")
            .unwrap_or_else(|_| format!("TimeSeries {}", index));

        let mut ctx = SeriesContext::new(clocks, records, diagnostics);
        let built = entry
            .get::<String>("type")
            .map_err(BuildError::from)
            .and_then(|discriminator| registry.series_constructor(&discriminator))
            .and_then(|construct| construct(&entry, &mut ctx));
        let deferred = ctx.into_pending();

        match built {
            Ok(series) => {
                if policy.admit(graph.contains(&series.name), Section::TimeSeries, &series.name, diagnostics) {
                    pending.supersede(&series.name);
                    pending.extend(deferred);
                    graph.insert(series);
                }
            }
            Err(e) => diagnostics.entity_error(
                Section::TimeSeries,
                &label,
                format!("could not create time series {}: {} -- check config", label, e),
            ),
        }
    }

    info!(
        "Built {} time series with {} pending link(s)",
        graph.len(),
        pending.len()
    );
    (graph, pending)
}
