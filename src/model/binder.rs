//! Attaches configured time series to live model elements.

use super::{Element, NetworkModel};
use crate::config_tree::{Setting, SettingList};
use crate::diagnostics::{Diagnostics, Section};
use crate::registry::{BuildError, TypeRegistry};
use crate::timeseries::SeriesGraph;
use log::info;
use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BindReport {
    pub bound: usize,
    pub skipped: usize,
}

/// Bind every `elements` entry to a model element with the same id.
///
/// A node and a link may share an id; the entry goes to whichever of them
/// accepts the parameter. Entries that cannot be applied are skipped and
/// reported; the rest of the list still binds.
pub fn bind_elements(
    model: &mut dyn NetworkModel,
    entries: Option<&SettingList<'_>>,
    registry: &TypeRegistry,
    graph: &SeriesGraph,
    diagnostics: &mut Diagnostics,
) -> BindReport {
    let mut report = BindReport::default();

    for (index, entry) in entries.into_iter().flat_map(|list| list.iter()).enumerate() {
        if bind_entry(model, index, &entry, registry, graph, diagnostics) {
            report.bound += 1;
        } else {
            report.skipped += 1;
        }
    }

    info!("Bound {} element parameter(s), skipped {}", report.bound, report.skipped);
    report
}

/// Apply one entry. Returns true if a parameter was bound.
fn bind_entry(
    model: &mut dyn NetworkModel,
    index: usize,
    entry: &Setting<'_>,
    registry: &TypeRegistry,
    graph: &SeriesGraph,
    diagnostics: &mut Diagnostics,
) -> bool {
    let model_id = match entry.get::<String>("model_id") {
        Ok(id) => id,
        Err(e) => {
            diagnostics.entity_error(
                Section::Elements,
                &format!("Element {}", index),
                format!("element entry {} has no usable model_id: {}", index, e),
            );
            return false;
        }
    };
    let subject = model_id.as_str();

    let mut candidates: Vec<&mut Element> = model
        .elements_mut()
        .iter_mut()
        .filter(|e| e.id() == subject)
        .collect();
    if candidates.is_empty() {
        diagnostics.unresolved(
            Section::Elements,
            subject,
            subject,
            format!("no model element with id {}", subject),
        );
        return false;
    }

    let kind = match entry
        .get::<String>("parameter")
        .map_err(BuildError::from)
        .and_then(|parameter| registry.parameter_kind(&parameter))
    {
        Ok(kind) => kind,
        Err(e) => {
            diagnostics.entity_error(Section::Elements, subject, format!("element {}: {}", subject, e));
            return false;
        }
    };
    let series_name = match entry.get::<String>("timeseries") {
        Ok(name) => name,
        Err(e) => {
            diagnostics.entity_error(Section::Elements, subject, format!("element {}: {}", subject, e));
            return false;
        }
    };
    let Some(series) = graph.id_of(&series_name) else {
        diagnostics.unresolved(
            Section::Elements,
            subject,
            &series_name,
            format!(
                "cannot locate time series {} (bound to {} of element {})",
                series_name, kind, subject
            ),
        );
        return false;
    };

    // only report a mismatch when no element with this id accepts the parameter
    let mut mismatch = None;
    for element in candidates.iter_mut() {
        match element.bind(kind, series) {
            Ok(()) => return true,
            Err(e) => {
                mismatch.get_or_insert(e);
            }
        }
    }
    if let Some(mismatch) = mismatch {
        diagnostics.capability_mismatch(subject, mismatch.to_string());
    }
    false
}
