//! Which model results get a persistent store.
//!
//! The `save` section names one point record and a list of selections. The
//! record becomes the store for every state the selections pick out.

use crate::config_tree::Setting;
use crate::diagnostics::{Diagnostics, Section};
use crate::model::NetworkModel;
use crate::records::{PointRecord, RecordTable};
use log::{debug, info};
use serde::Serialize;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StateSelection {
    /// Every computed state of the model
    All,
    /// States of elements that carry a matching measurement binding
    Measured,
    /// Demand of every zone
    ZoneDemand,
}

impl StateSelection {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "all" => Some(StateSelection::All),
            "measured" => Some(StateSelection::Measured),
            "zone_demand" => Some(StateSelection::ZoneDemand),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PersistencePolicy {
    #[serde(serialize_with = "record_name")]
    pub default_record: Option<Rc<PointRecord>>,
    pub selections: Vec<StateSelection>,
}

fn record_name<S: serde::Serializer>(
    record: &Option<Rc<PointRecord>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match record {
        Some(record) => serializer.serialize_some(&record.name),
        None => serializer.serialize_none(),
    }
}

impl PersistencePolicy {
    /// Read the policy from the `save` group, if there is one.
    pub fn from_setting(
        save: Option<&Setting<'_>>,
        records: &RecordTable,
        diagnostics: &mut Diagnostics,
    ) -> Self {
        let mut policy = PersistencePolicy::default();

        let staterecord = save.and_then(|s| s.get_opt::<String>("staterecord").ok().flatten());
        let (Some(save), Some(record_name)) = (save, staterecord) else {
            diagnostics.warning(
                Section::Save,
                "save",
                "no state record specified; model results will not be persisted",
            );
            return policy;
        };

        match records.get(&record_name) {
            Some(record) => policy.default_record = Some(Rc::clone(record)),
            None => diagnostics.unresolved(
                Section::Save,
                "staterecord",
                &record_name,
                format!("state record {} not found; model results will not be persisted", record_name),
            ),
        }

        if !save.exists("save_states") {
            return policy;
        }
        let states = match save.get_list("save_states") {
            Ok(states) => states,
            Err(e) => {
                diagnostics.entity_error(Section::Save, "save_states", format!("save_states ignored: {}", e));
                return policy;
            }
        };

        for token in states.iter() {
            let token = match token.value::<String>() {
                Ok(token) => token,
                Err(e) => {
                    diagnostics.warning(Section::Save, "save_states", e.to_string());
                    continue;
                }
            };
            match StateSelection::from_token(&token) {
                Some(selection) if !policy.selections.contains(&selection) => {
                    policy.selections.push(selection)
                }
                Some(_) => debug!("save_states lists {} more than once", token),
                None => diagnostics.warning(
                    Section::Save,
                    "save_states",
                    format!("unknown save_states option {} (known: all, measured, zone_demand)", token),
                ),
            }
        }

        policy
    }

    pub fn selects(&self, selection: StateSelection) -> bool {
        self.selections.contains(&selection)
    }

    /// Apply the selections that do not depend on element bindings.
    /// Returns the number of stores attached.
    pub fn apply_to_model(&self, model: &mut dyn NetworkModel) -> usize {
        let Some(record) = &self.default_record else {
            return 0;
        };
        let mut attached = 0;

        if self.selects(StateSelection::All) {
            model.set_storage(Rc::clone(record));
            attached += 1;
        }
        if self.selects(StateSelection::ZoneDemand) {
            for zone in model.zones_mut() {
                zone.record = Some(Rc::clone(record));
                attached += 1;
            }
        }

        info!("Attached state record {} to {} target(s)", record.name, attached);
        attached
    }

    /// Attach the store to each bound element's measured states.
    /// Returns the number of states that received it.
    pub fn apply_measured(&self, model: &mut dyn NetworkModel) -> usize {
        let Some(record) = &self.default_record else {
            return 0;
        };
        if !self.selects(StateSelection::Measured) {
            return 0;
        }

        let mut attached = 0;
        for element in model.elements_mut() {
            for state in element.measured_states() {
                element.set_state_record(state, Rc::clone(record));
                attached += 1;
            }
        }

        info!("Attached state record {} to {} measured state(s)", record.name, attached);
        attached
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config_tree::ConfigTree;
    use crate::diagnostics::DiagnosticKind;
    use crate::model::{Element, ElementKind, InpModel, ParameterKind, StateKind, Zone};
    use crate::records::RecordBackend;
    use crate::timeseries::{SeriesGraph, SeriesKind, TimeSeries};
    use std::path::PathBuf;

    fn records() -> RecordTable {
        let mut table = RecordTable::new();
        table.insert(
            "results".to_string(),
            Rc::new(PointRecord {
                name: "results".to_string(),
                backend: RecordBackend::FlatFile {
                    path: PathBuf::from("/data/results"),
                    read_only: false,
                },
            }),
        );
        table
    }

    fn policy(doc: &str) -> (PersistencePolicy, Diagnostics) {
        let tree = ConfigTree::parse(doc, "/tmp/config.yaml").unwrap();
        let save = tree.lookup("save");
        let mut diagnostics = Diagnostics::new();
        let policy = PersistencePolicy::from_setting(save.as_ref(), &records(), &mut diagnostics);
        (policy, diagnostics)
    }

    #[test]
    fn test_reads_selections() {
        let (policy, diagnostics) = policy(
            "save:\n  staterecord: results\n  save_states: [all, zone_demand, all, everything]\n",
        );
        assert_eq!(policy.default_record.as_ref().unwrap().name, "results");
        assert_eq!(policy.selections, vec![StateSelection::All, StateSelection::ZoneDemand]);
        assert_eq!(diagnostics.of_kind(DiagnosticKind::Warning).count(), 1);
    }

    #[test]
    fn test_missing_section_warns() {
        let (policy, diagnostics) = policy("other: 1\n");
        assert!(policy.default_record.is_none());
        assert!(policy.selections.is_empty());
        let warnings: Vec<_> = diagnostics.of_kind(DiagnosticKind::Warning).collect();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].message.contains("will not be persisted"));
    }

    #[test]
    fn test_unknown_record_and_non_list() {
        let (policy, diagnostics) = policy("save:\n  staterecord: nowhere\n  save_states: all\n");
        assert!(policy.default_record.is_none());
        assert!(policy.selections.is_empty());
        assert_eq!(diagnostics.referencing("nowhere").count(), 1);
        assert_eq!(diagnostics.of_kind(DiagnosticKind::EntityConstruction).count(), 1);
    }

    #[test]
    fn test_all_and_zone_demand() {
        let (policy, _) = policy("save:\n  staterecord: results\n  save_states: [all, zone_demand]\n");
        let mut model = InpModel::with_elements(vec![Element::new("J1", ElementKind::Junction)]);
        model.init_demand_zones(false);
        assert_eq!(model.zones().len(), 1);

        assert_eq!(policy.apply_to_model(&mut model), 2);
        assert_eq!(model.storage().unwrap().name, "results");
        assert!(model.zones().iter().all(|z: &Zone| z.record.is_some()));
    }

    #[test]
    fn test_measured_only_touches_measured_elements() {
        let (policy, _) = policy("save:\n  staterecord: results\n  save_states: [measured]\n");
        let mut graph = SeriesGraph::new();
        let (id, _) = graph.insert(TimeSeries::new("m", SeriesKind::Passthrough));

        let mut measured = Element::new("J1", ElementKind::Junction);
        measured.bind(ParameterKind::HeadMeasure, id).unwrap();
        let mut driven = Element::new("J2", ElementKind::Junction);
        driven.bind(ParameterKind::BoundaryFlow, id).unwrap();
        let mut model = InpModel::with_elements(vec![measured, driven]);

        assert_eq!(policy.apply_to_model(&mut model), 0);
        assert!(model.storage().is_none());

        assert_eq!(policy.apply_measured(&mut model), 1);
        let elements = model.elements();
        assert!(elements[0].state_record(StateKind::Head).is_some());
        assert!(elements[0].state_record(StateKind::Quality).is_none());
        assert!(elements[1].state_record(StateKind::Head).is_none());
    }
}
