//! Configuration factory.
//!
//! Drives one configuration document through every build stage, in order:
//! point records, clocks, time series, link resolution, model, simulation
//! defaults, zones, persistence policy and element bindings. Each stage runs
//! even if earlier stages skipped entries; only a document that cannot be
//! read or parsed stops the load.

use crate::clock::{build_clocks, ClockTable};
use crate::config_tree::{ConfigTree, DocumentError, Setting, SettingList};
use crate::diagnostics::{Diagnostic, Diagnostics, LoadSummary, Section};
use crate::model::{bind_elements, BindReport, DefaultModelProvider, ModelProvider, NetworkModel, Zone};
use crate::names::DuplicatePolicy;
use crate::persistence::PersistencePolicy;
use crate::records::{build_point_records, RecordTable};
use crate::registry::TypeRegistry;
use crate::timeseries::{build_time_series, LinkReport, PendingEdges, SeriesGraph};
use crate::utils::duration::seconds_from_setting;
use log::{debug, info, warn};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Document format version this build understands
pub const CONFIG_VERSION: &str = "1.0";

/// Build stages, in the order they run
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum LoadStage {
    Empty,
    DocumentParsed,
    BackendsBuilt,
    ClocksBuilt,
    NodesBuilt,
    EdgesResolved,
    ModelBuilt,
    SimulationDefaultsApplied,
    ZonesBuilt,
    PersistencePolicyApplied,
    ElementsBound,
    Ready,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LoadOptions {
    pub duplicates: DuplicatePolicy,
}

/// Everything built from one document
#[derive(Debug)]
pub struct LoadedConfig {
    pub document: PathBuf,
    pub version: Option<String>,
    pub records: RecordTable,
    pub clocks: ClockTable,
    pub series: SeriesGraph,
    pub model: Option<Box<dyn NetworkModel>>,
    pub policy: PersistencePolicy,
    pub link_report: LinkReport,
    pub bind_report: BindReport,
    pub diagnostics: Diagnostics,
    stages: Vec<LoadStage>,
}

impl LoadedConfig {
    /// The last stage reached
    pub fn stage(&self) -> LoadStage {
        self.stages.last().copied().unwrap_or(LoadStage::Empty)
    }

    pub fn stages(&self) -> &[LoadStage] {
        &self.stages
    }

    pub fn summary(&self) -> LoadSummary {
        self.diagnostics.summary()
    }

    pub fn model(&self) -> Option<&dyn NetworkModel> {
        self.model.as_deref()
    }

    /// Serializable overview of the load, for `--summary-json`
    pub fn report(&self) -> LoadReport<'_> {
        LoadReport {
            document: &self.document,
            version: self.version.as_deref(),
            stage: self.stage(),
            records: self.records.keys().map(String::as_str).collect(),
            clocks: self.clocks.keys().map(String::as_str).collect(),
            timeseries: self.series.iter().map(|(_, s)| s.name.as_str()).collect(),
            model_elements: self.model().map(|m| m.elements().len()),
            zones: self.model().map(|m| m.zones()).unwrap_or(&[]),
            links: self.link_report,
            bindings: self.bind_report,
            policy: &self.policy,
            summary: self.summary(),
            diagnostics: self.diagnostics.iter().collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LoadReport<'a> {
    pub document: &'a Path,
    pub version: Option<&'a str>,
    pub stage: LoadStage,
    pub records: Vec<&'a str>,
    pub clocks: Vec<&'a str>,
    pub timeseries: Vec<&'a str>,
    pub model_elements: Option<usize>,
    pub zones: &'a [Zone],
    pub links: LinkReport,
    pub bindings: BindReport,
    pub policy: &'a PersistencePolicy,
    pub summary: LoadSummary,
    pub diagnostics: Vec<&'a Diagnostic>,
}

pub struct ConfigFactory {
    registry: TypeRegistry,
    provider: Box<dyn ModelProvider>,
    options: LoadOptions,
}

impl ConfigFactory {
    pub fn new() -> Self {
        Self::with_provider(Box::new(DefaultModelProvider))
    }

    pub fn with_provider(provider: Box<dyn ModelProvider>) -> Self {
        Self {
            registry: TypeRegistry::new(),
            provider,
            options: LoadOptions::default(),
        }
    }

    pub fn with_options(mut self, options: LoadOptions) -> Self {
        self.options = options;
        self
    }

    /// Read, parse and build a configuration document.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<LoadedConfig, DocumentError> {
        let tree = ConfigTree::from_file(path)?;
        Ok(self.load_tree(&tree))
    }

    /// Build an already parsed document.
    pub fn load_tree(&self, tree: &ConfigTree) -> LoadedConfig {
        let mut diagnostics = Diagnostics::new();
        let mut stages = vec![LoadStage::Empty];
        let mut advance = |stage: LoadStage| {
            debug!("Load stage: {:?}", stage);
            stages.push(stage);
        };
        advance(LoadStage::DocumentParsed);
        info!("Loading configuration from {:?}", tree.path());

        let version = read_version(&tree.root(), &mut diagnostics);
        let config = tree.lookup("configuration");
        if config.is_none() {
            diagnostics.warning(
                Section::Document,
                "configuration",
                "document has no configuration group; nothing to build",
            );
        }
        let config = config.as_ref();
        let policy = self.options.duplicates;

        let records = match section_list(config, "records", Section::Records, &mut diagnostics) {
            Some(list) => build_point_records(&list, &self.registry, tree, policy, &mut diagnostics),
            None => RecordTable::new(),
        };
        advance(LoadStage::BackendsBuilt);

        let clocks = match section_list(config, "clocks", Section::Clocks, &mut diagnostics) {
            Some(list) => build_clocks(&list, policy, &mut diagnostics),
            None => ClockTable::new(),
        };
        advance(LoadStage::ClocksBuilt);

        let (mut series, pending) =
            match section_list(config, "timeseries", Section::TimeSeries, &mut diagnostics) {
                Some(list) => build_time_series(
                    &list,
                    &self.registry,
                    &clocks,
                    &records,
                    policy,
                    &mut diagnostics,
                ),
                None => (SeriesGraph::new(), PendingEdges::new()),
            };
        advance(LoadStage::NodesBuilt);

        let link_report = pending.resolve(&mut series, &mut diagnostics);
        advance(LoadStage::EdgesResolved);

        let mut model = self.build_model(config, tree, &mut diagnostics);
        advance(LoadStage::ModelBuilt);

        if let Some(simulation) = config.and_then(|c| c.lookup("simulation")) {
            match model.as_deref_mut() {
                Some(model) => apply_simulation_defaults(&simulation, model, &mut diagnostics),
                None => no_model(Section::Simulation, &mut diagnostics),
            }
        }
        advance(LoadStage::SimulationDefaultsApplied);

        if let Some(zones) = config.and_then(|c| c.lookup("zones")) {
            match model.as_deref_mut() {
                Some(model) => build_zones(&zones, model, &mut diagnostics),
                None => no_model(Section::Zones, &mut diagnostics),
            }
        }
        advance(LoadStage::ZonesBuilt);

        let save = config.and_then(|c| c.lookup("save"));
        let persistence = PersistencePolicy::from_setting(save.as_ref(), &records, &mut diagnostics);
        match model.as_deref_mut() {
            Some(model) => {
                persistence.apply_to_model(model);
            }
            None if save.is_some() => no_model(Section::Save, &mut diagnostics),
            None => {}
        }
        advance(LoadStage::PersistencePolicyApplied);

        let elements = section_list(config, "elements", Section::Elements, &mut diagnostics);
        let bind_report = match model.as_deref_mut() {
            Some(model) => {
                let report =
                    bind_elements(model, elements.as_ref(), &self.registry, &series, &mut diagnostics);
                persistence.apply_measured(model);
                report
            }
            None => {
                if elements.as_ref().is_some_and(|list| !list.is_empty()) {
                    no_model(Section::Elements, &mut diagnostics);
                }
                BindReport::default()
            }
        };
        advance(LoadStage::ElementsBound);
        advance(LoadStage::Ready);

        let summary = diagnostics.summary();
        info!(
            "Configuration loaded: {} record(s), {} clock(s), {} time series, {} binding(s); {} diagnostic(s)",
            records.len(),
            clocks.len(),
            series.len(),
            bind_report.bound,
            diagnostics.len()
        );
        if !summary.is_clean() {
            warn!(
                "Skipped {} entity(ies), {} unresolved reference(s), {} rejected link(s), {} binding(s)",
                summary.skipped_entities,
                summary.unresolved_references,
                summary.rejected_links,
                summary.skipped_bindings
            );
        }

        LoadedConfig {
            document: tree.path().to_path_buf(),
            version,
            records,
            clocks,
            series,
            model,
            policy: persistence,
            link_report,
            bind_report,
            diagnostics,
            stages,
        }
    }

    fn build_model(
        &self,
        config: Option<&Setting<'_>>,
        tree: &ConfigTree,
        diagnostics: &mut Diagnostics,
    ) -> Option<Box<dyn NetworkModel>> {
        let Some(section) = config.and_then(|c| c.lookup("model")) else {
            diagnostics.warning(Section::Model, "model", "no model specified; element bindings will be skipped");
            return None;
        };

        let (model_type, file) = match section
            .get::<String>("type")
            .and_then(|t| Ok((t, section.get::<String>("file")?)))
        {
            Ok(pair) => pair,
            Err(e) => {
                diagnostics.entity_error(Section::Model, "model", format!("could not create model: {}", e));
                return None;
            }
        };

        let Some(mut model) = self.provider.create(&model_type) else {
            diagnostics.entity_error(
                Section::Model,
                "model",
                format!("model type [{}] not supported", model_type),
            );
            return None;
        };

        let path = tree.resolve_path(&file);
        if let Err(e) = model.load_from_file(&path) {
            diagnostics.entity_error(Section::Model, "model", format!("could not load model: {}", e));
            return None;
        }
        Some(model)
    }
}

impl Default for ConfigFactory {
    fn default() -> Self {
        Self::new()
    }
}

fn read_version(root: &Setting<'_>, diagnostics: &mut Diagnostics) -> Option<String> {
    match root.get_opt::<String>("version") {
        Ok(Some(version)) => {
            info!("Configuration version {}", version);
            if version != CONFIG_VERSION {
                diagnostics.warning(
                    Section::Document,
                    "version",
                    format!("document version {} differs from supported version {}", version, CONFIG_VERSION),
                );
            }
            Some(version)
        }
        Ok(None) => {
            debug!("Configuration has no version");
            None
        }
        Err(e) => {
            diagnostics.warning(Section::Document, "version", e.to_string());
            None
        }
    }
}

/// A list section. Absent means empty; present but not a list is reported.
fn section_list<'a>(
    config: Option<&Setting<'a>>,
    key: &str,
    section: Section,
    diagnostics: &mut Diagnostics,
) -> Option<SettingList<'a>> {
    let config = config?;
    if !config.exists(key) {
        debug!("No {} section", section);
        return None;
    }
    match config.get_list(key) {
        Ok(list) => Some(list),
        Err(e) => {
            diagnostics.entity_error(section, key, format!("{} section ignored: {}", section, e));
            None
        }
    }
}

fn no_model(section: Section, diagnostics: &mut Diagnostics) {
    diagnostics.warning(section, "model", format!("no model loaded; {} section not applied", section));
}

fn apply_simulation_defaults(
    simulation: &Setting<'_>,
    model: &mut dyn NetworkModel,
    diagnostics: &mut Diagnostics,
) {
    let Some(time) = simulation.lookup("time") else {
        return;
    };
    if time.exists("hydraulic") {
        match seconds_from_setting(&time, "hydraulic") {
            Ok(seconds) => model.set_hydraulic_time_step(seconds),
            Err(e) => diagnostics.entity_error(Section::Simulation, "hydraulic", e.to_string()),
        }
    }
    if time.exists("quality") {
        match seconds_from_setting(&time, "quality") {
            Ok(seconds) => model.set_quality_time_step(seconds),
            Err(e) => diagnostics.entity_error(Section::Simulation, "quality", e.to_string()),
        }
    }
}

fn build_zones(zones: &Setting<'_>, model: &mut dyn NetworkModel, diagnostics: &mut Diagnostics) {
    let flags = zones
        .get_or("auto_detect", false)
        .and_then(|auto| Ok((auto, zones.get_or("detect_closed_links", false)?)));
    match flags {
        Ok((true, detect_closed_links)) => model.init_demand_zones(detect_closed_links),
        Ok((false, _)) => debug!("Zone auto-detection disabled"),
        Err(e) => diagnostics.entity_error(Section::Zones, "zones", e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::DiagnosticKind;

    fn load(doc: &str) -> LoadedConfig {
        let tree = ConfigTree::parse(doc, "/srv/rtx/config.yaml").unwrap();
        ConfigFactory::new().load_tree(&tree)
    }

    #[test]
    fn test_empty_document_reaches_ready() {
        let loaded = load("version: \"1.0\"\nconfiguration: {}\n");
        assert_eq!(loaded.stage(), LoadStage::Ready);
        assert_eq!(loaded.stages().len(), 12);
        assert!(loaded.stages().windows(2).all(|w| w[0] < w[1]));
        assert_eq!(loaded.version.as_deref(), Some("1.0"));
        assert!(loaded.series.is_empty());
        assert!(loaded.model.is_none());
        assert!(loaded.summary().is_clean());
    }

    #[test]
    fn test_version_mismatch_warns() {
        let loaded = load("version: \"2.3\"\nconfiguration: {}\n");
        assert!(loaded
            .diagnostics
            .of_kind(DiagnosticKind::Warning)
            .any(|d| d.subject == "version"));
    }

    #[test]
    fn test_section_that_is_not_a_list() {
        let loaded = load("configuration:\n  clocks: {name: c}\n");
        assert!(loaded.clocks.is_empty());
        assert_eq!(loaded.summary().skipped_entities, 1);
        assert_eq!(loaded.stage(), LoadStage::Ready);
    }

    #[test]
    fn test_unknown_model_type_skips_model_stages() {
        let loaded = load(
            r#"
configuration:
  model: {type: swmm, file: net.inp}
  simulation: {time: {hydraulic: 3600}}
  elements:
    - {model_id: J1, parameter: headmeasure, timeseries: x}
"#,
        );
        assert!(loaded.model.is_none());
        assert_eq!(loaded.summary().skipped_entities, 1);
        let sections: Vec<Section> = loaded
            .diagnostics
            .of_kind(DiagnosticKind::Warning)
            .filter(|d| d.subject == "model")
            .map(|d| d.section)
            .collect();
        assert!(sections.contains(&Section::Simulation));
        assert!(sections.contains(&Section::Elements));
        assert_eq!(loaded.bind_report, BindReport::default());
    }

    #[test]
    fn test_reject_duplicates_option() {
        let tree = ConfigTree::parse(
            r#"
configuration:
  clocks:
    - {name: c, period: 60}
    - {name: c, period: 120}
"#,
            "/srv/rtx/config.yaml",
        )
        .unwrap();
        let factory = ConfigFactory::new().with_options(LoadOptions {
            duplicates: DuplicatePolicy::Reject,
        });
        let loaded = factory.load_tree(&tree);
        assert_eq!(loaded.clocks["c"].period, 60);
        assert_eq!(loaded.summary().duplicate_names, 1);
    }

    #[test]
    fn test_report_serializes() {
        let loaded = load(
            r#"
version: "1.0"
configuration:
  clocks: [{name: c, period: 60}]
  timeseries:
    - {name: a, type: TimeSeries, clock: c}
    - {name: b, type: Offset, source: a, offsetValue: 1.5}
"#,
        );
        let json = serde_json::to_value(loaded.report()).unwrap();
        assert_eq!(json["stage"], "Ready");
        assert_eq!(json["timeseries"], serde_json::json!(["a", "b"]));
        assert_eq!(json["links"]["attached"], 1);
        assert_eq!(json["model_elements"], serde_json::Value::Null);
    }
}
