//! Network model elements and the parameters they accept.
//!
//! Element kinds form a closed set. Each kind exposes a fixed set of
//! parameters it can be bound to; binding anything else is refused.

use crate::records::PointRecord;
use crate::timeseries::SeriesId;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    Junction,
    Tank,
    Reservoir,
    Pipe,
    Pump,
    Valve,
}

impl ElementKind {
    /// Nodes are junction-like; everything else is a link.
    pub fn is_node(self) -> bool {
        matches!(self, ElementKind::Junction | ElementKind::Tank | ElementKind::Reservoir)
    }

    pub fn is_link(self) -> bool {
        !self.is_node()
    }

    /// Parameters an element of this kind accepts
    pub fn capabilities(self) -> &'static [ParameterKind] {
        use ParameterKind::*;
        match self {
            ElementKind::Junction => &[QualitySource, QualityMeasure, BoundaryFlow, HeadMeasure, PressureMeasure],
            ElementKind::Reservoir => &[
                QualitySource,
                QualityMeasure,
                BoundaryFlow,
                HeadMeasure,
                PressureMeasure,
                BoundaryHead,
            ],
            ElementKind::Tank => &[
                QualitySource,
                QualityMeasure,
                BoundaryFlow,
                HeadMeasure,
                PressureMeasure,
                BoundaryHead,
                LevelMeasure,
            ],
            ElementKind::Pipe => &[Status, FlowMeasure],
            ElementKind::Pump => &[Status, FlowMeasure, PumpCurve, EnergyMeasure],
            ElementKind::Valve => &[Status, FlowMeasure, ValveSetting],
        }
    }

    pub fn supports(self, parameter: ParameterKind) -> bool {
        self.capabilities().contains(&parameter)
    }

    pub fn label(self) -> &'static str {
        match self {
            ElementKind::Junction => "junction",
            ElementKind::Tank => "tank",
            ElementKind::Reservoir => "reservoir",
            ElementKind::Pipe => "pipe",
            ElementKind::Pump => "pump",
            ElementKind::Valve => "valve",
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Element parameters a time series can drive or measure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterKind {
    QualitySource,
    QualityMeasure,
    BoundaryFlow,
    HeadMeasure,
    PressureMeasure,
    LevelMeasure,
    BoundaryHead,
    Status,
    FlowMeasure,
    PumpCurve,
    EnergyMeasure,
    ValveSetting,
}

impl ParameterKind {
    pub const ALL: [ParameterKind; 12] = [
        ParameterKind::QualitySource,
        ParameterKind::QualityMeasure,
        ParameterKind::BoundaryFlow,
        ParameterKind::HeadMeasure,
        ParameterKind::PressureMeasure,
        ParameterKind::LevelMeasure,
        ParameterKind::BoundaryHead,
        ParameterKind::Status,
        ParameterKind::FlowMeasure,
        ParameterKind::PumpCurve,
        ParameterKind::EnergyMeasure,
        ParameterKind::ValveSetting,
    ];

    /// The `parameter` string used in configuration documents
    pub fn discriminator(self) -> &'static str {
        match self {
            ParameterKind::QualitySource => "qualitysource",
            ParameterKind::QualityMeasure => "quality",
            ParameterKind::BoundaryFlow => "boundaryflow",
            ParameterKind::HeadMeasure => "headmeasure",
            ParameterKind::PressureMeasure => "pressuremeasure",
            ParameterKind::LevelMeasure => "levelmeasure",
            ParameterKind::BoundaryHead => "boundaryhead",
            ParameterKind::Status => "status",
            ParameterKind::FlowMeasure => "flow",
            ParameterKind::PumpCurve => "curve",
            ParameterKind::EnergyMeasure => "energy",
            ParameterKind::ValveSetting => "setting",
        }
    }

    /// The computed state a measurement parameter is compared against
    pub fn measured_state(self) -> Option<StateKind> {
        match self {
            ParameterKind::HeadMeasure | ParameterKind::LevelMeasure => Some(StateKind::Head),
            ParameterKind::QualityMeasure => Some(StateKind::Quality),
            ParameterKind::FlowMeasure => Some(StateKind::Flow),
            _ => None,
        }
    }
}

impl fmt::Display for ParameterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.discriminator())
    }
}

/// Model-computed states that can be persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StateKind {
    Head,
    Quality,
    Flow,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} {element} does not accept parameter {parameter}")]
pub struct CapabilityMismatch {
    pub element: String,
    pub kind: ElementKind,
    pub parameter: ParameterKind,
}

#[derive(Debug, Clone)]
pub struct Element {
    id: String,
    kind: ElementKind,
    parameters: BTreeMap<ParameterKind, SeriesId>,
    state_records: BTreeMap<StateKind, Rc<PointRecord>>,
}

impl Element {
    pub fn new(id: impl Into<String>, kind: ElementKind) -> Self {
        Self {
            id: id.into(),
            kind,
            parameters: BTreeMap::new(),
            state_records: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    /// Attach a time series to one of this element's parameters.
    /// A later binding of the same parameter replaces the earlier one.
    pub fn bind(&mut self, parameter: ParameterKind, series: SeriesId) -> Result<(), CapabilityMismatch> {
        if !self.kind.supports(parameter) {
            return Err(CapabilityMismatch {
                element: self.id.clone(),
                kind: self.kind,
                parameter,
            });
        }
        self.parameters.insert(parameter, series);
        Ok(())
    }

    pub fn parameter(&self, parameter: ParameterKind) -> Option<SeriesId> {
        self.parameters.get(&parameter).copied()
    }

    pub fn parameters(&self) -> impl Iterator<Item = (ParameterKind, SeriesId)> + '_ {
        self.parameters.iter().map(|(k, v)| (*k, *v))
    }

    /// States that have a bound measurement counterpart
    pub fn measured_states(&self) -> Vec<StateKind> {
        let mut states: Vec<StateKind> = self
            .parameters
            .keys()
            .filter_map(|p| p.measured_state())
            .collect();
        states.sort_unstable();
        states.dedup();
        states
    }

    pub fn state_record(&self, state: StateKind) -> Option<&Rc<PointRecord>> {
        self.state_records.get(&state)
    }

    pub fn set_state_record(&mut self, state: StateKind, record: Rc<PointRecord>) {
        self.state_records.insert(state, record);
    }
}
