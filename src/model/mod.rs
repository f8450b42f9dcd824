//! Network model collaborator.
//!
//! The hydraulic engine itself lives elsewhere. This module defines the
//! interface the loader drives ([`NetworkModel`]), the element and zone
//! types bindings are applied to, and a reference implementation that reads
//! element identifiers from an EPANET input file.

pub mod binder;
pub mod element;
pub mod inp;

pub use binder::{bind_elements, BindReport};
pub use element::{CapabilityMismatch, Element, ElementKind, ParameterKind, StateKind};
pub use inp::InpModel;

use crate::records::PointRecord;
use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::rc::Rc;

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("Failed to read model file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed model file '{path}' at line {line}: {message}")]
    Parse {
        path: String,
        line: usize,
        message: String,
    },
}

/// A demand zone: junctions reachable from each other without crossing a boundary
#[derive(Debug, Clone, Serialize)]
pub struct Zone {
    pub name: String,
    pub junctions: Vec<String>,
    #[serde(skip)]
    pub record: Option<Rc<PointRecord>>,
}

impl Zone {
    pub fn new(name: impl Into<String>, junctions: Vec<String>) -> Self {
        Self {
            name: name.into(),
            junctions,
            record: None,
        }
    }
}

/// What the loader needs from a network model.
pub trait NetworkModel: fmt::Debug {
    fn load_from_file(&mut self, path: &Path) -> Result<(), ModelError>;

    fn elements(&self) -> &[Element];

    fn elements_mut(&mut self) -> &mut [Element];

    /// Junction-like elements: junctions, tanks and reservoirs
    fn junctions(&self) -> Vec<&Element> {
        self.elements().iter().filter(|e| e.kind().is_node()).collect()
    }

    /// Pipe-like elements: pipes, pumps and valves
    fn pipes(&self) -> Vec<&Element> {
        self.elements().iter().filter(|e| e.kind().is_link()).collect()
    }

    fn zones(&self) -> &[Zone];

    fn zones_mut(&mut self) -> &mut [Zone];

    /// Discover demand zones. Closed links split zones when `detect_closed_links` is set.
    fn init_demand_zones(&mut self, detect_closed_links: bool);

    fn set_hydraulic_time_step(&mut self, seconds: u64);

    fn hydraulic_time_step(&self) -> Option<u64>;

    fn set_quality_time_step(&mut self, seconds: u64);

    fn quality_time_step(&self) -> Option<u64>;

    /// Default store for every computed state of the model
    fn set_storage(&mut self, record: Rc<PointRecord>);

    fn storage(&self) -> Option<&Rc<PointRecord>>;
}

/// Creates an empty model for a `model.type` discriminator.
pub trait ModelProvider {
    fn create(&self, model_type: &str) -> Option<Box<dyn NetworkModel>>;
}

/// Maps `epanet` and `synthetic_epanet` to [`InpModel`].
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultModelProvider;

impl ModelProvider for DefaultModelProvider {
    fn create(&self, model_type: &str) -> Option<Box<dyn NetworkModel>> {
        match model_type {
            "epanet" | "synthetic_epanet" => Some(Box::new(InpModel::new())),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_provider() {
        let provider = DefaultModelProvider;
        assert!(provider.create("epanet").is_some());
        assert!(provider.create("synthetic_epanet").is_some());
        assert!(provider.create("swmm").is_none());
    }
}
