//! # rtxconfig - Configuration loader for real-time water network monitoring
//!
//! This library builds, from a declarative YAML document, the live graph of
//! components a real-time monitoring application runs on: persistence
//! backends ("point records"), periodic clocks, a pipeline of time-series
//! transformation nodes, and the bindings that attach those nodes to
//! elements of a water distribution network model.
//!
//! ## Overview
//!
//! Loading is forgiving. A malformed entry, an unknown type or a name that
//! never resolves is recorded as a diagnostic and skipped; the rest of the
//! document still loads. Only a document that cannot be read or parsed is
//! an error.
//!
//! ## Key Features
//!
//! - **Type Registry**: Discriminator strings map to constructors for point
//!   records, time series kinds and element parameters
//! - **Forward References**: Time series may name inputs declared later in
//!   the document; links are resolved once every node exists
//! - **Weighted Aggregation**: Multi-source nodes attach each resolvable
//!   source independently
//! - **Model Binding**: Element entries bind time series to parameters,
//!   checked against each element kind's capabilities
//! - **Persistence Policy**: One state record applied to all results,
//!   measured elements only, or zone demands
//! - **Diagnostics**: Every skipped entity, edge and binding is reported and
//!   counted for strict-mode callers
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - `config_tree`: YAML document reader with typed, path-aware lookups
//! - `registry`: Discriminator tables for the three namespaces
//! - `records`: Point record backends
//! - `clock`: Periodic clocks
//! - `timeseries`: Node types, construction and deferred link resolution
//! - `model`: Network model interface, elements, `.inp` reader and binder
//! - `persistence`: Selection of which results get a store
//! - `names`: Duplicate-name policy shared by the named sections
//! - `diagnostics`: Recoverable-problem channel and summary counts
//! - `factory`: The stage machine driving a full load
//! - `utils`: Duration parsing
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use rtxconfig::factory::ConfigFactory;
//!
//! let loaded = ConfigFactory::new().load("network.yaml")?;
//!
//! for (_, series) in loaded.series.iter() {
//!     println!("{} ({})", series.name, series.kind.label());
//! }
//! if !loaded.summary().is_clean() {
//!     eprintln!("{} diagnostic(s)", loaded.diagnostics.len());
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Configuration Format
//!
//! ```yaml
//! version: "1.0"
//! configuration:
//!   records:
//!     - {name: hist, type: CSV, path: ./data}
//!   clocks:
//!     - {name: "5min", period: 300}
//!   timeseries:
//!     - {name: raw, type: TimeSeries, pointRecord: hist, clock: "5min"}
//!     - {name: avg, type: MovingAverage, source: raw, window: 12}
//!   model: {type: epanet, file: network.inp}
//!   simulation: {time: {hydraulic: 3600, quality: 300}}
//!   zones: {auto_detect: true, detect_closed_links: true}
//!   save: {staterecord: hist, save_states: [measured]}
//!   elements:
//!     - {model_id: J1, parameter: headmeasure, timeseries: avg}
//! ```
//!
//! ## Error Handling
//!
//! Library errors are `thiserror` enums. The `rtxconfig` binary reports them
//! through `color_eyre`.

pub mod clock;
pub mod config_tree;
pub mod diagnostics;
pub mod factory;
pub mod model;
pub mod names;
pub mod persistence;
pub mod records;
pub mod registry;
pub mod timeseries;
pub mod utils;

pub use config_tree::{ConfigTree, DocumentError};
pub use diagnostics::{Diagnostic, DiagnosticKind, Diagnostics, LoadSummary};
pub use factory::{ConfigFactory, LoadOptions, LoadedConfig, CONFIG_VERSION};
