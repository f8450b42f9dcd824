//! Time series nodes: types, construction, and deferred linking.

pub mod builder;
pub mod links;
pub mod types;
pub mod units;

pub use builder::{build_time_series, SeriesContext};
pub use links::{LinkReport, PendingEdge, PendingEdges};
pub use types::{RangeMode, SeriesGraph, SeriesId, SeriesKind, TimeSeries, WeightedSource};
pub use units::Units;
