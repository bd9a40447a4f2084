pub mod backend;
pub mod config;
pub mod db;
pub mod error;
pub mod graph;
pub mod model;
pub mod risk;

#[cfg(test)]
pub(crate) mod test_support;

pub use backend::{BackendKind, BackendSelector, GraphBackend, PathSearch};
pub use config::Config;
pub use error::{Result, VendorGraphError};
pub use risk::RiskAggregator;
