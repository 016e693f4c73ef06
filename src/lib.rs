pub mod accuracy;
pub mod artifact;
pub mod config;
pub mod error;
pub mod ledger;
pub mod locator;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod reconcile;

pub use error::{Error, PipelineError, Stage};
pub use pipeline::{Pipeline, RunSummary};
