pub mod cli;
pub mod clock;
pub mod config;
pub mod disposition;
pub mod error;
pub mod model;
pub mod normalize;
pub mod queue;
pub mod reconcile;
pub mod schedule;
pub mod source;
pub mod stats;
pub mod store;

pub use config::Config;
pub use error::{DialerError, Result};
pub use source::{LeadSource, SourceRegistry};
pub use store::LeadStore;
