//! Point queries from the command line.
//!
//! Loads a store snapshot, builds the reader for a dataset and prints the
//! requested variables at one location.

pub mod config;
pub mod output;
pub mod query;

pub use config::load_config;
pub use output::{render, OutputFormat};
pub use query::{run_query, Dataset, QueryRequest, QueryResult};
