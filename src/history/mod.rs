pub mod cache;
pub mod config;
pub mod error;
pub mod fetch;
pub mod log;
pub mod months;
pub mod opening;
pub mod pipeline;
pub mod prefixes;
pub mod reader;
pub mod timecontrol;
pub mod types;
pub mod visitor;
pub mod writer;

pub use config::RunConfig;
pub use error::PipelineError;
pub use pipeline::{Pipeline, RunSummary};
pub use types::{Color, GameRecord, Platform, TimeControlCategory};
