pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use adapters::{vtu::VtuWriteOptions, LocalStorage, VtkToolkit};
#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::TomlConfig;

pub use core::{MassFluxPipeline, PipelineEngine, RunSummary};
pub use utils::error::{BcError, Result};
