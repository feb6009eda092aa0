pub mod convert;
pub mod engine;
pub mod flux;
pub mod interpolate;
pub mod pipeline;
pub mod profile;
pub mod slice;
pub mod tagging;

pub use crate::domain::model::{SourceData, TransformResult};
pub use crate::domain::ports::{ConfigProvider, MeshToolkit, Pipeline, Storage};
pub use crate::utils::error::Result;
pub use engine::{PipelineEngine, RunSummary};
pub use pipeline::MassFluxPipeline;
