//! Image generation jobs

pub mod pipeline;
pub mod workflow;

pub use pipeline::{GenerationOutcome, GenerationPipeline, GenerationRequest, PipelineSettings};
pub use workflow::{output_filename, WorkflowNodes, WorkflowTemplate};
