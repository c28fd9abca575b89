//! Moving approved assets into the GB Studio project

pub mod approval;
pub mod descriptor;
pub mod project;

pub use approval::{ApprovalError, IntegrationReport, Integrator, ProjectSettings};
pub use descriptor::{add_asset_to_project, find_project_file, DescriptorError, DescriptorOutcome};
pub use project::{compile_project, launch_emulator, move_asset, IntegrationError};
