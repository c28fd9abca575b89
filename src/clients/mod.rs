//! HTTP clients for the external services

pub mod comfyui;
pub mod ollama;
pub mod provider;

pub use comfyui::ComfyUiClient;
pub use ollama::OllamaClient;
pub use provider::{ImageGenerator, LanguageModel};
