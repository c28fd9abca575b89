//! ComfyUI image generation

pub mod client;

pub use client::ComfyUiClient;
