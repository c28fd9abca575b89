//! Ollama text generation

pub mod client;

pub use client::OllamaClient;
