//! Hub configuration module
//! Handles loading, saving, and overriding the config file

pub mod config;

pub use config::{
    expand_home, ComfyUiConfig, Config, GenerationConfig, OllamaConfig, ProjectConfig,
    ServerConfig, CONFIG_ENV,
};
