//! GB Studio Hub - asset pipeline orchestrating Ollama and ComfyUI for GB Studio projects

pub mod agent;
pub mod cli;
pub mod clients;
pub mod config;
pub mod core;
pub mod db;
pub mod events;
pub mod generation;
pub mod integration;
pub mod server;
