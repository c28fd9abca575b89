//! Shared application wiring

pub mod state;

pub use state::{AppState, StaticPaths};
