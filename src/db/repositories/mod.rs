//! Table repositories

pub mod asset;
pub mod conversation;
