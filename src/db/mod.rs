//! Database module

pub mod schema;
pub mod connection;
pub mod repositories;

pub use connection::Database;
pub use repositories::asset::{
    Asset, AssetError, AssetRepository, AssetStatus, AssetType, PLACEHOLDER_SOURCE,
};
pub use repositories::conversation::{ConversationEntry, ConversationRepository};
