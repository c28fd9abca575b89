//! Live status updates for connected clients

pub mod broadcaster;

pub use broadcaster::{Broadcaster, StatusEvent, Subscription, TaskStatus};
