//! Configuration
//!
//! `AppConfig` is read once at startup from an optional JSON file; command
//! line flags are applied on top through `ConfigStore::update`.

mod schema;
mod store;

pub use schema::{AppConfig, CameraConfig, ScreenConfig, StreamConfig, WebConfig};
pub use store::ConfigStore;
