//! In-memory license key registry.

pub mod record;
pub mod store;
