//! Prefecture collections exposed through `jsonapi`.
//!
//! The same 47 prefectures are served from memory and from the database,
//! alongside a read-only user collection whose records reference them.

pub mod config;
pub mod dataset;
pub mod forms;
pub mod infra;
pub mod module;
pub mod resources;

pub use config::PrefecturesConfig;
pub use infra::storage::migrations::Migrator;
pub use module::Prefectures;
