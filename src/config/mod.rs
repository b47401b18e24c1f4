//! Configuration module for audit-trail
//!
//! - Base directory resolution (environment override, platform default)
//! - Settings persistence

pub mod paths;
pub mod settings;

pub use paths::AuditPaths;
pub use settings::Settings;
