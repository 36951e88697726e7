//! Core domain logic for SalesLog, a relational record store for sales
//! tracking: users, customers, contacts, deals, interaction logs,
//! attachments, tags and an audit trail.
//! This crate is the single source of truth for business invariants.

pub mod config;
pub mod db;
pub mod export;
pub mod logging;
pub mod model;
pub mod repo;
pub mod search;
pub mod service;

pub use config::{AppConfig, ConfigError};
pub use db::{open_db, open_db_in_memory, DbError};
pub use export::{export_interactions_csv, ExportError};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::validation::ValidationError;
pub use model::{Entity, EntityKind, RecordId};
pub use repo::{
    ConstraintKind, ConstraintViolation, MutableRecordRepository, RecordRepository, RepoError,
    RepoResult,
};
pub use search::{search_all, SearchQuery, SearchResults};
pub use service::dashboard_service::{dashboard_stats, DashboardStats, PipelineTotal};
pub use service::record_service::{AuditContext, RecordService};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
