//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Attach the audit trail to record writes.
//! - Keep CLI and embedding layers decoupled from storage details.

pub mod dashboard_service;
pub mod record_service;
