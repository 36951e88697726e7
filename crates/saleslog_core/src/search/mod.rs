//! Cross-entity keyword search.
//!
//! # Responsibility
//! - Run one case-insensitive substring query across customers, deals and
//!   interaction logs.
//! - Keep result shaping inside core.
//!
//! # Invariants
//! - Blank query text returns empty groups without touching the database.
//! - Each group is capped at `limit` independently.

use crate::model::customer::Customer;
use crate::model::deal::Deal;
use crate::model::interaction::InteractionLog;
use crate::repo::customer_repo::{CustomerListQuery, SqliteCustomerRepository};
use crate::repo::deal_repo::{DealListQuery, SqliteDealRepository};
use crate::repo::interaction_repo::{InteractionListQuery, SqliteInteractionRepository};
use crate::repo::{RecordRepository, RepoResult};
use log::debug;
use rusqlite::Connection;
use serde::Serialize;

pub const DEFAULT_SEARCH_LIMIT: u32 = 10;

/// Search options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub text: String,
    /// Maximum hits per entity group.
    pub limit: u32,
}

impl SearchQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            limit: DEFAULT_SEARCH_LIMIT,
        }
    }
}

/// Matches grouped by entity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResults {
    pub customers: Vec<Customer>,
    pub deals: Vec<Deal>,
    pub interactions: Vec<InteractionLog>,
}

impl SearchResults {
    pub fn is_empty(&self) -> bool {
        self.customers.is_empty() && self.deals.is_empty() && self.interactions.is_empty()
    }

    pub fn total(&self) -> usize {
        self.customers.len() + self.deals.len() + self.interactions.len()
    }
}

/// Searches customer name/industry, deal title/description and interaction
/// subject/notes.
pub fn search_all(conn: &Connection, query: &SearchQuery) -> RepoResult<SearchResults> {
    let text = query.text.trim();
    if text.is_empty() {
        return Ok(SearchResults::default());
    }
    let search = Some(text.to_string());
    let limit = Some(query.limit);

    let customers = SqliteCustomerRepository::try_new(conn)?.query(&CustomerListQuery {
        search: search.clone(),
        limit,
        ..CustomerListQuery::default()
    })?;
    let deals = SqliteDealRepository::try_new(conn)?.query(&DealListQuery {
        search: search.clone(),
        limit,
        ..DealListQuery::default()
    })?;
    let interactions = SqliteInteractionRepository::try_new(conn)?.query(&InteractionListQuery {
        search,
        limit,
        ..InteractionListQuery::default()
    })?;

    let results = SearchResults {
        customers,
        deals,
        interactions,
    };
    debug!(
        "event=search module=search status=ok hits={} limit={}",
        results.total(),
        query.limit
    );
    Ok(results)
}
