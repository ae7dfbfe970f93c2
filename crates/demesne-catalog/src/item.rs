//! Wire model for the domain data listing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One entry of a domain's data listing: a named, typed blob.
///
/// Read-only once fetched; the classification rules in [`crate::classify`]
/// derive every asset reference from `name` and `data_type` alone.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CatalogItem {
    pub id: String,
    pub name: String,
    pub data_type: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Size in bytes, when the server reports one.
    #[serde(default)]
    pub size: Option<u64>,
}
