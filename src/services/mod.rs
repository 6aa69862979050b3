//! Collaborator contracts.
//!
//! The simulator never owns site, user or page data. It consults these
//! lookups through narrow traits so hosts can plug in their own backends.

pub mod memory;

pub use memory::{InMemoryPageLookup, InMemoryServices, InMemorySiteLookup, InMemoryUserStore};

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ambient::{PageRecord, Site, UserId};

/// Errors reported by collaborator backends.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Key already exists.
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    /// Backend error.
    #[error("Service backend error: {0}")]
    BackendError(String),
}

/// Site registry.
pub trait SiteLookup: Send + Sync {
    /// Find a site by its identifier.
    fn site_by_identifier(&self, identifier: &str) -> Result<Option<Arc<Site>>, ServiceError>;
}

/// A stored user record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    /// User id.
    pub id: UserId,
    /// Unique username.
    pub username: String,
    /// Whether the user is an administrator.
    pub is_admin: bool,
    /// Free-form description.
    pub description: String,
}

/// Fields for a user to be created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    /// Unique username.
    pub username: String,
    /// Password (already hashed or random; never logged).
    pub password: String,
    /// Whether the user is an administrator.
    pub is_admin: bool,
    /// Free-form description.
    pub description: String,
}

/// User/identity store.
pub trait UserStore: Send + Sync {
    /// Find a user by exact username.
    fn find_user_by_name(&self, username: &str) -> Result<Option<UserRecord>, ServiceError>;

    /// Create a user and return its id.
    fn create_user(&self, user: NewUser) -> Result<UserId, ServiceError>;
}

/// Page tree lookup.
pub trait PageLookup: Send + Sync {
    /// Fetch a page record.
    fn page_info(&self, page_id: u32) -> Result<Option<PageRecord>, ServiceError>;

    /// Root line from `page_id` up to (excluding) the tree root, nearest page first.
    fn root_line(&self, page_id: u32) -> Result<Vec<PageRecord>, ServiceError>;
}

/// Collaborator handles injected into the standard passes.
#[derive(Clone)]
pub struct SimulationServices {
    /// Site registry.
    pub sites: Arc<dyn SiteLookup>,
    /// User store.
    pub users: Arc<dyn UserStore>,
    /// Page lookup.
    pub pages: Arc<dyn PageLookup>,
}
