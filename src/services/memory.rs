//! In-memory collaborator backends.
//!
//! Thread-safe implementations of the collaborator traits, intended for
//! embedded usage, tests, and as a reference implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::ambient::{PageRecord, Site, UserId};

use super::{
    NewUser, PageLookup, ServiceError, SimulationServices, SiteLookup, UserRecord, UserStore,
};

/// Upper bound on root-line length; deeper chains are treated as corrupt.
const MAX_ROOT_LINE_DEPTH: usize = 128;

fn lock_err(context: &'static str) -> ServiceError {
    ServiceError::BackendError(format!("poisoned lock: {context}"))
}

/// Site registry keyed by identifier.
#[derive(Debug, Default)]
pub struct InMemorySiteLookup {
    sites: RwLock<HashMap<String, Arc<Site>>>,
}

impl InMemorySiteLookup {
    /// Register (or replace) a site.
    pub fn insert(&self, site: Site) -> Result<Arc<Site>, ServiceError> {
        let site = Arc::new(site);
        let mut sites = self.sites.write().map_err(|_| lock_err("sites.insert"))?;
        sites.insert(site.identifier.clone(), Arc::clone(&site));
        Ok(site)
    }
}

impl SiteLookup for InMemorySiteLookup {
    fn site_by_identifier(&self, identifier: &str) -> Result<Option<Arc<Site>>, ServiceError> {
        let sites = self.sites.read().map_err(|_| lock_err("sites.get"))?;
        Ok(sites.get(identifier).cloned())
    }
}

#[derive(Debug, Default)]
struct UserState {
    by_name: HashMap<String, UserRecord>,
    next_id: u32,
}

/// User store with sequential ids starting at 1.
#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    state: RwLock<UserState>,
}

impl InMemoryUserStore {
    /// Number of stored users.
    pub fn len(&self) -> Result<usize, ServiceError> {
        let state = self.state.read().map_err(|_| lock_err("users.len"))?;
        Ok(state.by_name.len())
    }

    /// Returns true if no users are stored.
    pub fn is_empty(&self) -> Result<bool, ServiceError> {
        Ok(self.len()? == 0)
    }
}

impl UserStore for InMemoryUserStore {
    fn find_user_by_name(&self, username: &str) -> Result<Option<UserRecord>, ServiceError> {
        let state = self.state.read().map_err(|_| lock_err("users.find"))?;
        Ok(state.by_name.get(username).cloned())
    }

    fn create_user(&self, user: NewUser) -> Result<UserId, ServiceError> {
        let mut state = self.state.write().map_err(|_| lock_err("users.create"))?;
        if state.by_name.contains_key(&user.username) {
            return Err(ServiceError::DuplicateKey(user.username));
        }
        state.next_id += 1;
        let id = UserId(state.next_id);
        state.by_name.insert(
            user.username.clone(),
            UserRecord {
                id,
                username: user.username,
                is_admin: user.is_admin,
                description: user.description,
            },
        );
        Ok(id)
    }
}

/// Page tree keyed by page id.
#[derive(Debug, Default)]
pub struct InMemoryPageLookup {
    pages: RwLock<HashMap<u32, PageRecord>>,
}

impl InMemoryPageLookup {
    /// Register (or replace) a page.
    pub fn insert(&self, page: PageRecord) -> Result<(), ServiceError> {
        let mut pages = self.pages.write().map_err(|_| lock_err("pages.insert"))?;
        pages.insert(page.uid, page);
        Ok(())
    }
}

impl PageLookup for InMemoryPageLookup {
    fn page_info(&self, page_id: u32) -> Result<Option<PageRecord>, ServiceError> {
        let pages = self.pages.read().map_err(|_| lock_err("pages.get"))?;
        Ok(pages.get(&page_id).cloned())
    }

    fn root_line(&self, page_id: u32) -> Result<Vec<PageRecord>, ServiceError> {
        let pages = self.pages.read().map_err(|_| lock_err("pages.root_line"))?;
        let mut line = Vec::new();
        let mut current = page_id;
        while current != 0 {
            if line.len() >= MAX_ROOT_LINE_DEPTH {
                return Err(ServiceError::BackendError(format!(
                    "root line of page {page_id} exceeds {MAX_ROOT_LINE_DEPTH} levels"
                )));
            }
            let Some(page) = pages.get(&current) else {
                break;
            };
            line.push(page.clone());
            current = page.pid;
        }
        Ok(line)
    }
}

/// Bundle of in-memory backends.
#[derive(Debug, Default, Clone)]
pub struct InMemoryServices {
    /// Site registry.
    pub sites: Arc<InMemorySiteLookup>,
    /// User store.
    pub users: Arc<InMemoryUserStore>,
    /// Page lookup.
    pub pages: Arc<InMemoryPageLookup>,
}

impl InMemoryServices {
    /// Collaborator handles backed by these stores.
    #[must_use]
    pub fn services(&self) -> SimulationServices {
        SimulationServices {
            sites: Arc::clone(&self.sites) as Arc<dyn SiteLookup>,
            users: Arc::clone(&self.users) as Arc<dyn UserStore>,
            pages: Arc::clone(&self.pages) as Arc<dyn PageLookup>,
        }
    }
}
