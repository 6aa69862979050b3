//! Admin-identity pass: acts as a privileged sentinel user.
//!
//! The sentinel is a real record in the user store, found by a fixed
//! username. It is created on first use and reused by every later call.

use std::sync::{Arc, RwLock};

use tracing::{debug, info};
use uuid::Uuid;

use crate::ambient::{AmbientContext, UserIdentity};
use crate::error::{IdentityError, SimError, SimResult};
use crate::options::{OptionKey, OptionSchema, SimulationRequest};
use crate::services::{NewUser, ServiceError, UserRecord, UserStore};
use crate::simulation::pass::{token_mismatch, PassKind, RollbackToken, SimulationPass};

const SENTINEL_DESCRIPTION: &str = "Privileged identity used by environment simulation";

fn store_err(err: ServiceError) -> SimError {
    IdentityError::Store {
        message: err.to_string(),
    }
    .into()
}

/// Swaps the acting user for the sentinel while `actAsPrivilegedUser` is set.
pub struct AdminIdentityPass {
    ambient: Arc<dyn AmbientContext>,
    users: Arc<dyn UserStore>,
    username: String,
    sentinel: RwLock<Option<UserIdentity>>,
}

impl AdminIdentityPass {
    /// Create the pass for the sentinel `username`.
    #[must_use]
    pub fn new(ambient: Arc<dyn AmbientContext>, users: Arc<dyn UserStore>, username: String) -> Self {
        Self {
            ambient,
            users,
            username,
            sentinel: RwLock::new(None),
        }
    }

    /// Find the sentinel user, creating it once if missing.
    ///
    /// A create that loses a race with another writer is tolerated; the
    /// follow-up lookup decides.
    pub fn ensure_sentinel(&self) -> SimResult<UserIdentity> {
        {
            let memo = self
                .sentinel
                .read()
                .map_err(|_| SimError::internal("sentinel memo lock poisoned"))?;
            if let Some(identity) = memo.as_ref() {
                return Ok(identity.clone());
            }
        }

        let record = match self.users.find_user_by_name(&self.username).map_err(store_err)? {
            Some(record) => record,
            None => self.create_sentinel()?,
        };

        let identity = UserIdentity {
            user_id: record.id,
            username: record.username,
            is_admin: true,
        };
        let mut memo = self
            .sentinel
            .write()
            .map_err(|_| SimError::internal("sentinel memo lock poisoned"))?;
        *memo = Some(identity.clone());
        Ok(identity)
    }

    fn create_sentinel(&self) -> SimResult<UserRecord> {
        let user = NewUser {
            username: self.username.clone(),
            password: format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple()),
            is_admin: true,
            description: SENTINEL_DESCRIPTION.to_string(),
        };
        match self.users.create_user(user) {
            Ok(id) => info!(username = %self.username, user_id = %id, "created sentinel user"),
            Err(ServiceError::DuplicateKey(_)) => {
                debug!(username = %self.username, "sentinel user created concurrently");
            }
            Err(err) => return Err(store_err(err)),
        }

        self.users
            .find_user_by_name(&self.username)
            .map_err(store_err)?
            .ok_or_else(|| {
                IdentityError::SentinelUnavailable {
                    username: self.username.clone(),
                }
                .into()
            })
    }
}

impl SimulationPass for AdminIdentityPass {
    fn kind(&self) -> PassKind {
        PassKind::AdminIdentity
    }

    fn declare_options(&self, schema: OptionSchema) -> OptionSchema {
        schema.declare_flag(OptionKey::ActAsPrivilegedUser, false)
    }

    fn needs_activation(&self, request: &SimulationRequest) -> SimResult<bool> {
        Ok(request.act_as_privileged_user)
    }

    fn setup(&self, _request: &SimulationRequest) -> SimResult<RollbackToken> {
        let identity = self.ensure_sentinel()?;
        let previous = self.ambient.user()?;
        debug!(user_id = %identity.user_id, "acting as sentinel user");
        self.ambient.set_user(Some(identity))?;
        Ok(RollbackToken::AdminIdentity { previous })
    }

    fn rollback(&self, token: RollbackToken) -> SimResult<()> {
        let RollbackToken::AdminIdentity { previous } = token else {
            return Err(token_mismatch(PassKind::AdminIdentity, &token));
        };
        self.ambient.set_user(previous)?;
        Ok(())
    }
}
