use anyhow::Result;
use log::*;
use r2d2::Pool;
use serde::{Deserialize, Serialize};

use infra::ids::Id;
use infra::persistence::{ConcurrencyError, Storage};

use crate::catalog::{self, CanteenId};
use crate::errors::Rejection;
use crate::services::{Commandable, Queryable, Request};

mod models;
pub(crate) mod resources;

pub use self::models::{AdminAccount, AdminSession};

pub struct Admins<M: r2d2::ManageConnection> {
    db: Pool<M>,
}

/// Yields a session only when both username and password match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminLogin {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAdmin {
    pub canteen_id: CanteenId,
    pub username: String,
    pub password: String,
    /// Defaults to the canteen's own name.
    #[serde(default)]
    pub canteen_name: Option<String>,
}

impl<M> Admins<M>
where
    M: r2d2::ManageConnection,
    M::Connection: Storage,
{
    pub fn new(db: Pool<M>) -> Self {
        Admins { db }
    }
}

impl<M: r2d2::ManageConnection> Clone for Admins<M> {
    fn clone(&self) -> Self {
        let db = self.db.clone();
        Admins { db }
    }
}

impl Request for AdminLogin {
    type Resp = Option<AdminSession>;
}

impl<M> Queryable<AdminLogin> for Admins<M>
where
    M: r2d2::ManageConnection,
    M::Connection: Storage,
{
    fn query(&self, req: AdminLogin) -> Result<Option<AdminSession>> {
        let AdminLogin { username, password } = req;
        let account = self
            .db
            .get()?
            .load::<AdminAccount>(&AdminAccount::id_for(&username))?;
        let session = account
            .filter(|a| a.username == username && a.password == password)
            .map(|a| a.session());
        match session {
            Some(ref s) => info!("Admin {:?} logged in to {}", s.username, s.canteen_id),
            None => info!("Refused login for {:?}", username),
        }
        Ok(session)
    }
}

impl Request for CreateAdmin {
    type Resp = Id<AdminAccount>;
}

impl<M> Commandable<CreateAdmin> for Admins<M>
where
    M: r2d2::ManageConnection,
    M::Connection: Storage,
{
    fn execute(&self, req: CreateAdmin) -> Result<Id<AdminAccount>> {
        let CreateAdmin {
            canteen_id,
            username,
            password,
            canteen_name,
        } = req;
        let canteen = catalog::require(&canteen_id)?;
        let username = username.trim();
        if username.is_empty() {
            return Err(Rejection::MissingUsername.into());
        }
        let canteen_name = canteen_name.unwrap_or_else(|| canteen.name.to_string());

        let mut account = AdminAccount::new(canteen_id, username, &password, &canteen_name);
        match self.db.get()?.save(&mut account) {
            Ok(()) => {}
            Err(e) if e.is::<ConcurrencyError>() => {
                return Err(Rejection::UsernameTaken(username.to_string()).into())
            }
            Err(e) => return Err(e),
        }
        info!("Created admin {:?} for {}", username, account.canteen_id);
        Ok(account.meta.id)
    }
}
