use serde::{Deserialize, Serialize};

use infra::documents::{DocMeta, HasMeta};
use infra::ids::{Entity, Id};

use crate::catalog::CanteenId;

/// Staff login for one canteen. Credentials are stored as given.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminAccount {
    #[serde(flatten)]
    pub meta: DocMeta<AdminAccount>,
    pub canteen_id: CanteenId,
    pub username: String,
    pub password: String,
    pub canteen_name: String,
}

/// Returned on a successful login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminSession {
    pub canteen_id: CanteenId,
    pub canteen_name: String,
    pub username: String,
}

impl AdminAccount {
    /// Accounts are keyed by username, so at most one can exist per name.
    pub fn id_for(username: &str) -> Id<AdminAccount> {
        Id::hashed(username)
    }

    pub fn new(canteen_id: CanteenId, username: &str, password: &str, canteen_name: &str) -> Self {
        AdminAccount {
            meta: DocMeta::new_with_id(Self::id_for(username)),
            canteen_id,
            username: username.to_string(),
            password: password.to_string(),
            canteen_name: canteen_name.to_string(),
        }
    }

    pub fn session(&self) -> AdminSession {
        AdminSession {
            canteen_id: self.canteen_id.clone(),
            canteen_name: self.canteen_name.clone(),
            username: self.username.clone(),
        }
    }
}

impl Entity for AdminAccount {
    const PREFIX: &'static str = "admin";
}

impl HasMeta for AdminAccount {
    fn meta(&self) -> &DocMeta<Self> {
        &self.meta
    }
    fn meta_mut(&mut self) -> &mut DocMeta<Self> {
        &mut self.meta
    }
}
