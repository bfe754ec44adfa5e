use anyhow::Result;
use log::*;
use r2d2::Pool;

use infra::ids::{Id, IdGen};
use infra::persistence::Storage;

use crate::catalog::{self, CanteenId};
use crate::errors::Rejection;
use crate::services::{Commandable, Queryable, Request};

mod models;
pub(crate) mod resources;

pub use self::models::{Category, MenuItem, MenuItemForm, MenuItemPatch};

pub struct Menu<M: r2d2::ManageConnection> {
    db: Pool<M>,
    idgen: IdGen,
}

/// The available dishes of one canteen.
#[derive(Debug, Clone)]
pub struct ListMenu {
    pub canteen_id: CanteenId,
}

#[derive(Debug, Clone)]
pub struct ListMenuByCategory {
    pub canteen_id: CanteenId,
    pub category: Category,
}

/// Looks up a dish whether or not it is currently available.
#[derive(Debug, Clone, Copy)]
pub struct ShowMenuItem(pub Id<MenuItem>);

#[derive(Debug, Clone)]
pub struct CreateMenuItem {
    pub canteen_id: CanteenId,
    pub item: MenuItemForm,
}

#[derive(Debug, Clone)]
pub struct UpdateMenuItem {
    pub id: Id<MenuItem>,
    pub patch: MenuItemPatch,
}

#[derive(Debug, Clone, Copy)]
pub struct RemoveMenuItem(pub Id<MenuItem>);

impl<M> Menu<M>
where
    M: r2d2::ManageConnection,
    M::Connection: Storage,
{
    pub fn new(db: Pool<M>, idgen: IdGen) -> Self {
        Menu { db, idgen }
    }

    fn available_in<F: Fn(&MenuItem) -> bool>(
        &self,
        canteen_id: &CanteenId,
        filter: F,
    ) -> Result<Vec<MenuItem>> {
        let docs = self.db.get()?;
        let mut items = docs
            .list::<MenuItem>()?
            .into_iter()
            .filter(|item| &item.canteen_id == canteen_id && item.available && filter(item))
            .collect::<Vec<_>>();
        items.sort_by_key(|item| item.meta.id);
        debug!("{} available items at {}", items.len(), canteen_id);
        Ok(items)
    }
}

impl<M: r2d2::ManageConnection> Clone for Menu<M> {
    fn clone(&self) -> Self {
        let db = self.db.clone();
        let idgen = self.idgen.clone();
        Menu { db, idgen }
    }
}

impl Request for ListMenu {
    type Resp = Vec<MenuItem>;
}

impl<M> Queryable<ListMenu> for Menu<M>
where
    M: r2d2::ManageConnection,
    M::Connection: Storage,
{
    fn query(&self, req: ListMenu) -> Result<Vec<MenuItem>> {
        self.available_in(&req.canteen_id, |_| true)
    }
}

impl Request for ListMenuByCategory {
    type Resp = Vec<MenuItem>;
}

impl<M> Queryable<ListMenuByCategory> for Menu<M>
where
    M: r2d2::ManageConnection,
    M::Connection: Storage,
{
    fn query(&self, req: ListMenuByCategory) -> Result<Vec<MenuItem>> {
        let ListMenuByCategory {
            canteen_id,
            category,
        } = req;
        self.available_in(&canteen_id, |item| item.category == category)
    }
}

impl Request for ShowMenuItem {
    type Resp = Option<MenuItem>;
}

impl<M> Queryable<ShowMenuItem> for Menu<M>
where
    M: r2d2::ManageConnection,
    M::Connection: Storage,
{
    fn query(&self, ShowMenuItem(id): ShowMenuItem) -> Result<Option<MenuItem>> {
        let res = self.db.get()?.load(&id)?;
        debug!("Load {} -> {:?}", id, res);
        Ok(res)
    }
}

impl Request for CreateMenuItem {
    type Resp = Id<MenuItem>;
}

impl<M> Commandable<CreateMenuItem> for Menu<M>
where
    M: r2d2::ManageConnection,
    M::Connection: Storage,
{
    fn execute(&self, req: CreateMenuItem) -> Result<Id<MenuItem>> {
        let CreateMenuItem { canteen_id, item } = req;
        catalog::require(&canteen_id)?;
        if item.price == 0 {
            return Err(Rejection::InvalidPrice.into());
        }

        let mut item = MenuItem::new(self.idgen.generate(), canteen_id, item);
        self.db.get()?.save(&mut item)?;
        info!("Added {} to {}: {:?}", item.meta.id, item.canteen_id, item.name);
        Ok(item.meta.id)
    }
}

impl Request for UpdateMenuItem {
    type Resp = ();
}

impl<M> Commandable<UpdateMenuItem> for Menu<M>
where
    M: r2d2::ManageConnection,
    M::Connection: Storage,
{
    fn execute(&self, req: UpdateMenuItem) -> Result<()> {
        let UpdateMenuItem { id, patch } = req;
        if patch.price == Some(0) {
            return Err(Rejection::InvalidPrice.into());
        }

        let docs = self.db.get()?;
        let mut item = docs
            .load::<MenuItem>(&id)?
            .ok_or_else(|| Rejection::UnknownMenuItem(id.to_string()))?;
        item.apply(patch);
        docs.save(&mut item)?;
        info!("Updated {}: {:?}", id, item);
        Ok(())
    }
}

impl Request for RemoveMenuItem {
    type Resp = ();
}

impl<M> Commandable<RemoveMenuItem> for Menu<M>
where
    M: r2d2::ManageConnection,
    M::Connection: Storage,
{
    fn execute(&self, RemoveMenuItem(id): RemoveMenuItem) -> Result<()> {
        if !self.db.get()?.delete(&id)? {
            return Err(Rejection::UnknownMenuItem(id.to_string()).into());
        }
        info!("Removed {}", id);
        Ok(())
    }
}
