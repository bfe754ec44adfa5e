use actix_web::web::ServiceConfig;
use anyhow::{Context, Result};
use log::*;
use r2d2::Pool;

use infra::ids::IdGen;
use infra::persistence::Storage;

pub mod admin;
pub mod catalog;
pub mod config;
pub mod errors;
pub mod maintenance;
pub mod menu;
pub mod orders;
pub mod services;
mod web;

#[cfg(test)]
mod test;

pub use crate::web::ApiError;

/// The whole backend over one storage pool. Hands out the individual
/// services, and mounts all of them on an actix-web app.
pub struct Canteens<M: r2d2::ManageConnection> {
    db: Pool<M>,
    idgen: IdGen,
}

impl<M> Canteens<M>
where
    M: r2d2::ManageConnection,
    M::Connection: Storage,
{
    pub fn new(db: Pool<M>) -> Self {
        let idgen = IdGen::new();
        Canteens { db, idgen }
    }

    pub fn setup(&self) -> Result<()> {
        debug!("Init storage");
        self.db.get()?.setup().context("Setup persistence")?;
        Ok(())
    }

    pub fn catalog(&self) -> catalog::Catalog {
        catalog::Catalog
    }

    pub fn menu(&self) -> menu::Menu<M> {
        menu::Menu::new(self.db.clone(), self.idgen.clone())
    }

    pub fn orders(&self) -> orders::Orders<M> {
        orders::Orders::new(self.db.clone(), self.idgen.clone())
    }

    pub fn admins(&self) -> admin::Admins<M> {
        admin::Admins::new(self.db.clone())
    }

    pub fn maintenance(&self) -> maintenance::Maintenance<M> {
        maintenance::Maintenance::new(self.db.clone(), self.idgen.clone())
    }

    pub fn configure(&self, cfg: &mut ServiceConfig) {
        info!("Mounting canteen services");
        catalog::resources::configure(cfg);
        self.menu().configure(cfg);
        self.orders().configure(cfg);
        self.admins().configure(cfg);
        self.maintenance().configure(cfg);
    }
}

impl<M: r2d2::ManageConnection> Clone for Canteens<M> {
    fn clone(&self) -> Self {
        let db = self.db.clone();
        let idgen = self.idgen.clone();
        Canteens { db, idgen }
    }
}
