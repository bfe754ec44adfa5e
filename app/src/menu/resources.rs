use actix_web::{web, HttpResponse};
use log::*;
use serde::Deserialize;
use serde_json::json;

use infra::ids::Id;
use infra::persistence::Storage;

use super::{
    Category, CreateMenuItem, ListMenu, ListMenuByCategory, Menu, MenuItem, MenuItemForm,
    MenuItemPatch, RemoveMenuItem, ShowMenuItem, UpdateMenuItem,
};
use crate::errors::Rejection;
use crate::services::{Commandable, Queryable};
use crate::web::{found, in_pool, ApiError};

#[derive(Debug, Deserialize)]
struct MenuFilter {
    category: Option<Category>,
}

impl<M> Menu<M>
where
    M: r2d2::ManageConnection,
    M::Connection: Storage,
{
    pub fn configure(&self, cfg: &mut web::ServiceConfig) {
        cfg.app_data(web::Data::new(self.clone()))
            .service(
                web::resource("/canteens/{canteen}/menu")
                    .route(web::get().to(index::<M>))
                    .route(web::post().to(create::<M>)),
            )
            .service(
                web::resource("/menu/{id}")
                    .route(web::get().to(detail::<M>))
                    .route(web::patch().to(update::<M>))
                    .route(web::delete().to(remove::<M>)),
            );
    }
}

fn item_id(raw: &str) -> Result<Id<MenuItem>, Rejection> {
    raw.parse()
        .map_err(|_| Rejection::UnknownMenuItem(raw.to_string()))
}

async fn index<M>(
    menu: web::Data<Menu<M>>,
    canteen: web::Path<String>,
    filter: web::Query<MenuFilter>,
) -> Result<HttpResponse, ApiError>
where
    M: r2d2::ManageConnection,
    M::Connection: Storage,
{
    let canteen_id = canteen.into_inner().into();
    let menu = menu.get_ref().clone();
    let items = match filter.into_inner().category {
        Some(category) => {
            in_pool(move || {
                menu.query(ListMenuByCategory {
                    canteen_id,
                    category,
                })
            })
            .await?
        }
        None => in_pool(move || menu.query(ListMenu { canteen_id })).await?,
    };
    Ok(HttpResponse::Ok().json(items))
}

async fn detail<M>(
    menu: web::Data<Menu<M>>,
    id: web::Path<String>,
) -> Result<HttpResponse, ApiError>
where
    M: r2d2::ManageConnection,
    M::Connection: Storage,
{
    let id = match id.parse::<Id<MenuItem>>() {
        Ok(id) => id,
        Err(_) => return Ok(found::<MenuItem>("menu item", None)),
    };
    let menu = menu.get_ref().clone();
    let item = in_pool(move || menu.query(ShowMenuItem(id))).await?;
    Ok(found("menu item", item))
}

async fn create<M>(
    menu: web::Data<Menu<M>>,
    canteen: web::Path<String>,
    form: web::Json<MenuItemForm>,
) -> Result<HttpResponse, ApiError>
where
    M: r2d2::ManageConnection,
    M::Connection: Storage,
{
    let req = CreateMenuItem {
        canteen_id: canteen.into_inner().into(),
        item: form.into_inner(),
    };
    debug!("Create menu item: {:?}", req);
    let menu = menu.get_ref().clone();
    let id = in_pool(move || menu.execute(req)).await?;
    Ok(HttpResponse::Created().json(json!({ "id": id })))
}

async fn update<M>(
    menu: web::Data<Menu<M>>,
    id: web::Path<String>,
    patch: web::Json<MenuItemPatch>,
) -> Result<HttpResponse, ApiError>
where
    M: r2d2::ManageConnection,
    M::Connection: Storage,
{
    let id = item_id(&id)?;
    let patch = patch.into_inner();
    let menu = menu.get_ref().clone();
    in_pool(move || menu.execute(UpdateMenuItem { id, patch })).await?;
    Ok(HttpResponse::NoContent().finish())
}

async fn remove<M>(
    menu: web::Data<Menu<M>>,
    id: web::Path<String>,
) -> Result<HttpResponse, ApiError>
where
    M: r2d2::ManageConnection,
    M::Connection: Storage,
{
    let id = item_id(&id)?;
    let menu = menu.get_ref().clone();
    in_pool(move || menu.execute(RemoveMenuItem(id))).await?;
    Ok(HttpResponse::NoContent().finish())
}
