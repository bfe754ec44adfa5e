use actix_web::{web, HttpResponse};
use log::*;
use serde_json::json;

use infra::persistence::Storage;

use super::{AdminLogin, Admins, CreateAdmin};
use crate::services::{Commandable, Queryable};
use crate::web::{in_pool, ApiError};

impl<M> Admins<M>
where
    M: r2d2::ManageConnection,
    M::Connection: Storage,
{
    pub fn configure(&self, cfg: &mut web::ServiceConfig) {
        cfg.app_data(web::Data::new(self.clone()))
            .service(web::resource("/admin/login").route(web::post().to(login::<M>)))
            .service(web::resource("/admin/accounts").route(web::post().to(create::<M>)));
    }
}

async fn login<M>(
    admins: web::Data<Admins<M>>,
    form: web::Json<AdminLogin>,
) -> Result<HttpResponse, ApiError>
where
    M: r2d2::ManageConnection,
    M::Connection: Storage,
{
    let req = form.into_inner();
    let admins = admins.get_ref().clone();
    let session = in_pool(move || admins.query(req)).await?;
    Ok(match session {
        Some(session) => HttpResponse::Ok().json(session),
        None => HttpResponse::Unauthorized().json(json!({ "error": "invalid username or password" })),
    })
}

async fn create<M>(
    admins: web::Data<Admins<M>>,
    form: web::Json<CreateAdmin>,
) -> Result<HttpResponse, ApiError>
where
    M: r2d2::ManageConnection,
    M::Connection: Storage,
{
    let req = form.into_inner();
    debug!("Create admin {:?} for {}", req.username, req.canteen_id);
    let admins = admins.get_ref().clone();
    let id = in_pool(move || admins.execute(req)).await?;
    Ok(HttpResponse::Created().json(json!({ "id": id })))
}
