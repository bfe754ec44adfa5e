use actix_web::{web, HttpResponse};
use serde::Deserialize;

use infra::persistence::Storage;

use super::{Maintenance, RemoveCanteens, SeedDatabase};
use crate::catalog::CanteenId;
use crate::services::Commandable;
use crate::web::{in_pool, ApiError};

#[derive(Debug, Deserialize)]
struct CleanupForm {
    canteens: Vec<CanteenId>,
}

impl<M> Maintenance<M>
where
    M: r2d2::ManageConnection,
    M::Connection: Storage,
{
    pub fn configure(&self, cfg: &mut web::ServiceConfig) {
        cfg.app_data(web::Data::new(self.clone()))
            .service(web::resource("/admin/seed").route(web::post().to(seed::<M>)))
            .service(web::resource("/admin/cleanup").route(web::post().to(cleanup::<M>)));
    }
}

async fn seed<M>(maintenance: web::Data<Maintenance<M>>) -> Result<HttpResponse, ApiError>
where
    M: r2d2::ManageConnection,
    M::Connection: Storage,
{
    let maintenance = maintenance.get_ref().clone();
    let outcome = in_pool(move || maintenance.execute(SeedDatabase)).await?;
    Ok(HttpResponse::Ok().json(outcome))
}

async fn cleanup<M>(
    maintenance: web::Data<Maintenance<M>>,
    form: web::Json<CleanupForm>,
) -> Result<HttpResponse, ApiError>
where
    M: r2d2::ManageConnection,
    M::Connection: Storage,
{
    let canteens = form.into_inner().canteens;
    let maintenance = maintenance.get_ref().clone();
    let report = in_pool(move || maintenance.execute(RemoveCanteens(canteens))).await?;
    Ok(HttpResponse::Ok().json(report))
}
