use actix_web::{web, HttpResponse};
use log::*;

use super::{Catalog, ListCanteens, ShowCanteen};
use crate::services::Queryable;
use crate::web::{found, ApiError};

pub(crate) fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::Data::new(Catalog))
        .service(web::resource("/canteens").route(web::get().to(index)))
        .service(web::resource("/canteens/{canteen}").route(web::get().to(detail)));
}

async fn index(catalog: web::Data<Catalog>) -> Result<HttpResponse, ApiError> {
    info!("Handle canteen index");
    let canteens = catalog.query(ListCanteens)?;
    Ok(HttpResponse::Ok().json(canteens))
}

async fn detail(
    catalog: web::Data<Catalog>,
    canteen: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let canteen = catalog.query(ShowCanteen(canteen.into_inner().into()))?;
    Ok(found("canteen", canteen))
}
