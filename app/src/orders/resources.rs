use actix_web::{web, HttpResponse};
use log::*;
use serde::Deserialize;

use infra::ids::Id;
use infra::persistence::Storage;

use super::{
    ListCanteenOrders, ListCustomerOrders, Order, OrderStatus, Orders, PlaceOrder, ShowOrder,
    ShowStats, TrackOrder, Tracking, UpdateOrderStatus,
};
use crate::errors::Rejection;
use crate::services::{Commandable, Queryable};
use crate::web::{found, in_pool, ApiError};

#[derive(Debug, Deserialize)]
struct CustomerFilter {
    customer: String,
}

#[derive(Debug, Deserialize)]
struct StatusForm {
    status: OrderStatus,
}

impl<M> Orders<M>
where
    M: r2d2::ManageConnection,
    M::Connection: Storage,
{
    pub fn configure(&self, cfg: &mut web::ServiceConfig) {
        cfg.app_data(web::Data::new(self.clone()))
            .service(
                web::resource("/orders")
                    .route(web::get().to(by_customer::<M>))
                    .route(web::post().to(place::<M>)),
            )
            .service(web::resource("/orders/{id}").route(web::get().to(detail::<M>)))
            .service(web::resource("/orders/{id}/tracking").route(web::get().to(tracking::<M>)))
            .service(web::resource("/orders/{id}/status").route(web::put().to(set_status::<M>)))
            .service(
                web::resource("/canteens/{canteen}/orders")
                    .route(web::get().to(by_canteen::<M>)),
            )
            .service(web::resource("/canteens/{canteen}/stats").route(web::get().to(stats::<M>)));
    }
}

async fn place<M>(
    orders: web::Data<Orders<M>>,
    form: web::Json<PlaceOrder>,
) -> Result<HttpResponse, ApiError>
where
    M: r2d2::ManageConnection,
    M::Connection: Storage,
{
    let req = form.into_inner();
    debug!("Place order: {:?}", req);
    let orders = orders.get_ref().clone();
    let order = in_pool(move || orders.execute(req)).await?;
    Ok(HttpResponse::Created().json(order))
}

async fn by_customer<M>(
    orders: web::Data<Orders<M>>,
    filter: web::Query<CustomerFilter>,
) -> Result<HttpResponse, ApiError>
where
    M: r2d2::ManageConnection,
    M::Connection: Storage,
{
    let name = filter.into_inner().customer;
    let orders = orders.get_ref().clone();
    let list = in_pool(move || orders.query(ListCustomerOrders(name))).await?;
    Ok(HttpResponse::Ok().json(list))
}

async fn by_canteen<M>(
    orders: web::Data<Orders<M>>,
    canteen: web::Path<String>,
) -> Result<HttpResponse, ApiError>
where
    M: r2d2::ManageConnection,
    M::Connection: Storage,
{
    let canteen_id = canteen.into_inner().into();
    let orders = orders.get_ref().clone();
    let list = in_pool(move || orders.query(ListCanteenOrders(canteen_id))).await?;
    Ok(HttpResponse::Ok().json(list))
}

async fn stats<M>(
    orders: web::Data<Orders<M>>,
    canteen: web::Path<String>,
) -> Result<HttpResponse, ApiError>
where
    M: r2d2::ManageConnection,
    M::Connection: Storage,
{
    let canteen_id = canteen.into_inner().into();
    let orders = orders.get_ref().clone();
    let stats = in_pool(move || orders.query(ShowStats(canteen_id))).await?;
    Ok(HttpResponse::Ok().json(stats))
}

async fn detail<M>(
    orders: web::Data<Orders<M>>,
    id: web::Path<String>,
) -> Result<HttpResponse, ApiError>
where
    M: r2d2::ManageConnection,
    M::Connection: Storage,
{
    let id = match id.parse::<Id<Order>>() {
        Ok(id) => id,
        Err(_) => return Ok(found::<Order>("order", None)),
    };
    let orders = orders.get_ref().clone();
    let order = in_pool(move || orders.query(ShowOrder(id))).await?;
    Ok(found("order", order))
}

async fn tracking<M>(
    orders: web::Data<Orders<M>>,
    id: web::Path<String>,
) -> Result<HttpResponse, ApiError>
where
    M: r2d2::ManageConnection,
    M::Connection: Storage,
{
    let id = match id.parse::<Id<Order>>() {
        Ok(id) => id,
        Err(_) => return Ok(found::<Tracking>("order", None)),
    };
    let orders = orders.get_ref().clone();
    let view = in_pool(move || orders.query(TrackOrder(id))).await?;
    Ok(found("order", view))
}

async fn set_status<M>(
    orders: web::Data<Orders<M>>,
    id: web::Path<String>,
    form: web::Json<StatusForm>,
) -> Result<HttpResponse, ApiError>
where
    M: r2d2::ManageConnection,
    M::Connection: Storage,
{
    let id = id
        .parse::<Id<Order>>()
        .map_err(|_| Rejection::UnknownOrder(id.to_string()))?;
    let status = form.into_inner().status;
    let orders = orders.get_ref().clone();
    in_pool(move || orders.execute(UpdateOrderStatus { id, status })).await?;
    Ok(HttpResponse::NoContent().finish())
}
