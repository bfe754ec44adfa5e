use anyhow::Result;
use chrono::Utc;
use log::*;
use r2d2::Pool;
use serde::{Deserialize, Serialize};

use infra::ids::{Id, IdGen};
use infra::persistence::{ConcurrencyError, Storage};

use crate::catalog::{self, CanteenId};
use crate::errors::Rejection;
use crate::menu::MenuItem;
use crate::services::{Commandable, Queryable, Request};

mod models;
pub(crate) mod resources;
mod stats;
mod tracking;

pub use self::models::{order_number_at, Order, OrderLine, OrderStatus};
pub use self::stats::{OrderStats, TopItem, TOP_ITEMS};
pub use self::tracking::{Step, Tracking};

/// Status writes that lose a race reload and try again this many times.
const STATUS_ATTEMPTS: usize = 8;

pub struct Orders<M: r2d2::ManageConnection> {
    db: Pool<M>,
    idgen: IdGen,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrder {
    pub canteen_id: CanteenId,
    pub customer_name: String,
    pub items: Vec<LineRequest>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineRequest {
    pub menu_item_id: Id<MenuItem>,
    pub quantity: u32,
}

/// Newest first.
#[derive(Debug, Clone)]
pub struct ListCanteenOrders(pub CanteenId);

/// Every order placed under exactly this name, newest first.
#[derive(Debug, Clone)]
pub struct ListCustomerOrders(pub String);

#[derive(Debug, Clone, Copy)]
pub struct ShowOrder(pub Id<Order>);

#[derive(Debug, Clone, Copy)]
pub struct UpdateOrderStatus {
    pub id: Id<Order>,
    pub status: OrderStatus,
}

#[derive(Debug, Clone)]
pub struct ShowStats(pub CanteenId);

#[derive(Debug, Clone, Copy)]
pub struct TrackOrder(pub Id<Order>);

impl<M> Orders<M>
where
    M: r2d2::ManageConnection,
    M::Connection: Storage,
{
    pub fn new(db: Pool<M>, idgen: IdGen) -> Self {
        Orders { db, idgen }
    }

    fn newest_first<F: Fn(&Order) -> bool>(&self, filter: F) -> Result<Vec<Order>> {
        let mut orders = self
            .db
            .get()?
            .list::<Order>()?
            .into_iter()
            .filter(|o| filter(o))
            .collect::<Vec<_>>();
        orders.sort_by(|a, b| {
            b.placed_at
                .cmp(&a.placed_at)
                .then_with(|| b.meta.id.cmp(&a.meta.id))
        });
        Ok(orders)
    }

    fn snapshot_lines(
        &self,
        docs: &M::Connection,
        canteen_id: &CanteenId,
        items: &[LineRequest],
    ) -> Result<Vec<OrderLine>> {
        let mut lines = Vec::with_capacity(items.len());
        for line in items {
            let id = line.menu_item_id;
            if line.quantity == 0 {
                return Err(Rejection::ZeroQuantity(id.to_string()).into());
            }
            let item = docs
                .load::<MenuItem>(&id)?
                .ok_or_else(|| Rejection::UnknownMenuItem(id.to_string()))?;
            if &item.canteen_id != canteen_id {
                return Err(Rejection::WrongCanteen(id.to_string(), canteen_id.clone()).into());
            }
            if !item.available {
                return Err(Rejection::Unavailable(id.to_string()).into());
            }
            lines.push(OrderLine::snapshot(&item, line.quantity));
        }
        Ok(lines)
    }
}

impl<M: r2d2::ManageConnection> Clone for Orders<M> {
    fn clone(&self) -> Self {
        let db = self.db.clone();
        let idgen = self.idgen.clone();
        Orders { db, idgen }
    }
}

impl Request for PlaceOrder {
    type Resp = Order;
}

impl<M> Commandable<PlaceOrder> for Orders<M>
where
    M: r2d2::ManageConnection,
    M::Connection: Storage,
{
    fn execute(&self, req: PlaceOrder) -> Result<Order> {
        let PlaceOrder {
            canteen_id,
            customer_name,
            items,
        } = req;
        catalog::require(&canteen_id)?;
        if customer_name.trim().is_empty() {
            return Err(Rejection::MissingCustomerName.into());
        }
        if items.is_empty() {
            return Err(Rejection::EmptyOrder.into());
        }

        let docs = self.db.get()?;
        let lines = self.snapshot_lines(&docs, &canteen_id, &items)?;
        let mut order = Order::place(
            self.idgen.generate(),
            canteen_id,
            &customer_name,
            lines,
            Utc::now(),
        )?;
        docs.save(&mut order)?;
        info!(
            "Placed {} ({}) at {} for {:?}: total {}",
            order.meta.id, order.order_number, order.canteen_id, order.customer_name,
            order.total_amount
        );
        Ok(order)
    }
}

impl Request for ListCanteenOrders {
    type Resp = Vec<Order>;
}

impl<M> Queryable<ListCanteenOrders> for Orders<M>
where
    M: r2d2::ManageConnection,
    M::Connection: Storage,
{
    fn query(&self, ListCanteenOrders(canteen_id): ListCanteenOrders) -> Result<Vec<Order>> {
        let orders = self.newest_first(|o| o.canteen_id == canteen_id)?;
        debug!("{} orders at {}", orders.len(), canteen_id);
        Ok(orders)
    }
}

impl Request for ListCustomerOrders {
    type Resp = Vec<Order>;
}

impl<M> Queryable<ListCustomerOrders> for Orders<M>
where
    M: r2d2::ManageConnection,
    M::Connection: Storage,
{
    fn query(&self, ListCustomerOrders(name): ListCustomerOrders) -> Result<Vec<Order>> {
        let name = name.trim();
        let orders = self.newest_first(|o| o.customer_name == name)?;
        debug!("{} orders for {:?}", orders.len(), name);
        Ok(orders)
    }
}

impl Request for ShowOrder {
    type Resp = Option<Order>;
}

impl<M> Queryable<ShowOrder> for Orders<M>
where
    M: r2d2::ManageConnection,
    M::Connection: Storage,
{
    fn query(&self, ShowOrder(id): ShowOrder) -> Result<Option<Order>> {
        let res = self.db.get()?.load(&id)?;
        debug!("Load {} -> {:?}", id, res);
        Ok(res)
    }
}

impl Request for UpdateOrderStatus {
    type Resp = ();
}

impl<M> Commandable<UpdateOrderStatus> for Orders<M>
where
    M: r2d2::ManageConnection,
    M::Connection: Storage,
{
    fn execute(&self, req: UpdateOrderStatus) -> Result<()> {
        let UpdateOrderStatus { id, status } = req;
        let docs = self.db.get()?;
        for attempt in 1..=STATUS_ATTEMPTS {
            let mut order = docs
                .load::<Order>(&id)?
                .ok_or_else(|| Rejection::UnknownOrder(id.to_string()))?;
            let previous = order.status;
            order.status = status;
            match docs.save(&mut order) {
                Ok(()) => {
                    info!("Order {}: {} -> {}", id, previous, status);
                    return Ok(());
                }
                Err(e) if e.is::<ConcurrencyError>() => {
                    warn!("Order {} changed while setting {} (attempt {})", id, status, attempt);
                }
                Err(e) => return Err(e),
            }
        }
        Err(Rejection::Contended(id.to_string()).into())
    }
}

impl Request for ShowStats {
    type Resp = OrderStats;
}

impl<M> Queryable<ShowStats> for Orders<M>
where
    M: r2d2::ManageConnection,
    M::Connection: Storage,
{
    fn query(&self, ShowStats(canteen_id): ShowStats) -> Result<OrderStats> {
        let mut orders = self.newest_first(|o| o.canteen_id == canteen_id)?;
        orders.reverse();
        let stats = OrderStats::of(&orders);
        debug!("Stats for {}: {:?}", canteen_id, stats);
        Ok(stats)
    }
}

impl Request for TrackOrder {
    type Resp = Option<Tracking>;
}

impl<M> Queryable<TrackOrder> for Orders<M>
where
    M: r2d2::ManageConnection,
    M::Connection: Storage,
{
    fn query(&self, TrackOrder(id): TrackOrder) -> Result<Option<Tracking>> {
        let order = self.query(ShowOrder(id))?;
        Ok(order.as_ref().map(Tracking::of))
    }
}
