use std::fmt;
use std::str::FromStr;

use anyhow::bail;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use infra::documents::{DocMeta, HasMeta};
use infra::ids::{Entity, Id};

use crate::catalog::CanteenId;
use crate::errors::Rejection;
use crate::menu::MenuItem;

const ORDER_NUMBER_MODULUS: i64 = 100_000_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(flatten)]
    pub meta: DocMeta<Order>,
    pub canteen_id: CanteenId,
    pub customer_name: String,
    pub items: Vec<OrderLine>,
    pub total_amount: u64,
    pub status: OrderStatus,
    pub order_number: String,
    pub placed_at: DateTime<Utc>,
}

/// A menu item as it was when the order was placed. Later edits to the
/// menu do not reach back into orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub menu_item_id: Id<MenuItem>,
    pub name: String,
    pub price: u64,
    pub quantity: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Preparing,
    Ready,
    Delivered,
}

impl Order {
    /// Fails when the total does not fit in a `u64`.
    pub fn place(
        id: Id<Order>,
        canteen_id: CanteenId,
        customer_name: &str,
        items: Vec<OrderLine>,
        placed_at: DateTime<Utc>,
    ) -> Result<Self, Rejection> {
        let total_amount = items
            .iter()
            .try_fold(0u64, |total, line| total.checked_add(line.subtotal()?))
            .ok_or(Rejection::TotalTooLarge)?;
        Ok(Order {
            meta: DocMeta::new_with_id(id),
            canteen_id,
            customer_name: customer_name.trim().to_string(),
            items,
            total_amount,
            status: OrderStatus::Pending,
            order_number: order_number_at(placed_at),
            placed_at,
        })
    }
}

/// `ORD` followed by the last eight digits of the millisecond timestamp.
pub fn order_number_at(at: DateTime<Utc>) -> String {
    format!(
        "ORD{:08}",
        at.timestamp_millis().rem_euclid(ORDER_NUMBER_MODULUS)
    )
}

impl OrderLine {
    pub fn snapshot(item: &MenuItem, quantity: u32) -> Self {
        OrderLine {
            menu_item_id: item.meta.id,
            name: item.name.clone(),
            price: item.price,
            quantity,
        }
    }

    pub fn subtotal(&self) -> Option<u64> {
        self.price.checked_mul(u64::from(self.quantity))
    }
}

impl OrderStatus {
    /// The lifecycle, in the order customers see it.
    pub const ALL: [OrderStatus; 4] = [
        OrderStatus::Pending,
        OrderStatus::Preparing,
        OrderStatus::Ready,
        OrderStatus::Delivered,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Preparing => "preparing",
            OrderStatus::Ready => "ready",
            OrderStatus::Delivered => "delivered",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "Order Placed",
            OrderStatus::Preparing => "Preparing",
            OrderStatus::Ready => "Ready for Pickup",
            OrderStatus::Delivered => "Delivered",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.write_str(self.name())
    }
}

impl FromStr for OrderStatus {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> anyhow::Result<Self> {
        match OrderStatus::ALL.iter().find(|st| st.name() == s) {
            Some(st) => Ok(*st),
            None => bail!(
                "unknown status {:?}; expected pending, preparing, ready or delivered",
                s
            ),
        }
    }
}

impl Entity for Order {
    const PREFIX: &'static str = "order";
}

impl HasMeta for Order {
    fn meta(&self) -> &DocMeta<Self> {
        &self.meta
    }
    fn meta_mut(&mut self) -> &mut DocMeta<Self> {
        &mut self.meta
    }
}
