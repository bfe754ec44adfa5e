use serde::Serialize;

use infra::ids::Id;

use super::models::{Order, OrderStatus};
use crate::catalog::CanteenId;

/// One stage on the progress bar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Step {
    pub status: OrderStatus,
    pub label: &'static str,
    pub completed: bool,
    pub current: bool,
}

/// What a customer sees while waiting for their order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tracking {
    pub order_id: Id<Order>,
    pub order_number: String,
    pub customer_name: String,
    pub canteen_id: CanteenId,
    pub total_amount: u64,
    pub status: OrderStatus,
    pub current_step: usize,
    /// Percentage through the lifecycle; 0 when placed, 100 once delivered.
    pub progress: u8,
    pub headline: &'static str,
    pub steps: Vec<Step>,
}

impl Tracking {
    pub fn of(order: &Order) -> Self {
        let current_step = OrderStatus::ALL
            .iter()
            .position(|st| *st == order.status)
            .unwrap_or(0);
        let last = OrderStatus::ALL.len() - 1;
        let steps = OrderStatus::ALL
            .iter()
            .enumerate()
            .map(|(idx, status)| Step {
                status: *status,
                label: status.label(),
                completed: idx <= current_step,
                current: idx == current_step,
            })
            .collect();

        Tracking {
            order_id: order.meta.id,
            order_number: order.order_number.clone(),
            customer_name: order.customer_name.clone(),
            canteen_id: order.canteen_id.clone(),
            total_amount: order.total_amount,
            status: order.status,
            current_step,
            progress: (current_step * 100 / last) as u8,
            headline: order.status.label(),
            steps,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.status == OrderStatus::Delivered
    }
}
