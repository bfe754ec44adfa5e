use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::models::Order;

/// How many best sellers the statistics report.
pub const TOP_ITEMS: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStats {
    pub total_orders: usize,
    pub total_revenue: u64,
    pub top_items: Vec<TopItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopItem {
    pub name: String,
    pub count: u64,
}

impl OrderStats {
    /// Items are grouped by the name captured on each order line. Equal
    /// counts keep the order in which their names were first seen.
    pub fn of<'a, I>(orders: I) -> Self
    where
        I: IntoIterator<Item = &'a Order>,
    {
        let mut stats = OrderStats::default();
        let mut seen: HashMap<&str, usize> = HashMap::new();
        let mut counts: Vec<TopItem> = Vec::new();

        for order in orders {
            stats.total_orders += 1;
            stats.total_revenue = stats.total_revenue.saturating_add(order.total_amount);
            for line in order.items.iter() {
                let idx = *seen.entry(line.name.as_str()).or_insert_with(|| {
                    counts.push(TopItem {
                        name: line.name.clone(),
                        count: 0,
                    });
                    counts.len() - 1
                });
                counts[idx].count = counts[idx].count.saturating_add(u64::from(line.quantity));
            }
        }

        counts.sort_by(|a, b| b.count.cmp(&a.count));
        counts.truncate(TOP_ITEMS);
        stats.top_items = counts;
        stats
    }
}
