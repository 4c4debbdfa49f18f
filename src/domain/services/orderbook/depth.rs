//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// Aggregated depth view of one side of the book, used to draw depth bars.
//
// | Component       | Description                                                |
// |-----------------|------------------------------------------------------------|
// | PriceLevel      | Aggregated volume information at a specific price          |
// | aggregate       | Folds a priority-ordered queue into price levels           |
//--------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::domain::models::types::RestingOrder;

/// Represents an aggregated price level in the depth view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceLevel {
    /// The price for this level
    pub price: i64,
    /// Total volume at this price level
    pub volume: u64,
    /// Number of orders at this price level
    pub order_count: u32,
}

impl PriceLevel {
    #[inline]
    fn from_order(order: &RestingOrder) -> Self {
        Self {
            price: order.price,
            volume: order.size(),
            order_count: 1,
        }
    }
}

/// Folds resting orders into price levels.
///
/// Orders of one price are contiguous in a queue, so this is a single pass
/// and the levels come out in the queue's priority order.
pub fn aggregate<'a>(orders: impl IntoIterator<Item = &'a RestingOrder>) -> Vec<PriceLevel> {
    let mut levels: Vec<PriceLevel> = Vec::new();
    for order in orders {
        match levels.last_mut() {
            Some(level) if level.price == order.price => {
                level.volume = level.volume.saturating_add(order.size());
                level.order_count = level.order_count.saturating_add(1);
            }
            _ => levels.push(PriceLevel::from_order(order)),
        }
    }
    levels
}
