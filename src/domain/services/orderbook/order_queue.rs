//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// This module implements one side of the limit order book: a dense queue of resting orders kept
// in price-time priority, and the all-or-nothing matching walk run against it.
//
// | Component     | Description                                                               |
// |---------------|---------------------------------------------------------------------------|
// | OrderQueue    | Resting orders of one side, best price first, FIFO within a price        |
// | MatchOutcome  | Either a full execution or the liquidity that was available               |
// | Execution     | Trade price, size and per-maker fills of a successful match               |
//
//--------------------------------------------------------------------------------------------------
// FUNCTIONS
//--------------------------------------------------------------------------------------------------
// | Name                  | Description                               | Return Type                      |
// |-----------------------|-------------------------------------------|----------------------------------|
// | add                   | Inserts a non-marketable order            | Result<(), QueueError>           |
// | match_order           | Consumes liquidity for an incoming order  | Result<MatchOutcome, QueueError> |
// | best_price            | Price at the head of the queue            | Option<i64>                      |
// | available_within      | Liquidity inside an optional limit        | u64                              |
//--------------------------------------------------------------------------------------------------

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::models::types::{Order, RestingOrder, Side};

use super::QueueError;

/// Part of an execution taken from a single resting order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fill {
    /// Arrival time of the resting (maker) order.
    pub maker_time: u64,
    pub price: i64,
    pub quantity: u64,
}

/// A successful match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Execution {
    /// Price of the last resting order touched; this becomes the market price.
    pub price: i64,
    /// Total size executed, always the full incoming size.
    pub quantity: u64,
    /// Fills in the order they were taken.
    pub fills: Vec<Fill>,
}

/// Result of walking a queue for an incoming order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome {
    /// The full incoming size was executed.
    Filled(Execution),
    /// Not enough liquidity inside the incoming limit; nothing was touched.
    Insufficient { requested: u64, available: u64 },
}

/// Resting orders of one side of the book in price-time priority.
///
/// Bids are kept by price descending and asks by price ascending; orders at
/// the same price keep their arrival order. The queue is a dense `VecDeque`:
/// insertion shifts elements, matching drains from the front and at most one
/// order (the boundary order) is updated in place.
#[derive(Debug, Clone)]
pub struct OrderQueue {
    side: Side,
    orders: VecDeque<RestingOrder>,
    /// Time of the latest order ever added; never decreases.
    last_time: Option<u64>,
}

impl OrderQueue {
    /// Creates an empty queue for `side`.
    pub fn new(side: Side) -> Self {
        Self {
            side,
            orders: VecDeque::with_capacity(64),
            last_time: None,
        }
    }

    #[inline]
    pub fn side(&self) -> Side {
        self.side
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.orders.len()
    }

    /// Returns the order with the best priority.
    #[inline]
    pub fn head(&self) -> Option<&RestingOrder> {
        self.orders.front()
    }

    #[inline]
    pub fn best_price(&self) -> Option<i64> {
        self.orders.front().map(|order| order.price)
    }

    pub fn get(&self, index: usize) -> Option<&RestingOrder> {
        self.orders.get(index)
    }

    /// Iterates resting orders from best to worst priority.
    pub fn iter(&self) -> impl Iterator<Item = &RestingOrder> + '_ {
        self.orders.iter()
    }

    /// Total resting size, saturating at `u64::MAX`.
    pub fn volume(&self) -> u64 {
        self.orders.iter().fold(0, |total, order| total.saturating_add(order.size()))
    }

    /// True if a resting order at `resting_price` is acceptable to an
    /// incoming order limited at `limit`.
    #[inline]
    fn within_limit(&self, resting_price: i64, limit: i64) -> bool {
        match self.side {
            // incoming sell: do not hit bids below its limit
            Side::Bid => resting_price >= limit,
            // incoming buy: do not lift asks above its limit
            Side::Ask => resting_price <= limit,
        }
    }

    /// Liquidity an incoming order limited at `limit` could reach.
    /// `None` means a market order with no limit.
    pub fn available_within(&self, limit: Option<i64>) -> u64 {
        self.orders
            .iter()
            .take_while(|order| limit.is_none_or(|limit| self.within_limit(order.price, limit)))
            .fold(0, |total, order| total.saturating_add(order.size()))
    }

    /// Adds a non-marketable order in price-time priority.
    ///
    /// The insertion point is the first resting order with a strictly worse
    /// price, so an order that ties existing prices lands behind them.
    ///
    /// # Arguments
    /// * `order` - A limit order of this queue's side
    ///
    /// # Returns
    /// * `Ok(())` - If the order was inserted
    /// * `Err(QueueError)` - If the order is on the wrong side, has no limit
    ///   price, or arrives no later than an order already added
    pub fn add(&mut self, order: Order) -> Result<(), QueueError> {
        if order.side() != self.side {
            return Err(QueueError::WrongSide {
                expected: self.side,
                got: order.side(),
            });
        }
        let resting = RestingOrder::from_order(&order).ok_or(QueueError::NoLimitPrice)?;
        if let Some(last) = self.last_time {
            if resting.time <= last {
                return Err(QueueError::StaleArrival { last, got: resting.time });
            }
        }

        // the queue is sorted, so "first strictly worse price" is a partition point
        let index = match self.side {
            Side::Bid => self.orders.partition_point(|o| o.price >= resting.price),
            Side::Ask => self.orders.partition_point(|o| o.price <= resting.price),
        };
        self.orders.insert(index, resting);
        self.last_time = Some(resting.time);

        debug!("Order queued: {} at index {} of {} {}s", order, index, self.orders.len(), self.side);
        Ok(())
    }

    /// Matches an incoming order of the opposite side against this queue.
    ///
    /// The walk accumulates resting sizes from the head, stopping before the
    /// first order outside the incoming limit, until the incoming size is
    /// covered. If it cannot be covered the queue is left untouched and
    /// [`MatchOutcome::Insufficient`] is returned; partial fills are never
    /// granted. Otherwise every order before the boundary order is removed and
    /// the boundary order keeps whatever it has left over.
    ///
    /// # Arguments
    /// * `incoming` - An order whose side is opposite to this queue's
    ///
    /// # Returns
    /// * `Ok(MatchOutcome::Filled)` - With the boundary order's price as trade price
    /// * `Ok(MatchOutcome::Insufficient)` - If liquidity within the limit is short
    /// * `Err(QueueError::WrongSide)` - If `incoming` is on this queue's side
    pub fn match_order(&mut self, incoming: &Order) -> Result<MatchOutcome, QueueError> {
        if incoming.side() != self.side.opposite() {
            return Err(QueueError::WrongSide {
                expected: self.side.opposite(),
                got: incoming.side(),
            });
        }

        let target = incoming.size();
        let mut matched = 0u64;
        let mut boundary = None;
        for (index, resting) in self.orders.iter().enumerate() {
            if let Some(limit) = incoming.price {
                if !self.within_limit(resting.price, limit) {
                    break;
                }
            }
            matched += resting.size();
            if matched >= target {
                boundary = Some(index);
                break;
            }
        }

        let Some(boundary) = boundary else {
            debug!("Insufficient liquidity for {}: {} of {} available", incoming, matched, target);
            return Ok(MatchOutcome::Insufficient {
                requested: target,
                available: matched,
            });
        };

        let remainder = matched - target;
        let mut fills = Vec::with_capacity(boundary + 1);
        fills.extend(self.orders.drain(..boundary).map(|resting| Fill {
            maker_time: resting.time,
            price: resting.price,
            quantity: resting.size(),
        }));

        // the boundary order is now at the head
        let head = self.orders[0];
        fills.push(Fill {
            maker_time: head.time,
            price: head.price,
            quantity: head.size() - remainder,
        });
        if remainder == 0 {
            self.orders.pop_front();
        } else {
            self.orders[0].reduce_to(remainder);
        }

        debug!("Matched {} against {} resting {}s, last price {}", incoming, fills.len(), self.side, head.price);
        Ok(MatchOutcome::Filled(Execution {
            price: head.price,
            quantity: target,
            fills,
        }))
    }
}
