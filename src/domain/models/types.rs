//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// This module defines the value types shared by the order queues, the book and its collaborators.
//
// | Section            | Description                                                      |
// |--------------------|------------------------------------------------------------------|
// | ENUMS              | Side of an order, price bounds with infinite sentinels.          |
// | STRUCTS            | Incoming orders and the resting orders kept by a queue.          |
// | ERRORS             | Errors raised while constructing orders.                         |
// | TESTS              | Unit tests for the defined types.                                |
//--------------------------------------------------------------------------------------------------

//--------------------------------------------------------------------------------------------------
//  ENUMS
//--------------------------------------------------------------------------------------------------
// | Name          | Description                                         |
// |---------------|-----------------------------------------------------|
// | Side          | Buy (Bid) or sell (Ask), derived from quantity sign. |
// | PriceBound    | A price, or the "no bid" / "no ask" sentinel.        |
//--------------------------------------------------------------------------------------------------
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Represents the side of an order (Buy or Sell).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    /// A buy order, positive quantity.
    Bid,
    /// A sell order, negative quantity.
    Ask,
}

impl Side {
    pub fn opposite(&self) -> Self {
        match self {
            Self::Bid => Self::Ask,
            Self::Ask => Self::Bid,
        }
    }

    /// Sign carried by quantities on this side.
    #[inline]
    pub fn sign(&self) -> i64 {
        match self {
            Self::Bid => 1,
            Self::Ask => -1,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bid => write!(f, "buy"),
            Self::Ask => write!(f, "sell"),
        }
    }
}

/// Best-price value of one side of the book.
///
/// The variant order matters: the derived `Ord` places `NoBid` below every
/// finite price and `NoAsk` above every finite price, so crossing tests can
/// compare bounds directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PriceBound {
    /// Empty bid side (conceptually -inf).
    NoBid,
    /// A finite price.
    At(i64),
    /// Empty ask side (conceptually +inf).
    NoAsk,
}

impl PriceBound {
    /// Returns the finite price, if any.
    #[inline]
    pub fn price(&self) -> Option<i64> {
        match self {
            Self::At(price) => Some(*price),
            _ => None,
        }
    }

    #[inline]
    pub fn is_finite(&self) -> bool {
        matches!(self, Self::At(_))
    }
}

impl fmt::Display for PriceBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoBid => write!(f, "-inf"),
            Self::At(price) => write!(f, "{}", price),
            Self::NoAsk => write!(f, "+inf"),
        }
    }
}

//--------------------------------------------------------------------------------------------------
//  STRUCTS
//--------------------------------------------------------------------------------------------------
// | Name          | Description                                               |
// |---------------|-----------------------------------------------------------|
// | Order         | An incoming order: limit price or market, signed quantity. |
// | RestingOrder  | An order sitting in a queue; always carries a price.       |
//--------------------------------------------------------------------------------------------------

/// An incoming order.
///
/// The quantity is signed: positive for buys, negative for sells. It is never
/// zero, which is checked once in [`Order::new`], so the side derived from it
/// is always well defined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Order {
    /// Limit price; `None` for a market order.
    pub price: Option<i64>,
    /// Signed non-zero quantity.
    quantity: i64,
    /// Arrival sequence number, strictly increasing over a session.
    pub time: u64,
}

impl Order {
    /// Creates a new order.
    ///
    /// # Arguments
    /// * `price` - Limit price, or `None` for a market order
    /// * `quantity` - Signed quantity, positive to buy and negative to sell
    /// * `time` - Arrival sequence number
    ///
    /// # Returns
    /// * `Ok(Order)` - The order
    /// * `Err(OrderError::ZeroQuantity)` - If `quantity` is zero
    pub fn new(price: Option<i64>, quantity: i64, time: u64) -> Result<Self, OrderError> {
        if quantity == 0 {
            return Err(OrderError::ZeroQuantity);
        }
        Ok(Self { price, quantity, time })
    }

    /// Creates a limit order.
    pub fn limit(price: i64, quantity: i64, time: u64) -> Result<Self, OrderError> {
        Self::new(Some(price), quantity, time)
    }

    /// Creates a market order.
    pub fn market(quantity: i64, time: u64) -> Result<Self, OrderError> {
        Self::new(None, quantity, time)
    }

    #[inline]
    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    /// Unsigned size of the order.
    #[inline]
    pub fn size(&self) -> u64 {
        self.quantity.unsigned_abs()
    }

    #[inline]
    pub fn side(&self) -> Side {
        if self.quantity > 0 { Side::Bid } else { Side::Ask }
    }

    #[inline]
    pub fn is_market(&self) -> bool {
        self.price.is_none()
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.price {
            Some(price) => write!(f, "{} {} @ {} (t={})", self.side(), self.size(), price, self.time),
            None => write!(f, "{} {} @ market (t={})", self.side(), self.size(), self.time),
        }
    }
}

/// An order resting in a queue.
///
/// Only the quantity changes while the order rests, and only through
/// [`RestingOrder::reduce_to`] when a match partially consumes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestingOrder {
    pub price: i64,
    quantity: i64,
    pub time: u64,
}

impl RestingOrder {
    /// Converts an incoming limit order into a resting one.
    ///
    /// Returns `None` for market orders, which never rest.
    pub fn from_order(order: &Order) -> Option<Self> {
        order.price.map(|price| Self {
            price,
            quantity: order.quantity,
            time: order.time,
        })
    }

    #[inline]
    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    #[inline]
    pub fn size(&self) -> u64 {
        self.quantity.unsigned_abs()
    }

    #[inline]
    pub fn side(&self) -> Side {
        if self.quantity > 0 { Side::Bid } else { Side::Ask }
    }

    /// Replaces the remaining size, keeping the sign.
    pub(crate) fn reduce_to(&mut self, remaining: u64) {
        debug_assert!(remaining > 0 && remaining < self.size());
        self.quantity = self.side().sign() * remaining as i64;
    }
}

//--------------------------------------------------------------------------------------------------
//  ERRORS
//--------------------------------------------------------------------------------------------------

/// Errors raised while constructing an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum OrderError {
    /// Quantity must carry a side, so zero is rejected.
    #[error("Order quantity must be non-zero")]
    ZeroQuantity,
}
