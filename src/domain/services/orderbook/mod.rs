use thiserror::Error;

use crate::domain::models::types::Side;

pub mod depth;
pub mod history;
pub mod order_queue;
pub mod orderbook;
pub mod orderbook_worker;

/// Precondition failures of a single side queue.
///
/// These indicate a broken caller rather than a market condition: the book
/// never produces them when it routes orders itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum QueueError {
    /// The order belongs to the other side of the book
    #[error("Order is on the wrong side (expected {expected}, got {got})")]
    WrongSide {
        expected: Side,
        got: Side,
    },

    /// Market orders cannot rest in a queue
    #[error("Market orders cannot be added to a queue (no limit price)")]
    NoLimitPrice,

    /// Arrival times must strictly increase
    #[error("Order arrived at time {got}, not after the last queued time {last}")]
    StaleArrival {
        last: u64,
        got: u64,
    },
}

/// Errors returned by [`orderbook::OrderBook::place`].
///
/// All of them are precondition violations; the book state is left as it was
/// before the offending call and the caller is expected to stop submitting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BookError {
    /// The order does not arrive strictly after the previous one
    #[error("Order time {got} does not follow previous time {previous}")]
    NonIncreasingTime {
        previous: u64,
        got: u64,
    },

    /// A queue rejected the order
    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),
}
