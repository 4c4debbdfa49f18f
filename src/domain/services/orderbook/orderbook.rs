//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// This module implements a limit order book for a single trading instrument.
// It routes every incoming order either to the opposite queue (marketable) or to its own queue
// (non-marketable) and records the resulting prices after each order.
//
// | Component     | Description                                                               |
// |---------------|---------------------------------------------------------------------------|
// | OrderBook     | Owns the bid and ask queues, market price and snapshot history            |
// | PlaceOutcome  | What happened to a placed order: rested, executed or cancelled            |
// | BookView      | Owned read-only copy of the book state for readers on other threads       |
//
//--------------------------------------------------------------------------------------------------
// FUNCTIONS
//--------------------------------------------------------------------------------------------------
// | Name                  | Description                               | Return Type                     |
// |-----------------------|-------------------------------------------|---------------------------------|
// | new / with_sink       | Creates an empty OrderBook                | OrderBook                       |
// | place                 | Processes one incoming order              | Result<PlaceOutcome, BookError> |
// | is_marketable         | Crossing test for an order                | bool                            |
// | best_bid / best_ask   | Head prices or the empty-side sentinels   | PriceBound                      |
// | market_price          | Price of the most recent execution        | Option<i64>                     |
// | depth                 | Aggregated levels of one side             | Vec<PriceLevel>                 |
// | history               | Snapshots taken after each order          | &[Snapshot]                     |
//
//--------------------------------------------------------------------------------------------------
// TESTS
//--------------------------------------------------------------------------------------------------
// | Name                              | Description                                          |
// |-----------------------------------|------------------------------------------------------|
// | test_empty_orderbook              | Sentinels and empty state                            |
// | test_resting_orders_set_spread    | Non-marketable orders rest on their own side         |
// | test_price_range_after_matches    | Observed range keeps prices matched away             |
// | test_crossing_limit_executes      | Marketable limit orders hit the opposite side        |
// | test_insufficient_liquidity       | Cancellation leaves the book unchanged               |
// | test_non_increasing_time          | Arrival times must strictly increase                 |
// | test_history_snapshots            | One snapshot per placed order                        |
//--------------------------------------------------------------------------------------------------

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::models::types::{Order, PriceBound, RestingOrder, Side};
use crate::domain::services::diagnostics::{Diagnostic, DiagnosticSink, NoopSink, sink_for};

use super::BookError;
use super::depth::{self, PriceLevel};
use super::history::Snapshot;
use super::order_queue::{Execution, MatchOutcome, OrderQueue};

/// What `place` did with an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaceOutcome {
    /// The order was not marketable and now rests on its own side.
    Rested,
    /// The order was marketable and fully executed.
    Executed(Execution),
    /// The order was marketable but the liquidity within its limit was short,
    /// so it was dropped without touching the book.
    Cancelled { requested: u64, available: u64 },
}

/// Owned copy of the observable book state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookView {
    pub best_bid: PriceBound,
    pub best_ask: PriceBound,
    pub market_price: Option<i64>,
    /// Bids from best to worst priority
    pub bids: Vec<RestingOrder>,
    /// Asks from best to worst priority
    pub asks: Vec<RestingOrder>,
    pub last_snapshot: Option<Snapshot>,
    pub orders_placed: usize,
}

/// A single-instrument limit order book with price-time priority.
///
/// Orders are processed strictly one at a time. Marketable orders are matched
/// all-or-nothing against the opposite queue; everything else rests. Because
/// every order that would cross is matched or dropped, the book is never left
/// crossed.
#[derive(Debug)]
pub struct OrderBook {
    /// Buy side, highest price first
    bids: OrderQueue,
    /// Sell side, lowest price first
    asks: OrderQueue,
    market_price: Option<i64>,
    /// Arrival time of the last accepted order
    last_time: Option<u64>,
    /// Lowest and highest price that ever rested
    price_range: Option<(i64, i64)>,
    history: Vec<Snapshot>,
    sink: Box<dyn DiagnosticSink>,
}

impl Default for OrderBook {
    fn default() -> Self {
        Self::new()
    }
}

impl OrderBook {
    /// Creates an empty book that discards diagnostics.
    pub fn new() -> Self {
        Self::with_sink(Box::new(NoopSink))
    }

    /// Creates an empty book that logs cancellations when `verbose` is set.
    pub fn verbose(verbose: bool) -> Self {
        Self::with_sink(sink_for(verbose))
    }

    /// Creates an empty book reporting to `sink`.
    pub fn with_sink(sink: Box<dyn DiagnosticSink>) -> Self {
        Self {
            bids: OrderQueue::new(Side::Bid),
            asks: OrderQueue::new(Side::Ask),
            market_price: None,
            last_time: None,
            price_range: None,
            history: Vec::new(),
            sink,
        }
    }

    /// Processes an incoming order.
    ///
    /// # Order Processing Flow
    ///
    /// 1. Rejects orders that do not arrive strictly after the previous one
    /// 2. Marketable orders are matched against the opposite queue; on success
    ///    the market price moves to the trade price, on failure the order is
    ///    dropped and reported to the diagnostic sink
    /// 3. Other orders rest on their own side
    /// 4. A snapshot of bid, ask, mid and market price is appended to history
    ///
    /// # Errors
    ///
    /// Returns `BookError` for precondition violations only. The book is left
    /// as it was and no snapshot is recorded.
    pub fn place(&mut self, order: Order) -> Result<PlaceOutcome, BookError> {
        if let Some(previous) = self.last_time {
            if order.time <= previous {
                return Err(BookError::NonIncreasingTime { previous, got: order.time });
            }
        }

        let outcome = match (self.is_marketable(&order), order.price) {
            (false, Some(price)) => self.rest(order, price)?,
            _ => self.execute(order)?,
        };

        self.last_time = Some(order.time);
        self.history.push(self.snapshot());
        Ok(outcome)
    }

    /// Crossing test.
    ///
    /// An order is marketable if it has no limit price, or if it is a buy at
    /// or above the best ask, or a sell at or below the best bid.
    pub fn is_marketable(&self, order: &Order) -> bool {
        match (order.price, order.side()) {
            (None, _) => true,
            (Some(price), Side::Bid) => PriceBound::At(price) >= self.best_ask(),
            (Some(price), Side::Ask) => PriceBound::At(price) <= self.best_bid(),
        }
    }

    fn execute(&mut self, order: Order) -> Result<PlaceOutcome, BookError> {
        assert!(self.is_marketable(&order), "execute called with non-marketable order {}", order);

        let queue = match order.side() {
            Side::Bid => &mut self.asks,
            Side::Ask => &mut self.bids,
        };
        assert_eq!(queue.side(), order.side().opposite());

        match queue.match_order(&order)? {
            MatchOutcome::Filled(execution) => {
                debug!("Order executed: {} at {}", order, execution.price);
                self.market_price = Some(execution.price);
                Ok(PlaceOutcome::Executed(execution))
            }
            MatchOutcome::Insufficient { requested, available } => {
                self.sink.report(&Diagnostic::Cancelled { order, requested, available });
                Ok(PlaceOutcome::Cancelled { requested, available })
            }
        }
    }

    fn rest(&mut self, order: Order, price: i64) -> Result<PlaceOutcome, BookError> {
        let queue = match order.side() {
            Side::Bid => {
                assert!(PriceBound::At(price) < self.best_ask(), "resting bid {} would cross", order);
                &mut self.bids
            }
            Side::Ask => {
                assert!(PriceBound::At(price) > self.best_bid(), "resting ask {} would cross", order);
                &mut self.asks
            }
        };
        assert_eq!(queue.side(), order.side());
        queue.add(order)?;

        self.price_range = Some(match self.price_range {
            Some((low, high)) => (low.min(price), high.max(price)),
            None => (price, price),
        });
        Ok(PlaceOutcome::Rested)
    }

    /// Best bid, or `PriceBound::NoBid` when the bid side is empty.
    #[inline]
    pub fn best_bid(&self) -> PriceBound {
        self.bids.best_price().map_or(PriceBound::NoBid, PriceBound::At)
    }

    /// Best ask, or `PriceBound::NoAsk` when the ask side is empty.
    #[inline]
    pub fn best_ask(&self) -> PriceBound {
        self.asks.best_price().map_or(PriceBound::NoAsk, PriceBound::At)
    }

    /// Price of the most recent execution; `None` until something trades.
    #[inline]
    pub fn market_price(&self) -> Option<i64> {
        self.market_price
    }

    /// True when neither side has resting orders.
    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }

    pub fn bids(&self) -> &OrderQueue {
        &self.bids
    }

    pub fn asks(&self) -> &OrderQueue {
        &self.asks
    }

    /// Returns the queue holding `side`.
    pub fn queue(&self, side: Side) -> &OrderQueue {
        match side {
            Side::Bid => &self.bids,
            Side::Ask => &self.asks,
        }
    }

    /// Aggregated price levels of one side, best price first.
    pub fn depth(&self, side: Side) -> Vec<PriceLevel> {
        depth::aggregate(self.queue(side).iter())
    }

    /// Lowest and highest price that has ever rested in the book.
    pub fn price_range(&self) -> Option<(i64, i64)> {
        self.price_range
    }

    /// Lowest and highest price currently resting, across both sides.
    pub fn resting_range(&self) -> Option<(i64, i64)> {
        let low = self.bids.iter().last().or(self.asks.head()).map(|o| o.price)?;
        let high = self.asks.iter().last().or(self.bids.head()).map(|o| o.price)?;
        Some((low, high))
    }

    /// Arrival time of the last accepted order.
    pub fn last_time(&self) -> Option<u64> {
        self.last_time
    }

    /// Snapshots recorded after each placed order, oldest first.
    pub fn history(&self) -> &[Snapshot] {
        &self.history
    }

    /// Current prices as a snapshot, without recording it.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::capture(self.best_bid(), self.best_ask(), self.market_price)
    }

    /// Owned copy of the observable state.
    pub fn view(&self) -> BookView {
        BookView {
            best_bid: self.best_bid(),
            best_ask: self.best_ask(),
            market_price: self.market_price,
            bids: self.bids.iter().copied().collect(),
            asks: self.asks.iter().copied().collect(),
            last_snapshot: self.history.last().copied(),
            orders_placed: self.history.len(),
        }
    }
}

impl fmt::Display for OrderBook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ask: {} bid: {} market: ", self.best_ask(), self.best_bid())?;
        match self.market_price {
            Some(price) => write!(f, "{}", price),
            None => write!(f, "none"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::services::diagnostics::CollectingSink;
    use rust_decimal_macros::dec;

    fn limit(price: i64, quantity: i64, time: u64) -> Order {
        Order::limit(price, quantity, time).unwrap()
    }

    fn market(quantity: i64, time: u64) -> Order {
        Order::market(quantity, time).unwrap()
    }

    /// Tests that a new orderbook is properly initialized empty.
    #[test]
    fn test_empty_orderbook() {
        let book = OrderBook::new();

        assert!(book.is_empty());
        assert_eq!(book.best_bid(), PriceBound::NoBid);
        assert_eq!(book.best_ask(), PriceBound::NoAsk);
        assert_eq!(book.market_price(), None);
        assert_eq!(book.resting_range(), None);
        assert!(book.history().is_empty());
        assert!(book.is_marketable(&market(1, 0)));
        assert!(!book.is_marketable(&limit(100, 1, 0)));
        assert!(!book.is_marketable(&limit(100, -1, 0)));
    }

    #[test]
    fn test_resting_orders_set_spread() {
        let mut book = OrderBook::new();
        assert_eq!(book.place(limit(99, 2, 1)).unwrap(), PlaceOutcome::Rested);
        assert_eq!(book.place(limit(102, -3, 2)).unwrap(), PlaceOutcome::Rested);
        assert_eq!(book.place(limit(100, 1, 3)).unwrap(), PlaceOutcome::Rested);

        assert_eq!(book.best_bid(), PriceBound::At(100));
        assert_eq!(book.best_ask(), PriceBound::At(102));
        assert_eq!(book.price_range(), Some((99, 102)));
        assert_eq!(book.resting_range(), Some((99, 102)));
        assert_eq!(book.to_string(), "ask: 102 bid: 100 market: none");
    }

    #[test]
    fn test_price_range_after_matches() {
        let mut book = OrderBook::new();
        book.place(limit(95, 1, 1)).unwrap();
        book.place(limit(98, 2, 2)).unwrap();
        book.place(limit(104, -1, 3)).unwrap();
        book.place(limit(110, -1, 4)).unwrap();
        assert_eq!(book.price_range(), Some((95, 110)));

        // clear the outer levels: sweep both bids, then both asks
        assert!(matches!(book.place(market(-3, 5)).unwrap(), PlaceOutcome::Executed(_)));
        assert!(matches!(book.place(market(2, 6)).unwrap(), PlaceOutcome::Executed(_)));
        assert!(book.is_empty());
        assert_eq!(book.resting_range(), None);
        assert_eq!(book.price_range(), Some((95, 110)));

        book.place(limit(100, 1, 7)).unwrap();
        assert_eq!(book.resting_range(), Some((100, 100)));
        assert_eq!(book.price_range(), Some((95, 110)));
    }

    #[test]
    fn test_crossing_limit_executes() {
        let mut book = OrderBook::new();
        book.place(limit(101, -3, 1)).unwrap();
        book.place(limit(102, -5, 2)).unwrap();

        // a buy priced at the best ask is marketable
        let outcome = book.place(limit(102, 5, 3)).unwrap();
        let PlaceOutcome::Executed(execution) = outcome else {
            panic!("Expected execution, got {:?}", outcome);
        };
        assert_eq!(execution.price, 102);
        assert_eq!(book.market_price(), Some(102));
        assert_eq!(book.best_ask(), PriceBound::At(102));
        assert_eq!(book.asks().head().unwrap().quantity(), -3);
        assert_eq!(book.best_bid(), PriceBound::NoBid);
    }

    #[test]
    fn test_sell_at_best_bid_executes() {
        let mut book = OrderBook::new();
        book.place(limit(100, 4, 1)).unwrap();

        let outcome = book.place(limit(100, -4, 2)).unwrap();
        assert!(matches!(outcome, PlaceOutcome::Executed(Execution { price: 100, quantity: 4, .. })));
        assert!(book.is_empty());
        assert_eq!(book.market_price(), Some(100));
    }

    #[test]
    fn test_insufficient_liquidity() {
        let sink = CollectingSink::new(16);
        let mut book = OrderBook::with_sink(Box::new(sink.clone()));
        book.place(limit(100, -2, 1)).unwrap();
        book.place(limit(105, -4, 2)).unwrap();
        let before = book.view();

        let outcome = book.place(limit(102, 5, 3)).unwrap();
        assert_eq!(outcome, PlaceOutcome::Cancelled { requested: 5, available: 2 });
        assert_eq!(book.asks().volume(), 6);
        assert_eq!(book.market_price(), None);
        assert_eq!(book.view().asks, before.asks);
        assert_eq!(sink.entries().len(), 1);
        assert!(matches!(
            sink.entries()[0],
            Diagnostic::Cancelled { requested: 5, available: 2, .. }
        ));
    }

    #[test]
    fn test_market_order_on_empty_side_cancelled() {
        let mut book = OrderBook::new();
        let outcome = book.place(market(-3, 1)).unwrap();

        assert_eq!(outcome, PlaceOutcome::Cancelled { requested: 3, available: 0 });
        assert!(book.is_empty());
        assert_eq!(book.history().len(), 1);
    }

    #[test]
    fn test_non_increasing_time() {
        let mut book = OrderBook::new();
        book.place(limit(100, 1, 5)).unwrap();

        let err = book.place(limit(99, 1, 5)).unwrap_err();
        assert_eq!(err, BookError::NonIncreasingTime { previous: 5, got: 5 });
        let err = book.place(market(-1, 3)).unwrap_err();
        assert_eq!(err, BookError::NonIncreasingTime { previous: 5, got: 3 });

        assert_eq!(book.bids().len(), 1);
        assert_eq!(book.history().len(), 1);
    }

    #[test]
    fn test_history_snapshots() {
        let mut book = OrderBook::new();
        book.place(limit(99, 2, 1)).unwrap();
        book.place(limit(102, -2, 2)).unwrap();
        book.place(market(1, 3)).unwrap();

        let history = book.history();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0], Snapshot::capture(PriceBound::At(99), PriceBound::NoAsk, None));
        assert_eq!(history[1].mid, Some(dec!(100.5)));
        assert_eq!(history[2].market, Some(102));
        assert_eq!(history[2].ask, PriceBound::At(102));
    }

    #[test]
    fn test_accessors_are_idempotent() {
        let mut book = OrderBook::new();
        book.place(limit(99, 2, 1)).unwrap();
        book.place(limit(103, -2, 2)).unwrap();

        let first = book.view();
        let second = book.view();
        assert_eq!(first, second);
        assert_eq!(book.best_bid(), book.best_bid());
        assert_eq!(book.depth(Side::Ask), book.depth(Side::Ask));
    }

    #[test]
    fn test_depth_by_side() {
        let mut book = OrderBook::new();
        book.place(limit(105, -1, 1)).unwrap();
        book.place(limit(104, -2, 2)).unwrap();
        book.place(limit(104, -2, 3)).unwrap();

        let depth = book.depth(Side::Ask);
        assert_eq!(depth.len(), 2);
        assert_eq!(depth[0], PriceLevel { price: 104, volume: 4, order_count: 2 });
        assert!(book.depth(Side::Bid).is_empty());
    }
}
