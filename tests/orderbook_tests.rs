//--------------------------------------------------------------------------------------------------
// TEST MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// Integration tests for the public order book API: placing orders, reading the book back,
// diagnostics, the single-writer worker and the Maslov simulation.
//--------------------------------------------------------------------------------------------------

use rust_decimal_macros::dec;

use maslov_lob::domain::services::simulation;
use maslov_lob::{
    BookError, CollectingSink, Diagnostic, Order, OrderBook, OrderBookWorker, PlaceOutcome, PriceBound, PriceLevel,
    QueueError, Side, SimulationConfig,
};

fn limit(price: i64, quantity: i64, time: u64) -> Order {
    Order::limit(price, quantity, time).unwrap()
}

fn market(quantity: i64, time: u64) -> Order {
    Order::market(quantity, time).unwrap()
}

/// Book with asks [(101, 3, t1), (102, 5, t2)].
fn two_ask_book() -> OrderBook {
    let mut book = OrderBook::new();
    book.place(limit(101, -3, 1)).unwrap();
    book.place(limit(102, -5, 2)).unwrap();
    book
}

fn ask_sizes(book: &OrderBook) -> Vec<(i64, u64)> {
    book.asks().iter().map(|o| (o.price, o.size())).collect()
}

#[test]
fn test_market_buy_larger_than_book_is_cancelled() {
    let mut book = two_ask_book();
    let outcome = book.place(market(10, 3)).unwrap();

    assert_eq!(outcome, PlaceOutcome::Cancelled { requested: 10, available: 8 });
    assert_eq!(ask_sizes(&book), vec![(101, 3), (102, 5)]);
    assert_eq!(book.market_price(), None);
    assert_eq!(book.history().len(), 3);
}

#[test]
fn test_market_buy_consumes_head_exactly() {
    let mut book = two_ask_book();
    let PlaceOutcome::Executed(execution) = book.place(market(3, 3)).unwrap() else {
        panic!("expected an execution");
    };

    assert_eq!(execution.price, 101);
    assert_eq!(execution.quantity, 3);
    assert_eq!(ask_sizes(&book), vec![(102, 5)]);
    assert_eq!(book.market_price(), Some(101));
}

#[test]
fn test_market_buy_partially_consumes_boundary_order() {
    let mut book = two_ask_book();
    let PlaceOutcome::Executed(execution) = book.place(market(5, 3)).unwrap() else {
        panic!("expected an execution");
    };

    assert_eq!(execution.price, 102);
    assert_eq!(execution.fills.len(), 2);
    assert_eq!(ask_sizes(&book), vec![(102, 3)]);
    assert_eq!(book.asks().head().unwrap().quantity(), -3);
    assert_eq!(book.asks().head().unwrap().time, 2);
    assert_eq!(book.market_price(), Some(102));
}

#[test]
fn test_limit_boundary_stops_walk() {
    let mut book = OrderBook::new();
    book.place(limit(100, -2, 1)).unwrap();
    book.place(limit(105, -4, 2)).unwrap();

    let outcome = book.place(limit(102, 5, 3)).unwrap();
    assert_eq!(outcome, PlaceOutcome::Cancelled { requested: 5, available: 2 });
    assert_eq!(ask_sizes(&book), vec![(100, 2), (105, 4)]);
    assert_eq!(book.best_bid(), PriceBound::NoBid);
}

#[test]
fn test_empty_book_market_order_cancelled() {
    let mut book = OrderBook::new();
    assert_eq!(book.best_bid(), PriceBound::NoBid);
    assert_eq!(book.best_ask(), PriceBound::NoAsk);

    let outcome = book.place(market(-4, 0)).unwrap();
    assert_eq!(outcome, PlaceOutcome::Cancelled { requested: 4, available: 0 });
    assert!(book.is_empty());

    let snapshot = book.history()[0];
    assert_eq!(snapshot.mid, None);
    assert_eq!(snapshot.market, None);
}

#[test]
fn test_price_time_priority() {
    let mut book = OrderBook::new();
    book.place(limit(99, 1, 1)).unwrap();
    book.place(limit(100, 2, 2)).unwrap();
    book.place(limit(99, 3, 3)).unwrap();
    book.place(limit(100, 4, 4)).unwrap();

    let bids: Vec<(i64, u64)> = book.bids().iter().map(|o| (o.price, o.time)).collect();
    assert_eq!(bids, vec![(100, 2), (100, 4), (99, 1), (99, 3)]);

    assert_eq!(
        book.depth(Side::Bid),
        vec![
            PriceLevel { price: 100, volume: 6, order_count: 2 },
            PriceLevel { price: 99, volume: 4, order_count: 2 },
        ]
    );
    assert!(book.depth(Side::Ask).is_empty());
}

#[test]
fn test_accessors_are_idempotent() {
    let mut book = two_ask_book();
    book.place(limit(98, 2, 3)).unwrap();

    let first = book.view();
    let second = book.view();
    assert_eq!(first, second);
    assert_eq!(book.best_ask(), book.best_ask());
    assert_eq!(book.snapshot(), book.snapshot());
    assert_eq!(book.history().len(), 3);
}

#[test]
fn test_stale_time_rejected_without_side_effects() {
    let mut book = two_ask_book();
    let before = book.view();

    let err = book.place(limit(90, 1, 2)).unwrap_err();
    assert_eq!(err, BookError::NonIncreasingTime { previous: 2, got: 2 });
    assert_eq!(book.view(), before);

    // The book keeps working after a rejected order
    assert_eq!(book.place(limit(90, 1, 3)).unwrap(), PlaceOutcome::Rested);
}

#[test]
fn test_mid_and_ranges() {
    let mut book = OrderBook::new();
    book.place(limit(99, 1, 1)).unwrap();
    book.place(limit(102, -1, 2)).unwrap();
    book.place(limit(95, 1, 3)).unwrap();

    assert_eq!(book.history()[0].mid, None);
    assert_eq!(book.history()[1].mid, Some(dec!(100.5)));
    assert_eq!(book.resting_range(), Some((95, 102)));

    book.place(market(-2, 4)).unwrap();
    assert_eq!(book.resting_range(), Some((102, 102)));
    assert_eq!(book.price_range(), Some((95, 102)));
    assert_eq!(book.market_price(), Some(95));
    assert_eq!(book.to_string(), "ask: 102 bid: -inf market: 95");
}

#[test]
fn test_cancellation_reaches_sink() {
    let sink = CollectingSink::new(10);
    let mut book = OrderBook::with_sink(Box::new(sink.clone()));
    book.place(limit(100, -1, 1)).unwrap();
    book.place(market(2, 2)).unwrap();

    let entries = sink.entries();
    assert_eq!(entries.len(), 1);
    let Diagnostic::Cancelled { order, requested, available } = entries[0];
    assert_eq!(order.time, 2);
    assert_eq!((requested, available), (2, 1));
}

#[test]
fn test_queue_rejects_wrong_side() {
    let book = OrderBook::new();
    let mut bids = book.bids().clone();
    let err = bids.add(limit(100, -1, 0)).unwrap_err();
    assert_eq!(err, QueueError::WrongSide { expected: Side::Bid, got: Side::Ask });
    assert!(bids.is_empty());
}

#[tokio::test]
async fn test_worker_round_trip() {
    let (client, handle) = OrderBookWorker::new(OrderBook::new()).start().unwrap();

    client.place(limit(101, -3, 1)).await.unwrap();
    client.place(limit(102, -5, 2)).await.unwrap();
    let (order, outcome) = client.submit(None, 5).await.unwrap();
    assert_eq!(order.time, 3);
    assert!(matches!(outcome, PlaceOutcome::Executed(ref e) if e.price == 102));

    let view = client.view();
    assert_eq!(view.market_price, Some(102));
    assert_eq!(view.asks.len(), 1);

    let book = client.shutdown().await.unwrap();
    handle.join().unwrap();
    assert_eq!(book.history().len(), 3);
}

#[test]
fn test_seeded_simulation_is_reproducible() {
    let config = SimulationConfig { steps: 300, seed: Some(2024), ..Default::default() };

    let mut first = OrderBook::new();
    let mut second = OrderBook::new();
    let a = simulation::run(&config, &mut first).unwrap();
    let b = simulation::run(&config, &mut second).unwrap();

    assert_eq!(a, b);
    assert_eq!(first.history(), second.history());
    assert_eq!(first.view(), second.view());
}
