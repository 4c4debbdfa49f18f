//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// Synthetic order flow following the Maslov model: each step draws a side, a kind (limit or
// market) and a size; limit prices sit a random distance away from the last traded price, on
// the passive side of it.
//
// | Component          | Description                                                |
// |--------------------|------------------------------------------------------------|
// | MaslovGenerator    | Seedable source of orders                                  |
// | SimulationReport   | Counts and final prices of a run                           |
// | run                | Drives an OrderBook for the configured number of steps     |
//--------------------------------------------------------------------------------------------------

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::{ConfigError, SimulationConfig};
use crate::domain::models::types::{Order, OrderError, PriceBound, Side};
use crate::domain::services::orderbook::BookError;
use crate::domain::services::orderbook::orderbook::{OrderBook, PlaceOutcome};

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Order(#[from] OrderError),

    #[error(transparent)]
    Book(#[from] BookError),

    #[error("No arrival time left after {last}")]
    TimeExhausted { last: u64 },
}

/// Random order source.
#[derive(Debug, Clone)]
pub struct MaslovGenerator {
    price0: i64,
    p_limit: f64,
    p_sell: f64,
    max_quantity: i64,
    max_delta_price: i64,
    rng: StdRng,
    /// `None` once an order has been stamped with `u64::MAX`
    next_time: Option<u64>,
}

impl MaslovGenerator {
    /// Builds a generator from a validated config, seeded from `config.seed`
    /// or from entropy.
    pub fn new(config: &SimulationConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self {
            price0: config.price0,
            p_limit: config.p_limit,
            p_sell: config.p_sell,
            max_quantity: config.max_quantity as i64,
            max_delta_price: config.max_delta_price as i64,
            rng,
            next_time: Some(0),
        })
    }

    /// Starts stamping orders at `time` instead of zero.
    pub fn starting_at(mut self, time: u64) -> Self {
        self.next_time = Some(time);
        self
    }

    /// Draws the next order.
    ///
    /// Limit prices are offset from `market_price`, or from the configured
    /// initial price before anything has traded: upward for sells and
    /// downward for buys.
    ///
    /// # Errors
    ///
    /// `TimeExhausted` once every arrival time up to `u64::MAX` has been used.
    pub fn next_order(&mut self, market_price: Option<i64>) -> Result<Order, SimulationError> {
        let time = self.next_time.ok_or(SimulationError::TimeExhausted { last: u64::MAX })?;
        let side = if self.rng.gen_bool(self.p_sell) { Side::Ask } else { Side::Bid };
        let is_limit = self.rng.gen_bool(self.p_limit);
        let quantity = self.rng.gen_range(1..=self.max_quantity) * side.sign();

        let price = if is_limit {
            let reference = market_price.unwrap_or(self.price0);
            let delta = self.rng.gen_range(1..=self.max_delta_price);
            Some(match side {
                Side::Ask => reference.saturating_add(delta),
                Side::Bid => reference.saturating_sub(delta),
            })
        } else {
            None
        };

        let order = Order::new(price, quantity, time)?;
        self.next_time = time.checked_add(1);
        Ok(order)
    }
}

/// Summary of a simulation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationReport {
    pub placed: u64,
    pub rested: u64,
    pub executed: u64,
    pub cancelled: u64,
    pub best_bid: Option<i64>,
    pub best_ask: Option<i64>,
    pub market_price: Option<i64>,
}

impl SimulationReport {
    fn record(&mut self, outcome: &PlaceOutcome) {
        self.placed += 1;
        match outcome {
            PlaceOutcome::Rested => self.rested += 1,
            PlaceOutcome::Executed(_) => self.executed += 1,
            PlaceOutcome::Cancelled { .. } => self.cancelled += 1,
        }
    }
}

/// Feeds `config.steps` generated orders into `book`, one at a time.
///
/// # Errors
///
/// Stops at the first precondition failure reported by the book.
pub fn run(config: &SimulationConfig, book: &mut OrderBook) -> Result<SimulationReport, SimulationError> {
    let start = match book.last_time() {
        Some(last) => last.checked_add(1).ok_or(SimulationError::TimeExhausted { last })?,
        None => 0,
    };
    let mut generator = MaslovGenerator::new(config)?.starting_at(start);
    let mut report = SimulationReport::default();

    info!("Running {} steps from price {}", config.steps, config.price0);
    for _ in 0..config.steps {
        let order = generator.next_order(book.market_price())?;
        let outcome = book.place(order)?;
        debug!("{} -> {:?}", order, outcome);
        report.record(&outcome);
    }

    report.best_bid = book.best_bid().price();
    report.best_ask = book.best_ask().price();
    report.market_price = book.market_price();
    info!(
        "Simulation finished: {} rested, {} executed, {} cancelled; {}",
        report.rested, report.executed, report.cancelled, book
    );
    Ok(report)
}

/// True if the book's best prices are not crossed.
pub fn is_uncrossed(book: &OrderBook) -> bool {
    match (book.best_bid(), book.best_ask()) {
        (bid @ PriceBound::At(_), ask @ PriceBound::At(_)) => bid < ask,
        _ => true,
    }
}
