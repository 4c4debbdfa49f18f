//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// This module implements a thread worker that owns an OrderBook and serializes every order sent
// to it. Any number of producers may hold a client; the book itself still sees exactly one
// order at a time, in the order the worker receives them.
//
// | Component           | Description                                                 |
// |---------------------|-------------------------------------------------------------|
// | OrderBookWorker     | Worker thread managing operations on an OrderBook           |
// | OrderBookClient     | Client interface to interact with the worker                |
// | OrderBookCommand    | Commands sent to the worker                                 |
// | WorkerError         | Errors seen by clients                                      |
//
//--------------------------------------------------------------------------------------------------
// STRUCTS
//--------------------------------------------------------------------------------------------------
// | Name               | Description                                       | Key Methods         |
// |--------------------|---------------------------------------------------|---------------------|
// | OrderBookWorker    | Worker thread managing OrderBook                  | start               |
// |                    |                                                   | run                 |
// |--------------------|---------------------------------------------------|---------------------|
// | OrderBookClient    | Client interface to worker                        | place               |
// |                    |                                                   | submit              |
// |                    |                                                   | view                |
// |                    |                                                   | shutdown            |
//--------------------------------------------------------------------------------------------------

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::RwLock;
use thiserror::Error;
use tokio::sync::mpsc::{self, Receiver, Sender};
use tokio::sync::oneshot;
use tracing::{debug, info};

use crate::domain::models::types::{Order, OrderError};

use super::BookError;
use super::orderbook::{BookView, OrderBook, PlaceOutcome};

/// Capacity of the command channel.
const COMMAND_CAPACITY: usize = 1000;

/// Errors returned to worker clients.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// The worker has stopped and no longer accepts commands
    #[error("OrderBookWorker channel closed")]
    ChannelClosed,

    /// The worker dropped the command without answering
    #[error("Failed to receive response from OrderBookWorker")]
    NoResponse,

    /// The worker thread could not be spawned
    #[error("Failed to spawn OrderBookWorker thread: {0}")]
    Spawn(#[from] std::io::Error),

    /// The book rejected the order
    #[error(transparent)]
    Book(#[from] BookError),

    /// The submitted values do not form a valid order
    #[error(transparent)]
    Order(#[from] OrderError),

    /// The book has already accepted an order at `u64::MAX`
    #[error("No arrival time left after {last}")]
    TimeExhausted { last: u64 },
}

/// Commands that can be sent to the OrderBookWorker
#[derive(Debug)]
enum OrderBookCommand {
    /// Place an order stamped by the caller
    Place {
        order: Order,
        response_tx: oneshot::Sender<Result<PlaceOutcome, BookError>>,
    },

    /// Place an order stamped by the worker with the next arrival time
    Submit {
        price: Option<i64>,
        quantity: i64,
        response_tx: oneshot::Sender<Result<(Order, PlaceOutcome), WorkerError>>,
    },

    /// Stop the worker and hand the book back
    Shutdown {
        response_tx: oneshot::Sender<OrderBook>,
    },
}

/// Worker thread that processes order book operations
pub struct OrderBookWorker {
    /// The order book being managed by this worker
    order_book: OrderBook,

    /// Latest view, published after every command
    view: Arc<RwLock<BookView>>,
}

impl OrderBookWorker {
    /// Creates a worker around an existing book.
    pub fn new(order_book: OrderBook) -> Self {
        let view = Arc::new(RwLock::new(order_book.view()));
        Self { order_book, view }
    }

    /// Starts the worker thread and returns a client to interact with it.
    ///
    /// # Returns
    /// A client that can be used to send commands to this worker, and the
    /// thread handle. The thread exits on `shutdown` or once every client
    /// has been dropped.
    pub fn start(self) -> Result<(OrderBookClient, JoinHandle<()>), WorkerError> {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CAPACITY);
        let client = OrderBookClient {
            command_tx,
            view: Arc::clone(&self.view),
        };

        let handle = thread::Builder::new()
            .name("orderbook-worker".to_string())
            .spawn(move || self.run(command_rx))?;

        Ok((client, handle))
    }

    /// Main worker loop that processes commands
    fn run(mut self, mut command_rx: Receiver<OrderBookCommand>) {
        info!("OrderBookWorker started");
        while let Some(command) = command_rx.blocking_recv() {
            match command {
                OrderBookCommand::Place { order, response_tx } => {
                    let result = self.order_book.place(order);
                    self.publish();
                    let _ = response_tx.send(result);
                }

                OrderBookCommand::Submit { price, quantity, response_tx } => {
                    let result = self.submit(price, quantity);
                    self.publish();
                    let _ = response_tx.send(result);
                }

                OrderBookCommand::Shutdown { response_tx } => {
                    info!("OrderBookWorker shutting down after {} orders", self.order_book.history().len());
                    let _ = response_tx.send(self.order_book);
                    return;
                }
            }
        }
        debug!("All OrderBookClients dropped, worker exiting");
    }

    /// Stamps an order with the next arrival time and places it.
    fn submit(&mut self, price: Option<i64>, quantity: i64) -> Result<(Order, PlaceOutcome), WorkerError> {
        let time = match self.order_book.last_time() {
            Some(last) => last.checked_add(1).ok_or(WorkerError::TimeExhausted { last })?,
            None => 0,
        };
        let order = Order::new(price, quantity, time)?;
        let outcome = self.order_book.place(order)?;
        Ok((order, outcome))
    }

    fn publish(&self) {
        *self.view.write() = self.order_book.view();
    }
}

/// Client interface to interact with the OrderBookWorker
#[derive(Clone)]
pub struct OrderBookClient {
    command_tx: Sender<OrderBookCommand>,
    view: Arc<RwLock<BookView>>,
}

impl OrderBookClient {
    /// Places an order whose arrival time the caller has assigned.
    ///
    /// # Returns
    /// The outcome, or the book's precondition error
    pub async fn place(&self, order: Order) -> Result<PlaceOutcome, WorkerError> {
        let (response_tx, response_rx) = oneshot::channel();
        self.command_tx
            .send(OrderBookCommand::Place { order, response_tx })
            .await
            .map_err(|_| WorkerError::ChannelClosed)?;

        Ok(response_rx.await.map_err(|_| WorkerError::NoResponse)??)
    }

    /// Submits an order and lets the worker assign its arrival time.
    ///
    /// Use this when several producers share the book: times then follow
    /// the order in which the worker receives submissions.
    ///
    /// # Returns
    /// The stamped order and its outcome
    pub async fn submit(&self, price: Option<i64>, quantity: i64) -> Result<(Order, PlaceOutcome), WorkerError> {
        let (response_tx, response_rx) = oneshot::channel();
        self.command_tx
            .send(OrderBookCommand::Submit { price, quantity, response_tx })
            .await
            .map_err(|_| WorkerError::ChannelClosed)?;

        response_rx.await.map_err(|_| WorkerError::NoResponse)?
    }

    /// Latest published view of the book. Never waits on the worker.
    pub fn view(&self) -> BookView {
        self.view.read().clone()
    }

    /// Stops the worker and returns the book it owned.
    pub async fn shutdown(&self) -> Result<OrderBook, WorkerError> {
        let (response_tx, response_rx) = oneshot::channel();
        self.command_tx
            .send(OrderBookCommand::Shutdown { response_tx })
            .await
            .map_err(|_| WorkerError::ChannelClosed)?;

        response_rx.await.map_err(|_| WorkerError::NoResponse)
    }
}
