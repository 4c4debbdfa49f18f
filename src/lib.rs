// Expose the modules
pub mod config;
pub mod domain;

// Re-export key types for easier usage
pub use config::{ConfigError, SimulationConfig};
pub use domain::models::types::{Order, OrderError, PriceBound, RestingOrder, Side};
pub use domain::services::diagnostics::{CollectingSink, Diagnostic, DiagnosticSink, NoopSink, TracingSink};
pub use domain::services::orderbook::depth::PriceLevel;
pub use domain::services::orderbook::history::Snapshot;
pub use domain::services::orderbook::order_queue::{Execution, Fill, MatchOutcome, OrderQueue};
pub use domain::services::orderbook::orderbook::{BookView, OrderBook, PlaceOutcome};
pub use domain::services::orderbook::orderbook_worker::{OrderBookClient, OrderBookWorker, WorkerError};
pub use domain::services::orderbook::{BookError, QueueError};
pub use domain::services::simulation::{MaslovGenerator, SimulationError, SimulationReport};
