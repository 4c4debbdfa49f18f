//--------------------------------------------------------------------------------------------------
// STRUCTS & TRAITS
//--------------------------------------------------------------------------------------------------
// | Name                    | Description                                       | Key Methods       |
// |-------------------------|---------------------------------------------------|-------------------|
// | Diagnostic              | Notice emitted by the book                        | fmt               |
// | DiagnosticSink          | Trait for anything accepting notices              | report            |
// | NoopSink                | Discards every notice (default)                   | report            |
// | TracingSink             | Forwards notices to `tracing` at warn level       | report            |
// | CollectingSink          | Keeps the latest notices in memory                | entries           |
//--------------------------------------------------------------------------------------------------

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::warn;

use crate::domain::models::types::Order;

/// Notices the book reports to its sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// A marketable order found too little liquidity inside its limit and was dropped.
    Cancelled {
        order: Order,
        requested: u64,
        available: u64,
    },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cancelled { order, requested, available } => write!(
                f,
                "Could not execute order {}, canceling it ({} of {} available)",
                order, available, requested
            ),
        }
    }
}

/// Receiver of book diagnostics.
pub trait DiagnosticSink: Send + fmt::Debug {
    fn report(&self, diagnostic: &Diagnostic);
}

/// Sink that drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl DiagnosticSink for NoopSink {
    fn report(&self, _diagnostic: &Diagnostic) {}
}

/// Sink that logs through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&self, diagnostic: &Diagnostic) {
        warn!("{}", diagnostic);
    }
}

/// A simple in-memory sink, mostly for tests and debugging.
///
/// Clones share the same buffer, so a caller can keep one handle while the
/// book owns another.
#[derive(Debug, Clone)]
pub struct CollectingSink {
    /// Maximum number of notices to keep; zero keeps nothing
    max_entries: usize,
    entries: Arc<Mutex<VecDeque<Diagnostic>>>,
}

impl CollectingSink {
    pub fn new(max_entries: usize) -> Self {
        Self {
            max_entries,
            entries: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    /// Returns the collected notices, oldest first.
    pub fn entries(&self) -> Vec<Diagnostic> {
        self.entries.lock().iter().cloned().collect()
    }
}

impl DiagnosticSink for CollectingSink {
    fn report(&self, diagnostic: &Diagnostic) {
        if self.max_entries == 0 {
            return;
        }
        let mut entries = self.entries.lock();
        if entries.len() >= self.max_entries {
            entries.pop_front();
        }
        entries.push_back(diagnostic.clone());
    }
}

/// Picks the sink for a verbosity flag.
pub fn sink_for(verbose: bool) -> Box<dyn DiagnosticSink> {
    if verbose {
        Box::new(TracingSink)
    } else {
        Box::new(NoopSink)
    }
}
