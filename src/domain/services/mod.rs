pub mod diagnostics;
pub mod orderbook;
pub mod simulation;
