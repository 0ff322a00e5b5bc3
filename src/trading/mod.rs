//! Trading execution modules

pub mod engine;

pub use engine::{EngineConfig, ExecutionEngine, ExecutionState, LegOrder, PairOutcome};
