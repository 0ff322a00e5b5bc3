//! Utility modules

pub mod clock;
pub mod journal;
pub mod logger;
pub mod metrics;

pub use clock::{Clock, ManualClock, TokioClock};
pub use journal::{Journal, JournalPaths, JsonlJournal, MemoryJournal, OpportunityRecord, TradeRecord};
