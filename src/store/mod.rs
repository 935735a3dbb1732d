//! Storage for cached values: reclaimable slots and the sharded table that
//! maps keys to them.

pub mod slot;
pub mod table;

pub use slot::{CleanOutcome, SharedCleaner, Slot};
pub use table::SlotTable;
