//! Test helpers shared across Memoria crates.

pub mod backend;
pub mod records;
pub mod taggers;

pub use backend::{FailPoint, FlakyBackend};
pub use records::{record_at, records_for};
pub use taggers::{FailingTagger, FixedTagger, PanickingTagger, RecordingTagger, SlowTagger};
