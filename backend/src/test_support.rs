//! Test utilities for the logistics crate.
//!
//! Shared by unit tests (in `src/`) and integration tests (in `tests/`). Only
//! compiled for tests or with the `test-support` feature.

mod clock;
mod in_memory_store;

pub use clock::MutableClock;
pub use in_memory_store::{InMemoryLogisticsStore, LogisticsTables};
