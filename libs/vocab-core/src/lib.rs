//! Core vocabulary review library.
//!
//! Provides:
//! - Step-interval review scheduler (answer events → learning state)
//! - Validated, deduplicated, chunked word-list importer
//! - Storage and clock interfaces, with an in-memory store
//! - Shared types (Word, LearningState, RawRow, etc.)

pub mod clock;
pub mod error;
pub mod importer;
pub mod scheduler;
pub mod store;
pub mod types;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{ImportError, PersistError, StoreError, StoreResult};
pub use importer::{check_headers, ImportOptions, ImportResult, Importer, REQUIRED_COLUMNS};
pub use scheduler::{
    initial_state, is_due, record_answer, ReviewFilter, ReviewScheduler, StepScheduler,
};
pub use store::{MemoryStore, WordStore};
pub use types::{
    CourseId, CourseStats, ImportedWord, LearningState, Page, RawRow, Word, WordId, WordWithState,
};
