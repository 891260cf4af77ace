//! Lexical knowledge and review-scheduling engine.
//!
//! Storage-agnostic: every operation is generic over [`Store`] and runs as a
//! single [`Store::atomically`] unit. Hosts serialize operations per user,
//! e.g. with [`UserLocks`].

pub mod catalog;
pub mod error;
pub mod indexer;
pub mod knowledge;
pub mod locks;
pub mod memory;
pub mod review;
pub mod scheduler;
pub mod selector;
pub mod stats;
pub mod store;
pub mod types;

pub use error::{EngineError, EngineResult, Entity};
pub use locks::{UserGuard, UserLocks};
pub use memory::MemoryStore;
pub use scheduler::{Grade, SchedulerParams, SchedulerState, Stage};
pub use store::Store;
pub use types::*;
