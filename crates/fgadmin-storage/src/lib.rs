//! fgadmin-storage: Tuple store abstraction
//!
//! This crate provides the client-side view of the relationship tuple store
//! used by the administration services:
//! - `TupleStore` trait for reads, writes, checks and reverse lookups
//! - In-memory implementation for tests and local runs
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │              fgadmin-storage                │
//! ├─────────────────────────────────────────────┤
//! │  traits.rs - Tuple, filters, TupleStore     │
//! │  memory.rs - In-memory implementation       │
//! │  error.rs  - StoreError                     │
//! └─────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod memory;
pub mod traits;

// Re-export commonly used types
pub use error::{StoreError, StoreResult};
pub use memory::MemoryTupleStore;
pub use traits::{Tuple, TupleFilter, TuplePage, TupleStore};
