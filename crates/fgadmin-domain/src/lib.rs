//! fgadmin-domain: Fan-out engine for relationship administration
//!
//! This crate contains the request-independent machinery including:
//! - Bounded worker pool shared by every request
//! - Fan-out/fan-in over keyed partition jobs
//! - Multiplexed page tokens
//! - Partition tags and permission identifiers
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │               fgadmin-domain                │
//! ├─────────────────────────────────────────────┤
//! │  pool/         - Worker pool & job runner   │
//! │  fanout.rs     - Fan-out and aggregation    │
//! │  pagination.rs - Multiplexed page tokens    │
//! │  partition.rs  - Partition tags             │
//! │  permission.rs - Permission URNs            │
//! └─────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod fanout;
pub mod pagination;
pub mod partition;
pub mod permission;
pub mod pool;

// Re-export commonly used types at the crate root
pub use error::{DomainError, DomainResult, PoolError, PoolResult, TokenDecodeError};
pub use fanout::{
    fan_out, FailureKind, FanOutPage, PartitionFailure, PartitionFailures, PartitionPage,
};
pub use pagination::PageTokens;
pub use partition::{DirectRelation, PartitionTag};
pub use permission::{is_permission_relation, Permission};
pub use pool::{InlineRunner, JobResult, JobRunner, PoolConfig, WorkerPool};
