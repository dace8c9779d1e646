//! Group and role administration services.
//!
//! Both services share one tuple store and one job runner. Operations that
//! span every partition run as pool jobs through the fan-out engine in
//! `partitions`; single assignments go straight to the store.

mod error;
mod groups;
mod identifiers;
mod partitions;
mod roles;

#[cfg(test)]
mod tests;

pub use error::{ServiceError, ServiceResult};
pub use groups::GroupService;
pub use roles::RoleService;

/// One page of a single-partition listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListPage {
    pub items: Vec<String>,
    /// Cursor for the next page; empty when exhausted.
    pub next_cursor: String,
}
