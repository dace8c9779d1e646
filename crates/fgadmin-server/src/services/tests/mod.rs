//! Tests for the group and role services.
//!
//! Organized by service:
//! - Group permission listing, pagination and partial failures
//! - Group cascade deletion and cancellation
//! - Group assignments and preflight checks
//! - Role operations

mod mocks;
