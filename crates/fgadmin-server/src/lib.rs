//! fgadmin-server: Group and role administration services
//!
//! This crate contains the service layer including:
//! - Group service (permission listing, cascade delete, assignments)
//! - Role service
//! - Configuration management
//! - Logging setup
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │               fgadmin-server                │
//! ├─────────────────────────────────────────────┤
//! │  config.rs      - Configuration management  │
//! │  app.rs         - Service wiring            │
//! │  observability/ - Structured logging        │
//! │  services/      - Group & role services     │
//! └─────────────────────────────────────────────┘
//! ```

pub mod app;
pub mod config;
pub mod observability;
pub mod services;

// Re-exports for convenience
pub use app::AdminServices;
pub use config::{ConfigLoadError, ServerConfig};
pub use services::{GroupService, ListPage, RoleService, ServiceError, ServiceResult};
