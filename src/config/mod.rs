//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! built-in service defaults (loader.rs)
//!     → optional TOML file
//!     → well-known environment variables (ENV, TENANT, DATABASE_URL, ...)
//!     → validation.rs (semantic checks)
//!     → Config (validated, immutable)
//!     → shared by value or via Arc with all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults so services start with no file at all
//! - Environment variables override file values

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError, ServiceDefaults};
pub use schema::Config;
