//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ClientConfig (validated, immutable)
//!     → loader::load_credential (password from environment)
//!     → ServiceStub::from_config
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Secrets are never stored in the file, only the name of the
//!   environment variable holding them

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, load_credential, parse_config, ConfigError};
pub use schema::{ClientConfig, CredentialConfig, EndpointConfig, ObservabilityConfig, RecoveryConfig};
pub use validation::{validate_config, ValidationError};
