pub mod auth;
pub mod cli;
pub mod config;
pub mod demo;
pub mod error;
pub mod logging;
pub mod oracle;
pub mod types;

pub use auth::{AuthManager, LoginOutcome, UserInfo};
pub use cli::run_cli;
pub use config::{Config, LoggingConfig, OracleBackend, OracleConfig, StoreConfig};
pub use error::{AuthError, Result};
pub use oracle::{TextOracle, Verdict};
