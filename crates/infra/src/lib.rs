//! Infrastructure layer: user storage backends and process configuration.

pub mod config;
pub mod store;

pub use config::{AppConfig, ConfigError, DisclosurePolicy, Environment, RateLimitConfig, StoreBackend};
pub use store::{InMemoryUserStore, PostgresUserStore, StoreError, UserStore};
