//! Configuration for the relay: schema, file loading with `${ENV_VAR}`
//! substitution, and startup validation.

pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    loader::{discover_and_load, load_config},
    schema::{
        ChannelsConfig, DedupConfig, DeliveryConfig, HealthConfig, RelayConfig, StoreConfig,
        TelegramConfig,
    },
    validate::{ConfigError, validate},
};
