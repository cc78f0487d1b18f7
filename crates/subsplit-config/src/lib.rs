//! JSON configuration for the subsplit publisher.
//!
//! The configuration is a static JSON file read once at startup. Any error
//! while loading or validating it is fatal.

pub mod error;
pub mod system;

pub use error::{ConfigError, ConfigResult};
pub use system::{
    HttpConfig, RedisConfig, SlackConfig, SplitToolConfig, SplitterConfig, default_config_path,
    load_config, parse_config, resolve_config_path,
};
