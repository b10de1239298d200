pub mod config;
pub mod error;

pub use config::{load_dotenv, DispatchConfig, FailurePolicy};
pub use error::ConfigError;
