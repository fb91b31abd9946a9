pub mod common;
pub mod configuration;
pub mod converter;
pub mod services;
pub mod state;

pub use configuration::Configuration;
pub use converter::{ConversionError, Converter, ConverterOptions};
pub use state::{ClusterState, ClusterStateSnapshot};

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Result<T> = std::result::Result<T, Error>;
