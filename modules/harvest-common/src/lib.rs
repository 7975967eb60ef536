pub mod config;
pub mod error;
pub mod types;

pub use config::{Config, Stage};
pub use error::HarvestError;
pub use types::*;
