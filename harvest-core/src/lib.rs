pub mod config;
pub mod error;
pub mod error_utils;
pub mod provider;
pub mod types;

pub use config::*;
pub use error::*;
pub use error_utils::*;
pub use provider::*;
pub use types::*;
