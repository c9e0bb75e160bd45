//! altlb Core - Shared types, configuration and errors for live-node load balancing

pub mod config;
pub mod error;
pub mod types;

pub use config::*;
pub use error::*;
pub use types::*;
