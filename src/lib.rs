mod client;
mod diff;
mod error;
mod logger;
mod protocol;
mod transport;
mod types;

pub use client::{DEFAULT_PORT, TouchClient, TouchClientBuilder};
pub use error::{Error, Result};
pub use logger::MessageLogMode;
pub use transport::Pacing;
pub use types::*;
