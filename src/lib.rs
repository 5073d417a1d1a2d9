pub mod commands;
pub mod error;
pub mod http;

pub use error::{Error, Result};
