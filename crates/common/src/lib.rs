//! Shared types for the X OAuth gateway workspace

mod error;
mod secret;

pub use error::{Error, Result};
pub use secret::Secret;
