//! Types shared by every jobtrack crate

mod error;
mod secret;

pub use error::{Error, Result};
pub use secret::Secret;
