//! Core traits, constants, and error types shared by every layer.

mod buffer;
pub mod constants;
mod error;
mod traits;

pub use buffer::*;
pub use error::*;
pub use traits::*;
