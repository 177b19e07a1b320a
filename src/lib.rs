// I don't really care, and it's not important for this project
#![allow(clippy::result_large_err)]

pub mod cache;
pub mod context;
pub mod engine;
mod error;

pub use engine::{generate, validate, Session};
pub use error::{Error, ErrorKind, InternalError};
