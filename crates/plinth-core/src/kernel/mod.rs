//! # Plinth Kernel
//!
//! Crate-wide plumbing shared by every subsystem: the aggregate [`error::Error`]
//! type with its [`error::Result`] alias, and the well-known names in
//! [`constants`] (attribute sections, keys and the loader capability).
pub mod constants;
pub mod error;

pub use error::{Error, Result};

#[cfg(test)]
mod tests;
