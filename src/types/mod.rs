//! Shared error types

mod errors;

pub use errors::{Result, StoreError};
