//! Error types for cmdwire.
//!
//! Provides a unified error handling system using thiserror.

mod types;

pub use types::*;
