//! Configuration module for cmdwire.
//!
//! Handles loading and validating configuration from TOML files.

mod settings;

pub use settings::*;
