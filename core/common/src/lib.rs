//! Common utilities and types shared across the driveremote crates.
//!
//! This module provides the error taxonomy used by every layer and the
//! `gdrive://` path model that callers hand to the remote.

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{RootAlias, StoragePath, GDRIVE_SCHEME};
