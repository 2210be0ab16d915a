//! Google Drive remote backend for a content-addressed versioning tool.
//!
//! The drive addresses resources by opaque IDs, lets a folder have several
//! parents and allows duplicate titles under one parent. This crate maps
//! `gdrive://root/path` locations onto that store and performs existence
//! checks, uploads, downloads and folder creation against it.
//!
//! # Design Principles
//! - Path resolution is a deterministic walk: first listed match wins
//! - Absence is a value (`Option`), transport failures are errors
//! - No client-side cache of the remote tree
//! - The transport is a trait, so the algorithms run against any drive

pub mod existence;
pub mod gdrive;
pub mod materializer;
pub mod memory;
pub mod progress;
pub mod provider;
pub mod registry;
pub mod resolver;
pub mod transfer;
pub mod transport;

pub use gdrive::{GDriveConfig, GDriveProvider};
pub use memory::MemoryTransport;
pub use progress::{LogProgress, NoProgress, ProgressReporter, TrackReadProgress};
pub use provider::Remote;
pub use registry::{create_default_registry, ProviderFactory, ProviderRegistry};
pub use resolver::resolve;
pub use transport::{ByteStream, DriveTransport, Resource, FOLDER_MIME_TYPE};

use driveremote_common::{Error, Result};

/// Run blocking filesystem work off the async runtime.
pub(crate) async fn blocking<F, R>(work: F) -> Result<R>
where
    F: FnOnce() -> Result<R> + Send + 'static,
    R: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| Error::Io(std::io::Error::other(format!("join error: {}", e))))?
}
