//! Google Drive remote for driveremote.
//!
//! This module provides the `gdrive://` backend with:
//! - OAuth2 authentication with automatic token refresh
//! - Tokens persisted per client and scope set
//! - A Drive v3 transport with full pagination and streamed transfers
//! - The [`Remote`](crate::provider::Remote) implementation on top

pub mod auth;
pub mod client;
pub mod credentials;
pub mod provider;

pub use auth::{AuthConfig, AuthManager, TokenManager, Tokens, CLIENT_ID_ENV, CLIENT_SECRET_ENV};
pub use client::DriveClient;
pub use credentials::CredentialStore;
pub use provider::{create_gdrive_provider, GDriveConfig, GDriveProvider};
