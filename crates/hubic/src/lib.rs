//! duck-hubic: hubiC session for duck
//!
//! Authenticates against hubiC with OAuth2 and obtains the storage
//! credentials of the account. Storage features are not provided.

pub mod client;
pub mod protocol;
pub mod rest;
mod session;

pub use client::{HubicClient, StorageCredentials};
pub use protocol::{is_hubic, protocol, swift};
pub use rest::HttpHubicClient;
pub use session::HubicSession;
