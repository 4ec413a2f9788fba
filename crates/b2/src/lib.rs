//! duck-b2: Backblaze B2 backend for duck
//!
//! [`B2Session`] authenticates with an application key and provides the
//! listing, directory, touch, write and delete features on top of a
//! [`B2Client`]. [`HttpB2Client`] talks to the B2 service,
//! [`MemoryB2Client`] keeps everything in process.

pub mod client;
mod delete;
mod directory;
mod fileid;
mod list;
pub mod memory;
pub mod protocol;
pub mod rest;
mod session;
mod touch;
mod write;

pub use client::{B2Client, B2FileInfo, ListFileVersionsRequest, ListFileVersionsResponse};
pub use delete::B2DeleteFeature;
pub use directory::B2DirectoryFeature;
pub use fileid::B2FileIdProvider;
pub use list::{B2ListService, UploadTimestampOrdering};
pub use memory::MemoryB2Client;
pub use protocol::{BucketType, PLACEHOLDER, protocol};
pub use rest::HttpB2Client;
pub use session::{B2Options, B2Session};
pub use touch::B2TouchFeature;
pub use write::{B2OutputStream, B2WriteFeature};
