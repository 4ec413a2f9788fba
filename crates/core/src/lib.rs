//! duck-core: Core library for duck storage backends
//!
//! This crate provides the backend independent pieces:
//! - Path and attribute model, directory listings
//! - Session lifecycle and per-backend feature traits
//! - Reconciliation of flat object keys into directory listings
//! - Transfer status and checksums
//! - OAuth2 token handling, configuration, retry policy
//!
//! Backends live in their own crates and implement [`Session`] and the
//! feature traits in [`features`].

pub mod callback;
pub mod checksum;
pub mod config;
pub mod error;
pub mod features;
pub mod host;
pub mod list;
pub mod listing;
pub mod oauth;
pub mod path;
pub mod profile;
pub mod retry;
pub mod session;
pub mod transfer;

pub use callback::{
    CancelCallback, ConnectionCallback, DeleteCallback, DisabledCancelCallback,
    DisabledConnectionCallback, DisabledDeleteCallback, DisabledHostKeyCallback,
    DisabledListProgressListener, DisabledLoginCallback, DisabledPasswordStore, HostKeyCallback,
    ListProgressListener, LoginCallback, MemoryPasswordStore, PasswordStore,
};
pub use checksum::{Checksum, ChecksumCompute, HashAlgorithm};
pub use config::{B2Config, Config, ConfigManager, ListingConfig, RetryConfig};
pub use error::{Error, Result};
pub use features::{
    Delete, DeleteOutcome, DeleteReport, Directory, ListService, StatusOutputStream, Touch, Write,
};
pub use host::{Credentials, Host, OAuthConfig, Protocol, ProtocolType, Scheme};
pub use list::AttributedList;
pub use listing::{ListingBuilder, NewestFirst, ObjectKind, RemoteObject, RevisionOrdering};
pub use oauth::{OAuth2Authorization, OAuth2Client, OAuthTokens};
pub use path::{EntryKind, Path, PathAttributes, PathType};
pub use profile::{Profile, ProtocolFactory};
pub use retry::{RetryPolicy, is_retryable_error};
pub use session::{Session, SessionState};
pub use transfer::{CompletedTransfer, TransferStatus};
