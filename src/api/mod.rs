//! Purpose: Define the public Rust API boundary for `locdb`.
//! Exports: Location client, lookup outcome, sync helpers, and error types.
//! Role: Public, additive-only surface; hides the wire codec module.
//! Invariants: Callers never see raw reply bodies except as `Protocol` error messages.
//! Invariants: Internal modules remain private and are not directly exposed.

mod client;
mod sync;

pub use crate::core::error::{Error, ErrorKind, to_exit_code};
pub use crate::core::wire::{NO_LOCATION_PREFIX, OK_PREFIX, Operation};
pub use client::{
    ApiResult, ClientOptions, DEFAULT_CONNECT_TIMEOUT, DEFAULT_TIMEOUT, LocationClient,
    LookupResult,
};
pub use sync::{
    ARCHIVE_SUFFIXES, SyncEntry, SyncReport, archive_files, is_archive_name, sync_directory,
};
