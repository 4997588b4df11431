//! Purpose: Register every archive file in a local directory with the location directory.
//! Exports: `sync_directory`, `archive_files`, `is_archive_name`, `SyncReport`, `SyncEntry`.
//! Role: Thin loop over a directory listing on top of `LocationClient::add`.
//! Invariants: Location URLs are `dir_url` + file name, concatenated as given.
//! Invariants: Stops at the first failed add; earlier registrations stand.
#![allow(clippy::result_large_err)]

use super::client::{ApiResult, LocationClient};
use crate::core::error::{Error, ErrorKind};
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

pub const ARCHIVE_SUFFIXES: &[&str] = &[".arc", ".arc.gz"];

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct SyncEntry {
    pub name: String,
    pub url: String,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct SyncReport {
    pub registered: Vec<SyncEntry>,
}

pub fn is_archive_name(name: &str) -> bool {
    ARCHIVE_SUFFIXES.iter().any(|suffix| name.ends_with(suffix))
}

/// Names of the regular files directly in `dir` that look like archives, sorted.
pub fn archive_files(dir: &Path) -> ApiResult<Vec<String>> {
    if !dir.is_dir() {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("sync source is not a directory")
            .with_path(dir));
    }
    let entries = fs::read_dir(dir).map_err(|err| {
        Error::new(ErrorKind::Io)
            .with_message("failed to list directory")
            .with_path(dir)
            .with_source(err)
    })?;

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("failed to read directory entry")
                .with_path(dir)
                .with_source(err)
        })?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            warn!(path = %path.display(), "skipping non-utf8 file name");
            continue;
        };
        if is_archive_name(&name) {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}

pub fn sync_directory(
    client: &LocationClient,
    dir: &Path,
    dir_url: &str,
) -> ApiResult<SyncReport> {
    let mut report = SyncReport::default();
    for name in archive_files(dir)? {
        let url = format!("{dir_url}{name}");
        info!(file = %name, location = %url, "adding location");
        client.add(&name, &url)?;
        report.registered.push(SyncEntry { name, url });
    }
    Ok(report)
}
