//! Purpose: HTTP client for the file location directory (lookup/add/remove).
//! Exports: `LocationClient`, `ClientOptions`, `LookupResult`.
//! Role: Encodes operations as query/form parameters and classifies plain-text replies.
//! Invariants: One round-trip per call; no retries; no state besides the base URL and agent.
//! Invariants: Timeouts and non-2xx statuses are `Transport`, never an absent lookup.
//! Invariants: Parameter values are encoded here; callers pass raw names and URLs.
//! Invariants: Redirects are not followed; a 3xx reply is a `Transport` error.
#![allow(clippy::result_large_err)]

use crate::core::error::{Error, ErrorKind};
use crate::core::wire::{self, NAME_PARAM, OPERATION_PARAM, Operation, Reply, URL_PARAM};
use std::io::Read;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::Url;

pub type ApiResult<T> = Result<T, Error>;

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const MAX_BODY_BYTES: u64 = 10 * 1024 * 1024;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ClientOptions {
    pub connect_timeout: Duration,
    /// Upper bound on a whole request, connect through body read.
    pub timeout: Duration,
}

impl ClientOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Outcome of a lookup that reached the directory and got a recognized reply.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum LookupResult {
    /// Locations in reply order, split strictly on `\n` (empty entries kept).
    Found(Vec<String>),
    /// The directory knows no location for the name.
    Absent,
}

impl LookupResult {
    pub fn is_absent(&self) -> bool {
        matches!(self, LookupResult::Absent)
    }

    pub fn locations(&self) -> &[String] {
        match self {
            LookupResult::Found(locations) => locations,
            LookupResult::Absent => &[],
        }
    }

    pub fn contains(&self, location: &str) -> bool {
        self.locations().iter().any(|known| known == location)
    }

    pub fn into_locations(self) -> Option<Vec<String>> {
        match self {
            LookupResult::Found(locations) => Some(locations),
            LookupResult::Absent => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct LocationClient {
    inner: Arc<LocationClientInner>,
}

#[derive(Debug)]
struct LocationClientInner {
    base_url: Url,
    agent: ureq::Agent,
}

impl LocationClient {
    pub fn new(base_url: impl Into<String>) -> ApiResult<Self> {
        Self::with_options(base_url, ClientOptions::default())
    }

    pub fn with_options(base_url: impl Into<String>, options: ClientOptions) -> ApiResult<Self> {
        let base_url = normalize_base_url(base_url.into())?;
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(options.connect_timeout)
            .timeout(options.timeout)
            .redirects(0)
            .build();
        Ok(Self {
            inner: Arc::new(LocationClientInner { base_url, agent }),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Returns every known location of `name`, or `LookupResult::Absent`.
    pub fn lookup(&self, name: &str) -> ApiResult<LookupResult> {
        let url = lookup_url(&self.inner.base_url, name);
        debug!(operation = Operation::Lookup.as_str(), file = name, "querying location directory");
        let body = read_body(self.inner.agent.get(url.as_str()).call())
            .map_err(|err| err.with_name(name))?;
        match wire::classify(&body) {
            Reply::Ok(payload) => {
                let locations = wire::split_locations(payload);
                debug!(file = name, count = locations.len(), "locations found");
                Ok(LookupResult::Found(locations))
            }
            Reply::NoLocation => {
                debug!(file = name, "no locations known");
                Ok(LookupResult::Absent)
            }
            Reply::Error(message) => Err(wire::protocol_error(message).with_name(name)),
        }
    }

    /// Registers `location` for `name`. Re-adding a known pair is not an error.
    pub fn add(&self, name: &str, location: &str) -> ApiResult<()> {
        self.mutate(Operation::Add, name, location)
    }

    /// Drops `location` for `name`. Removing an unknown pair is not an error.
    pub fn remove(&self, name: &str, location: &str) -> ApiResult<()> {
        self.mutate(Operation::Remove, name, location)
    }

    fn mutate(&self, operation: Operation, name: &str, location: &str) -> ApiResult<()> {
        debug!(
            operation = operation.as_str(),
            file = name,
            location,
            "updating location directory"
        );
        let form = mutation_form(operation, name, location);
        let body = read_body(
            self.inner
                .agent
                .post(self.inner.base_url.as_str())
                .send_form(&form),
        )
        .map_err(|err| err.with_name(name))?;
        match wire::classify(&body) {
            Reply::Ok(_) => Ok(()),
            Reply::NoLocation | Reply::Error(_) => {
                Err(wire::protocol_error(&body).with_name(name))
            }
        }
    }
}

fn normalize_base_url(raw: String) -> ApiResult<Url> {
    let mut url = Url::parse(&raw).map_err(|err| {
        Error::new(ErrorKind::Config)
            .with_message(format!("invalid location directory url: {raw}"))
            .with_hint("Use an absolute URL like http://host:8080/locationdb.")
            .with_source(err)
    })?;
    let scheme = url.scheme();
    if scheme != "http" && scheme != "https" {
        return Err(Error::new(ErrorKind::Config)
            .with_message("location directory url must use http or https scheme")
            .with_hint("Use an absolute URL like http://host:8080/locationdb."));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(
            Error::new(ErrorKind::Config).with_message("location directory url must name a host")
        );
    }
    url.set_fragment(None);
    Ok(url)
}

fn lookup_url(base_url: &Url, name: &str) -> Url {
    let mut url = base_url.clone();
    url.query_pairs_mut()
        .append_pair(OPERATION_PARAM, Operation::Lookup.as_str())
        .append_pair(NAME_PARAM, name);
    url
}

fn mutation_form<'a>(
    operation: Operation,
    name: &'a str,
    location: &'a str,
) -> [(&'static str, &'a str); 3] {
    [
        (OPERATION_PARAM, operation.as_str()),
        (NAME_PARAM, name),
        (URL_PARAM, location),
    ]
}

fn read_body(result: Result<ureq::Response, ureq::Error>) -> ApiResult<String> {
    let response = match result {
        Ok(response) => response,
        Err(ureq::Error::Status(code, response)) => {
            return Err(status_error(code, response.status_text()));
        }
        Err(ureq::Error::Transport(err)) => {
            return Err(Error::new(ErrorKind::Transport)
                .with_message(format!("request failed: {err}"))
                .with_source(err));
        }
    };
    let status = response.status();
    if !(200..300).contains(&status) {
        return Err(status_error(status, response.status_text()));
    }
    if declares_charset(&response) {
        return response.into_string().map_err(body_read_error);
    }
    let mut bytes = Vec::new();
    response
        .into_reader()
        .take(MAX_BODY_BYTES)
        .read_to_end(&mut bytes)
        .map_err(body_read_error)?;
    Ok(decode_undeclared(bytes))
}

fn declares_charset(response: &ureq::Response) -> bool {
    response
        .header("Content-Type")
        .is_some_and(|value| value.to_ascii_lowercase().contains("charset="))
}

// No declared charset: UTF-8 when valid, otherwise ISO-8859-1 (one char per byte).
fn decode_undeclared(bytes: Vec<u8>) -> String {
    String::from_utf8(bytes).unwrap_or_else(|err| {
        err.into_bytes()
            .into_iter()
            .map(char::from)
            .collect()
    })
}

fn body_read_error(err: std::io::Error) -> Error {
    Error::new(ErrorKind::Transport)
        .with_message("failed to read response body")
        .with_source(err)
}

fn status_error(status: u16, status_text: &str) -> Error {
    Error::new(ErrorKind::Transport)
        .with_message(format!("method failed: {status} {status_text}"))
        .with_status(status)
}
