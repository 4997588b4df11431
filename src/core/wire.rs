// Location directory wire dialect: parameter names, reply markers, and reply classification.
use crate::core::error::{Error, ErrorKind};

pub const OPERATION_PARAM: &str = "operation";
pub const NAME_PARAM: &str = "name";
pub const URL_PARAM: &str = "url";

/// Success marker: the word `OK` plus its single separating space.
pub const OK_PREFIX: &str = "OK ";
pub const NO_LOCATION_PREFIX: &str = "ERROR No locations for";

const LINE_SEPARATOR: char = '\n';

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Operation {
    Lookup,
    Add,
    Remove,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Lookup => "lookup",
            Operation::Add => "add",
            Operation::Remove => "remove",
        }
    }
}

/// Exactly one of these per reply body. Only `Ok` carries a payload.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Reply<'a> {
    Ok(&'a str),
    NoLocation,
    Error(&'a str),
}

pub fn classify(body: &str) -> Reply<'_> {
    if let Some(payload) = body.strip_prefix(OK_PREFIX) {
        Reply::Ok(payload)
    } else if body.starts_with(NO_LOCATION_PREFIX) {
        Reply::NoLocation
    } else {
        Reply::Error(body)
    }
}

/// Splits strictly on `\n`. Empty elements, including a trailing one, are kept.
pub fn split_locations(payload: &str) -> Vec<String> {
    payload.split(LINE_SEPARATOR).map(str::to_string).collect()
}

pub fn protocol_error(body: &str) -> Error {
    Error::new(ErrorKind::Protocol).with_message(body)
}
