//! Load contracts from JSON files
//!
//! Accepts either a single request object or an array of requests in the
//! boundary format (see [`CashflowRequest`]).

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use super::request::CashflowRequest;

/// Default location of the sample contract file
pub const DEFAULT_CONTRACTS_PATH: &str = "data/contracts.json";

#[derive(Deserialize)]
#[serde(untagged)]
enum RequestFile {
    Many(Vec<CashflowRequest>),
    One(CashflowRequest),
}

/// Load all contract requests from a JSON file
pub fn load_requests<P: AsRef<Path>>(path: P) -> Result<Vec<CashflowRequest>> {
    let path = path.as_ref();
    let file = File::open(path)
        .with_context(|| format!("opening contract file {}", path.display()))?;
    load_requests_from_reader(BufReader::new(file))
        .with_context(|| format!("parsing contract file {}", path.display()))
}

/// Load contract requests from any reader (e.g., string buffer, network stream)
pub fn load_requests_from_reader<R: Read>(reader: R) -> Result<Vec<CashflowRequest>> {
    let parsed: RequestFile = serde_json::from_reader(reader)?;
    let requests = match parsed {
        RequestFile::Many(requests) => requests,
        RequestFile::One(request) => vec![request],
    };
    log::debug!("loaded {} contract requests", requests.len());
    Ok(requests)
}

/// Load requests from the default sample file
pub fn load_default_requests() -> Result<Vec<CashflowRequest>> {
    load_requests(DEFAULT_CONTRACTS_PATH)
}
