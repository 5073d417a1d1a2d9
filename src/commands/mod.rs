use anyhow::{Context, Result, anyhow};
use serde_json::Value;

use crate::http::Headers;

mod download;
mod request;

pub use download::download;
pub use request::{RequestOptions, request};

/// Parses a `Name: value` header argument.
pub fn parse_header(arg: &str) -> Result<(String, String)> {
    let (name, value) = arg
        .split_once(':')
        .ok_or_else(|| anyhow!("Header {:?} is not in the form 'Name: value'", arg))?;
    let name = name.trim();
    if name.is_empty() {
        anyhow::bail!("Header {:?} has an empty name", arg);
    }
    Ok((name.to_string(), value.trim().to_string()))
}

/// Parses a JSON request body argument.
pub fn parse_json(arg: &str) -> Result<Value> {
    serde_json::from_str(arg).with_context(|| format!("Request body is not valid JSON: {}", arg))
}

/// Collects header pairs, the last occurrence of a name winning.
pub fn collect_headers(pairs: &[(String, String)]) -> Headers {
    pairs.iter().cloned().collect()
}
