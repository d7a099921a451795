//! Request framing and response decoding for the node's JSON-RPC dialect.
//!
//! The node authenticates every request with a `userpass` field carried in
//! the body and accepts either a single request object or an array of them.

use std::fmt;

use serde_json::{Map, Value};

use crate::error::RpcError;

pub const JSONRPC_VERSION: &str = "2.0";

/// Method names containing this marker are sent as a batch.
pub const BATCH_MARKER: &str = "batch";

/// Keyword parameters of a call, merged verbatim into the request object.
pub type Params = Map<String, Value>;

pub fn is_batch_method(method: &str) -> bool {
    method.contains(BATCH_MARKER)
}

// ==============================================================================
// Framing
// ==============================================================================

fn envelope(userpass: &str, method: Value, id: u64) -> Params {
    let mut frame = Params::with_capacity(4);
    frame.insert("jsonrpc".to_owned(), Value::from(JSONRPC_VERSION));
    frame.insert("userpass".to_owned(), Value::from(userpass));
    frame.insert("method".to_owned(), method);
    frame.insert("id".to_owned(), Value::from(id));
    frame
}

/// Build one request object.
///
/// Caller parameters are merged after the protocol fields, so a parameter
/// named `method`, `id`, `userpass` or `jsonrpc` replaces the value the
/// proxy would have sent.
pub(crate) fn frame_single(userpass: &str, method: &str, id: u64, params: &Params) -> Value {
    let mut frame = envelope(userpass, Value::from(method), id);
    for (key, value) in params {
        frame.insert(key.clone(), value.clone());
    }
    Value::Object(frame)
}

/// Check every batch descriptor before any id is reserved, so a bad
/// descriptor never produces a partial frame.
pub(crate) fn validate_batch(params: &Params) -> Result<Vec<&Params>, RpcError> {
    params
        .iter()
        .map(|(label, descriptor)| -> Result<&Params, RpcError> {
            let descriptor = descriptor
                .as_object()
                .ok_or_else(|| RpcError::MalformedDescriptor {
                    label: label.clone(),
                    reason: "descriptor must be a JSON object".to_owned(),
                })?;
            match descriptor.get("method") {
                Some(Value::String(method)) if !method.is_empty() => Ok(descriptor),
                Some(Value::String(_)) => Err(RpcError::MalformedDescriptor {
                    label: label.clone(),
                    reason: "`method` must not be empty".to_owned(),
                }),
                Some(_) => Err(RpcError::MalformedDescriptor {
                    label: label.clone(),
                    reason: "`method` must be a string".to_owned(),
                }),
                None => Err(RpcError::MalformedDescriptor {
                    label: label.clone(),
                    reason: "missing `method` field".to_owned(),
                }),
            }
        })
        .collect()
}

/// Build the array body of a batch; descriptor `i` gets id `start_id + i`.
///
/// Labels are only used to report malformed descriptors and never appear in
/// the frames.
pub(crate) fn frame_batch(userpass: &str, descriptors: &[&Params], start_id: u64) -> Value {
    let frames = descriptors
        .iter()
        .enumerate()
        .map(|(offset, descriptor)| {
            let method = descriptor.get("method").cloned().unwrap_or(Value::Null);
            let mut frame = envelope(userpass, method, start_id + offset as u64);
            for (key, value) in descriptor.iter() {
                frame.insert(key.clone(), value.clone());
            }
            Value::Object(frame)
        })
        .collect();
    Value::Array(frames)
}

// ==============================================================================
// Response
// ==============================================================================

/// Whatever the node answered.
///
/// A body that is not valid JSON is an ordinary outcome, returned as text.
#[derive(Debug, Clone, PartialEq)]
pub enum RpcResponse {
    Json(Value),
    Text(String),
}

impl RpcResponse {
    pub fn decode(body: String) -> Self {
        match serde_json::from_str(&body) {
            Ok(value) => Self::Json(value),
            Err(_) => Self::Text(body),
        }
    }

    pub fn is_json(&self) -> bool {
        matches!(self, Self::Json(_))
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(value) => Some(value),
            Self::Text(_) => None,
        }
    }

    pub fn into_json(self) -> Option<Value> {
        match self {
            Self::Json(value) => Some(value),
            Self::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Json(_) => None,
            Self::Text(text) => Some(text),
        }
    }

    /// Take the `result` field of a JSON object response.
    ///
    /// When it is missing, the node's `error` field (or the whole body) is
    /// reported in [`RpcError::MissingResult`].
    pub fn into_result(self, method: &str) -> Result<Value, RpcError> {
        let detail = match self {
            Self::Json(Value::Object(mut body)) => match body.remove("result") {
                Some(result) => return Ok(result),
                None => match body.remove("error") {
                    Some(Value::String(message)) => message,
                    Some(other) => other.to_string(),
                    None => Value::Object(body).to_string(),
                },
            },
            Self::Json(other) => other.to_string(),
            Self::Text(text) => text,
        };
        Err(RpcError::MissingResult {
            method: method.to_owned(),
            detail,
        })
    }
}

impl fmt::Display for RpcResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json(value) => write!(f, "{value:#}"),
            Self::Text(text) => f.write_str(text),
        }
    }
}
