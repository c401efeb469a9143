//! Codec for encoding and decoding Pushi frames.
//!
//! Frames are JSON text messages. Some inbound fields are double-encoded:
//! the `data` of a handshake frame and the `member` of presence frames are
//! JSON documents carried inside JSON strings.

use serde_json::Value;
use thiserror::Error;

use crate::frames::{OutboundFrame, RawFrame};

/// Protocol errors that can occur during encoding/decoding.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// JSON encoding or decoding error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A field required by the recognized event is absent.
    #[error("missing frame field `{0}`")]
    MissingField(&'static str),

    /// An embedded JSON-string field failed to decode.
    #[error("invalid embedded JSON in field `{0}`")]
    InvalidEmbedded(&'static str),
}

/// Decode one inbound text frame.
///
/// # Errors
///
/// Returns an error if the text is not a valid frame. Callers are expected
/// to treat this as a per-frame failure (log and skip), not a fatal one.
pub fn decode(text: &str) -> Result<RawFrame, ProtocolError> {
    let frame = serde_json::from_str(text)?;
    Ok(frame)
}

/// Encode an outbound frame to one text message.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn encode(frame: &OutboundFrame) -> Result<String, ProtocolError> {
    let raw = frame.to_raw()?;
    let text = serde_json::to_string(&raw)?;
    Ok(text)
}

/// Resolve a possibly double-encoded field to its inner JSON value.
///
/// A string value is parsed as an embedded JSON document; anything else is
/// taken as already inline.
///
/// # Errors
///
/// Returns an error if a string value is not valid JSON.
pub fn decode_embedded(value: &Value, field: &'static str) -> Result<Value, ProtocolError> {
    match value {
        Value::String(inner) => {
            serde_json::from_str(inner).map_err(|_| ProtocolError::InvalidEmbedded(field))
        }
        other => Ok(other.clone()),
    }
}
