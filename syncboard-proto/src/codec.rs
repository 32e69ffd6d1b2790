//! Serialization and deserialization for board events.
//!
//! Provides encode/decode functions using postcard, along with
//! length-prefix framing variants for stream-based transports.

use crate::event::BoardEvent;

/// Error type for codec encode/decode operations.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),
    /// Frame is incomplete or has an invalid length prefix.
    #[error("invalid frame: {0}")]
    InvalidFrame(String),
}

/// Encodes a [`BoardEvent`] into a byte vector using postcard.
///
/// # Errors
///
/// Returns `CodecError::Serialization` if the event cannot be serialized.
pub fn encode(event: &BoardEvent) -> Result<Vec<u8>, CodecError> {
    postcard::to_allocvec(event).map_err(|e| CodecError::Serialization(e.to_string()))
}

/// Decodes a [`BoardEvent`] from a byte slice using postcard.
///
/// Decoding alone does not establish trust: callers at a receive boundary
/// must still run [`BoardEvent::validate`] on the result.
///
/// # Errors
///
/// Returns `CodecError::Serialization` if the bytes cannot be deserialized.
pub fn decode(bytes: &[u8]) -> Result<BoardEvent, CodecError> {
    postcard::from_bytes(bytes).map_err(|e| CodecError::Serialization(e.to_string()))
}

/// Encodes a [`BoardEvent`] with a 4-byte little-endian length prefix.
///
/// Wire format: `[u32 length (LE)][payload bytes]`
///
/// Suitable for stream-based transports where message boundaries are not
/// preserved by the transport layer.
///
/// # Errors
///
/// Returns `CodecError::Serialization` if the event cannot be serialized,
/// or `CodecError::InvalidFrame` if the payload exceeds `u32::MAX` bytes.
pub fn encode_framed(event: &BoardEvent) -> Result<Vec<u8>, CodecError> {
    let payload = encode(event)?;
    let len = u32::try_from(payload.len()).map_err(|_| {
        CodecError::InvalidFrame(format!(
            "payload too large for framing: {} bytes",
            payload.len()
        ))
    })?;
    let mut frame = Vec::with_capacity(4 + payload.len());
    frame.extend_from_slice(&len.to_le_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

/// Decodes a length-prefixed frame back into a [`BoardEvent`].
///
/// Expects the wire format: `[u32 length (LE)][payload bytes]`
///
/// Returns the decoded event and the total number of bytes consumed from
/// the input (including the 4-byte length prefix).
///
/// # Errors
///
/// Returns `CodecError::InvalidFrame` if the input is too short or the
/// length prefix indicates more data than available, or
/// `CodecError::Serialization` if the payload cannot be deserialized.
pub fn decode_framed(bytes: &[u8]) -> Result<(BoardEvent, usize), CodecError> {
    if bytes.len() < 4 {
        return Err(CodecError::InvalidFrame(format!(
            "need at least 4 bytes for length prefix, got {}",
            bytes.len()
        )));
    }
    let len_bytes: [u8; 4] = bytes[..4]
        .try_into()
        .map_err(|_| CodecError::InvalidFrame("failed to read length prefix".into()))?;
    let payload_len = u32::from_le_bytes(len_bytes) as usize;

    let total_len = 4 + payload_len;
    if bytes.len() < total_len {
        return Err(CodecError::InvalidFrame(format!(
            "frame indicates {} bytes but only {} available",
            payload_len,
            bytes.len() - 4
        )));
    }

    let event = decode(&bytes[4..total_len])?;
    Ok((event, total_len))
}
