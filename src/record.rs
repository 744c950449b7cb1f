//! TLS record layer: content type tags and the incoming record parser.
//! Fragmentation is out of scope (Non-goal): each call into
//! `parse_one` consumes exactly one `{type, version, length, fragment}`
//! unit and callers loop until the buffer is exhausted.
//!
//! Outbound record framing lives in [`crate::cipher_state`] instead of here,
//! since on the wire it is produced by the same step that performs AEAD
//! sealing (one function in the original driver, `tls_session_encrypt`) —
//! splitting it into a separate "always correct" record writer here would
//! invent a boundary the source doesn't have, and would risk normalizing
//! away the little-endian version quirk (see Q7 in SPEC_FULL.md) at the
//! wrong layer.

use crate::codec::Reader;
use crate::error::{Result, TlsError};

pub const TLS_1_2_VERSION: u16 = 0x0303;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ContentType {
    ChangeCipherSpec = 20,
    Alert = 21,
    Handshake = 22,
    ApplicationData = 23,
}

impl ContentType {
    pub fn from_u8(v: u8) -> Result<Self> {
        match v {
            20 => Ok(ContentType::ChangeCipherSpec),
            21 => Ok(ContentType::Alert),
            22 => Ok(ContentType::Handshake),
            23 => Ok(ContentType::ApplicationData),
            _ => Err(TlsError::DecodeError("unrecognized record content type")),
        }
    }
}

/// A single parsed record: the wire-level framing metadata plus its
/// (possibly still encrypted) fragment.
pub struct RawRecord {
    pub content_type: ContentType,
    pub version: u16,
    pub fragment: Vec<u8>,
}

/// Parses one `{type(1), version(2 BE), length(2 BE), fragment}` unit from
/// the front of `reader`. The version field is read big-endian here,
/// matching the peer's outbound framing (see module docs re: Q7).
pub fn parse_one(reader: &mut Reader) -> Result<RawRecord> {
    let content_type = ContentType::from_u8(reader.get_u8()?)?;
    let version = reader.get_u16_be()?;
    let length = reader.get_u16_be()? as usize;
    let fragment = reader.dup_data(length)?;

    Ok(RawRecord { content_type, version, fragment })
}
