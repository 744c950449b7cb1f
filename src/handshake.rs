//! Handshake message wire layout (C7): builders for the messages the
//! client emits, parsers for the messages it must be able to consume, and
//! the phase enum driving the state machine in [`crate::session`].
//!
//! Every layout decision here is grounded on the corresponding
//! `tls_session_send_*`/`tls_session_receive_handshake` case in the
//! original driver, including every deliberate quirk (Q1-Q4) — see
//! SPEC_FULL.md §9 for the catalogue. This module only builds/parses
//! message *bodies*; `Session` decides when each is wrapped in a handshake
//! header, appended to the transcript, and flushed through a cipher state.

use crate::codec::{Reader, Writer};
use crate::error::{Result, TlsError};

pub const CLIENT_HELLO: u8 = 1;
pub const SERVER_HELLO: u8 = 2;
pub const CERTIFICATE: u8 = 11;
pub const CERTIFICATE_REQUEST: u8 = 13;
pub const SERVER_HELLO_DONE: u8 = 14;
pub const CERTIFICATE_VERIFY: u8 = 15;
pub const CLIENT_KEY_EXCHANGE: u8 = 16;
pub const FINISHED: u8 = 20;

/// Certificate type the server is expected to request (RFC 4492 §5.5);
/// any other value is a protocol mismatch for this dialect.
pub const ECDSA_SIGN: u8 = 64;

pub const RANDOM_SIZE: usize = 32;
pub const VERIFY_DATA_SIZE: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakePhase {
    HandshakeBegin,
    ClientHelloSent,
    SuiteHandshake,
    ServerDone,
    Finished,
}

/// Wraps a message body in the generic handshake header:
/// `msg_type(1) || length(u24 BE) || body`.
pub fn wrap_handshake_header(msg_type: u8, body: &[u8]) -> Vec<u8> {
    let mut w = Writer::with_capacity(body.len() + 4);
    w.put_u8(msg_type).put_u24_be(body.len() as u32).put_data(body);
    w.take()
}

/// Builds a ClientHello body. Reproduces Q1 verbatim: the compression
/// methods field is a single `0x00` byte (neither a standards-compliant
/// 1-byte count plus 1-byte NULL method, nor omitted outright), and the
/// two extensions that follow have no enclosing extensions-block length.
pub fn build_client_hello(version: u16, client_random: &[u8; RANDOM_SIZE], session_id: &[u8], cipher_suite: u16) -> Vec<u8> {
    let mut w = Writer::new();
    w.put_u16_be(version);
    w.put_data(client_random);
    w.put_u8(session_id.len() as u8).put_data(session_id);
    w.put_u16_be(2).put_u16_be(cipher_suite);

    // Q1: a single zero byte standing in for compression_methods.
    w.put_u8(0);

    // supported_groups: secp256r1 only.
    w.put_u16_be(0x000A).put_u16_be(4).put_u16_be(2).put_u16_be(0x0017);
    // ec_point_formats: uncompressed only.
    w.put_u16_be(0x000B).put_u16_be(2).put_u8(1).put_u8(0);

    w.take()
}

pub struct ServerHello {
    pub version: u16,
    pub random: [u8; RANDOM_SIZE],
    pub session_id: Vec<u8>,
    pub cipher_suite: u16,
    pub compression_method: u8,
}

/// Parses a ServerHello body. Any trailing bytes (e.g. extensions) are
/// ignored, matching the original driver, which never reads them.
pub fn parse_server_hello(body: &[u8]) -> Result<ServerHello> {
    let mut r = Reader::new(body);
    let version = r.get_u16_be()?;
    let random_bytes = r.dup_data(RANDOM_SIZE)?;
    let session_id_len = r.get_u8()? as usize;
    if session_id_len > 32 {
        return Err(TlsError::DecodeError("ServerHello session_id exceeds 32 bytes"));
    }
    let session_id = r.dup_data(session_id_len)?;
    let cipher_suite = r.get_u16_be()?;
    let compression_method = r.get_u8()?;

    let mut random = [0u8; RANDOM_SIZE];
    random.copy_from_slice(&random_bytes);

    Ok(ServerHello { version, random, session_id, cipher_suite, compression_method })
}

/// Parses a CertificateRequest body: a 1-byte certificate-type count
/// (must be 1), the certificate type, then 2 trailing garbage bytes that
/// are read and discarded (Q3).
pub fn parse_certificate_request(body: &[u8]) -> Result<u8> {
    let mut r = Reader::new(body);
    let certs_num = r.get_u8()?;
    if certs_num != 1 {
        return Err(TlsError::ProtocolMismatch("CertificateRequest must request exactly one certificate type"));
    }
    let certificate_type = r.get_u8()?;
    r.skip(2)?;
    Ok(certificate_type)
}

/// Builds the Certificate message body: an outer length, then an inner
/// length, 2 garbage padding bytes (Q2), then the raw certificate bytes.
pub fn build_certificate(cert_raw: &[u8]) -> Vec<u8> {
    let size = cert_raw.len() as u32;
    let mut w = Writer::with_capacity(cert_raw.len() + 8);
    w.put_u24_be(size);
    w.put_u24_be(size);
    w.fill(0, 2);
    w.put_data(cert_raw);
    w.take()
}

/// ClientKeyExchange body is the raw SEC1-uncompressed ephemeral public
/// key with no additional length prefix (the peer expects a fixed-width
/// P-256 point).
pub fn build_client_key_exchange(ephemeral_public_sec1: &[u8]) -> Vec<u8> {
    ephemeral_public_sec1.to_vec()
}

/// CertificateVerify body is the raw ECDSA signature bytes with no
/// SignatureAndHashAlgorithm prefix (Q4).
pub fn build_certificate_verify(signature_der: &[u8]) -> Vec<u8> {
    signature_der.to_vec()
}

pub fn build_finished(verify_data: &[u8; VERIFY_DATA_SIZE]) -> Vec<u8> {
    verify_data.to_vec()
}

pub fn parse_finished(body: &[u8]) -> Result<[u8; VERIFY_DATA_SIZE]> {
    let mut r = Reader::new(body);
    let data = r.dup_data(VERIFY_DATA_SIZE)?;
    let mut out = [0u8; VERIFY_DATA_SIZE];
    out.copy_from_slice(&data);
    Ok(out)
}
