//! Handshake transcript (C6): an append-only log of handshake message
//! bytes, hashable on demand. Grounded on `tls_session_handshake_hash`,
//! which re-buffers the accumulated bytes and SHA-256-hashes them without
//! consuming the buffer (so later hashes, e.g. for the server's Finished
//! verification, see the transcript plus anything appended since).
//!
//! The single quirk callers must honor (not enforced here, since it
//! depends on which message is being appended): `Finished` messages are
//! never appended, by either side (Q5 in SPEC_FULL.md).

use crate::crypto;

#[derive(Default)]
pub struct Transcript {
    buf: Vec<u8>,
}

impl Transcript {
    pub fn new() -> Self {
        Transcript { buf: Vec::new() }
    }

    pub fn append(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// SHA-256 of everything appended so far. Non-destructive: the
    /// transcript keeps accumulating after this call.
    pub fn sha256_digest(&self) -> [u8; 32] {
        crypto::sha256(&self.buf)
    }

    /// The raw accumulated bytes, for the one caller (CertificateVerify)
    /// that signs the transcript directly rather than a digest of it.
    pub fn raw_bytes(&self) -> &[u8] {
        &self.buf
    }
}
