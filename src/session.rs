//! Session facade (C8): the only entry point external collaborators use.
//! Owns the record/cipher/transcript/handshake state and the per-type
//! coalescing buffer (C 4.9).
//!
//! Grounded on `tls_session_new`/`_init`/`_establish`/`_receive_ciphertext`/
//! `_receive`/`_receive_handshake`/`_has_data`/`_flush_send_buffer`/
//! `_flush_content_buffer`/`_send`/`_wrap`/`_unwrap`/`_close` in the
//! original driver. Unlike the original's two-phase `new()` (pre-pairing)
//! then `init()` (post-pairing) split — needed in C to allocate a struct
//! before the pairing round-trip completes — this core takes `PairingData`
//! directly in its constructor: Rust has no use for a partially-valid
//! `Session`, and every field the original driver's `init` sets is
//! unconditionally required before `establish` can run.

use std::mem;

use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::alert::{self, LEVEL_FATAL};
use crate::cipher_state::{CipherState, CipherSuite, DirectionKeys};
use crate::codec::Reader;
use crate::crypto::{self, EphemeralKeypair};
use crate::error::{AlertDescription, AlertLevel, Result, TlsError};
use crate::handshake::{self, HandshakePhase, ECDSA_SIGN, RANDOM_SIZE, VERIFY_DATA_SIZE};
use crate::pairing::PairingData;
use crate::prf;
use crate::record::{self, ContentType, TLS_1_2_VERSION};
use crate::transcript::Transcript;

const MASTER_SECRET_SIZE: usize = 48;
const KEY_BLOCK_SIZE: usize = 72; // client_write_key(32) + server_write_key(32) + client_write_iv(4) + server_write_iv(4)
const NEGOTIATED_SUITE: u16 = 0xC02E; // TLS_ECDH_ECDSA_WITH_AES_256_GCM_SHA384

pub struct Session {
    pairing: PairingData,

    version: u16,
    client_random: [u8; RANDOM_SIZE],
    server_random: [u8; RANDOM_SIZE],
    session_id: Vec<u8>,
    server_session_id: Vec<u8>,

    phase: HandshakePhase,
    cert_request_type: Option<u8>,

    send_cipher: CipherState,
    recv_cipher: CipherState,
    pending_write_keys: Option<DirectionKeys>,
    pending_read_keys: Option<DirectionKeys>,

    master_secret: Option<Zeroizing<[u8; MASTER_SECRET_SIZE]>>,

    transcript: Transcript,

    send_buffer: Vec<u8>,
    content_buffer: Vec<u8>,
    content_buffer_type: Option<ContentType>,
    application_data: Vec<u8>,

    send_closed: bool,
    recv_closed: bool,
}

impl Session {
    /// Allocates a new session bound to `pairing`, drawing a fresh
    /// client random. The client always sends a 7-byte all-zero
    /// session_id, matching the original driver's hard-coded convention.
    pub fn new(pairing: PairingData) -> Self {
        let client_random = crypto::random_array();
        tracing::debug!("session created, phase=HandshakeBegin");

        Session {
            pairing,
            version: TLS_1_2_VERSION,
            client_random,
            server_random: [0u8; RANDOM_SIZE],
            session_id: vec![0u8; 7],
            server_session_id: Vec::new(),
            phase: HandshakePhase::HandshakeBegin,
            cert_request_type: None,
            send_cipher: CipherState::null(),
            recv_cipher: CipherState::null(),
            pending_write_keys: None,
            pending_read_keys: None,
            master_secret: None,
            transcript: Transcript::new(),
            send_buffer: Vec::new(),
            content_buffer: Vec::new(),
            content_buffer_type: None,
            application_data: Vec::new(),
            send_closed: false,
            recv_closed: false,
        }
    }

    pub fn phase(&self) -> HandshakePhase {
        self.phase
    }

    /// The session_id the server echoed back in ServerHello. Carried for
    /// completeness; this dialect never attempts session resumption.
    pub fn server_session_id(&self) -> &[u8] {
        &self.server_session_id
    }

    /// Emits ClientHello, moving the session from `HandshakeBegin` to
    /// `ClientHelloSent`.
    pub fn establish(&mut self) -> Result<()> {
        if self.phase != HandshakePhase::HandshakeBegin {
            return Err(TlsError::UnexpectedMessage("establish() called outside HandshakeBegin"));
        }

        tracing::debug!("starting TLS handshake");
        let body = handshake::build_client_hello(self.version, &self.client_random, &self.session_id, NEGOTIATED_SUITE);
        self.send_handshake_message(handshake::CLIENT_HELLO, body)?;
        self.phase = HandshakePhase::ClientHelloSent;
        Ok(())
    }

    /// Feeds inbound transport bytes into the session. `data` must contain
    /// whole TLS records (this core, like the original driver, does not
    /// reassemble partial records split across calls).
    pub fn receive_ciphertext(&mut self, data: &[u8]) -> Result<()> {
        if self.recv_closed {
            return Err(TlsError::Closed);
        }

        let mut reader = Reader::new(data);
        while reader.remaining() != 0 {
            if let Err(e) = self.receive_one_record(&mut reader) {
                return Err(self.fail(e));
            }
        }

        Ok(())
    }

    fn receive_one_record(&mut self, reader: &mut Reader) -> Result<()> {
        let raw = record::parse_one(reader)?;
        if raw.version != self.version {
            return Err(TlsError::ProtocolMismatch("record version does not match negotiated version"));
        }

        let plaintext = self.recv_cipher.unprotect(raw.content_type, raw.version, &raw.fragment)?;
        self.process_plaintext(raw.content_type, &plaintext)
    }

    /// Marks both directions closed and, if the error maps to one (§7),
    /// enqueues the matching fatal alert before the error is surfaced to the
    /// caller. Mirrors `tls_session_receive`'s `goto error` path, which
    /// always sends an alert and tears down the session on any fatal
    /// condition rather than leaving the cipher state usable after an
    /// authentication or protocol failure.
    fn fail(&mut self, err: TlsError) -> TlsError {
        self.send_closed = true;
        self.recv_closed = true;

        if let Some(description) = err.outbound_alert() {
            tracing::debug!(?description, "sending fatal alert");
            let body = alert::build(AlertLevel::Fatal, description);
            let _ = self.enqueue(ContentType::Alert, &body);
        }

        err
    }

    pub fn has_data(&self) -> bool {
        !self.send_buffer.is_empty() || !self.content_buffer.is_empty()
    }

    /// Flushes any coalesced content through AEAD, then drains and returns
    /// all bytes ready for the transport.
    pub fn flush_send_buffer(&mut self) -> Result<Vec<u8>> {
        self.flush_content_buffer()?;
        Ok(mem::take(&mut self.send_buffer))
    }

    /// Encrypts and buffers one application_data record, then flushes.
    pub fn wrap(&mut self, payload: &[u8]) -> Result<Vec<u8>> {
        if self.send_closed {
            return Err(TlsError::Closed);
        }
        self.enqueue(ContentType::ApplicationData, payload)?;
        self.flush_send_buffer()
    }

    /// Drains and returns accumulated decrypted application data.
    pub fn unwrap(&mut self) -> Vec<u8> {
        mem::take(&mut self.application_data)
    }

    /// Sends a warning close_notify and marks the send side closed.
    /// Idempotent.
    pub fn close(&mut self) -> Result<()> {
        if self.send_closed {
            return Ok(());
        }

        let body = alert::build(AlertLevel::Warning, AlertDescription::CloseNotify);
        tracing::debug!("sending close_notify");
        self.enqueue(ContentType::Alert, &body)?;
        self.send_closed = true;
        Ok(())
    }

    // ---- internal plumbing -------------------------------------------------

    fn send_handshake_message(&mut self, msg_type: u8, body: Vec<u8>) -> Result<()> {
        let framed = handshake::wrap_handshake_header(msg_type, &body);

        // Q5: Finished is never appended to the transcript, on send or receive.
        if msg_type != handshake::FINISHED {
            self.transcript.append(&framed);
        }

        self.enqueue(ContentType::Handshake, &framed)
    }

    fn enqueue(&mut self, content_type: ContentType, fragment: &[u8]) -> Result<()> {
        if let Some(existing) = self.content_buffer_type {
            if existing != content_type {
                self.flush_content_buffer()?;
            }
        }

        self.content_buffer.extend_from_slice(fragment);
        self.content_buffer_type = Some(content_type);
        Ok(())
    }

    fn flush_content_buffer(&mut self) -> Result<()> {
        if let Some(content_type) = self.content_buffer_type.take() {
            let plaintext = mem::take(&mut self.content_buffer);
            let record = self.send_cipher.protect(content_type, self.version, &plaintext)?;
            self.send_buffer.extend_from_slice(&record);
        }
        Ok(())
    }

    fn process_plaintext(&mut self, content_type: ContentType, plaintext: &[u8]) -> Result<()> {
        let mut reader = Reader::new(plaintext);

        while reader.remaining() != 0 {
            match content_type {
                ContentType::ChangeCipherSpec => {
                    let dummy = reader.get_u8()?;
                    if dummy != 1 {
                        return Err(TlsError::DecodeError("malformed ChangeCipherSpec body"));
                    }
                    tracing::debug!("<- ChangeCipherSpec");
                    let keys = self
                        .pending_read_keys
                        .take()
                        .ok_or(TlsError::UnexpectedMessage("ChangeCipherSpec received with no pending cipher negotiated"))?;
                    self.recv_cipher.activate(keys);
                }
                ContentType::Alert => {
                    let level = reader.get_u8()?;
                    let description = reader.get_u8()?;
                    if self.handle_alert(level, description)? {
                        return Ok(());
                    }
                }
                ContentType::Handshake => {
                    let msg_type = reader.get_u8()?;
                    let length = reader.get_u24_be()? as usize;
                    let body = reader.dup_data(length)?;
                    self.receive_handshake(msg_type, &body)?;
                }
                ContentType::ApplicationData => {
                    let rest = reader.rest();
                    self.application_data.extend_from_slice(rest);
                }
            }
        }

        Ok(())
    }

    /// Returns `Ok(true)` if the caller should stop processing the rest of
    /// this record's bytes (mirrors the original driver returning early
    /// from its receive loop once a close_notify is handled).
    fn handle_alert(&mut self, level: u8, description: u8) -> Result<bool> {
        tracing::debug!(level, description, "<- Alert");

        if description == alert::DESCRIPTION_CLOSE_NOTIFY {
            if self.send_closed {
                tracing::debug!("remote confirmed session close");
            } else {
                self.close()?;
            }
            self.recv_closed = true;
            return Ok(true);
        }

        if level == LEVEL_FATAL {
            self.send_closed = true;
            self.recv_closed = true;
            return Err(TlsError::PeerFatalAlert { level: AlertLevel::Fatal, description });
        }

        Ok(false)
    }

    fn receive_handshake(&mut self, msg_type: u8, body: &[u8]) -> Result<()> {
        let framed = handshake::wrap_handshake_header(msg_type, body);
        if msg_type != handshake::FINISHED {
            self.transcript.append(&framed);
        }

        match msg_type {
            handshake::SERVER_HELLO => self.on_server_hello(body),
            handshake::CERTIFICATE_REQUEST => self.on_certificate_request(body),
            handshake::SERVER_HELLO_DONE => self.on_server_hello_done(),
            handshake::FINISHED => self.on_server_finished(body),
            _ => Err(TlsError::UnexpectedMessage("unrecognized or unsupported handshake message type")),
        }
    }

    fn on_server_hello(&mut self, body: &[u8]) -> Result<()> {
        if self.phase != HandshakePhase::ClientHelloSent {
            return Err(TlsError::UnexpectedMessage("ServerHello received outside ClientHelloSent"));
        }

        let hello = handshake::parse_server_hello(body)?;
        tracing::debug!(cipher_suite = hello.cipher_suite, "<- ServerHello");

        if hello.cipher_suite != NEGOTIATED_SUITE {
            return Err(TlsError::ProtocolMismatch("server negotiated an unsupported cipher suite"));
        }
        if hello.compression_method != 0x00 {
            return Err(TlsError::ProtocolMismatch("server negotiated a non-null compression method"));
        }

        self.server_random = hello.random;
        self.server_session_id = hello.session_id;
        self.phase = HandshakePhase::SuiteHandshake;
        tracing::debug!("starting cipher suite handshake");
        Ok(())
    }

    fn on_certificate_request(&mut self, body: &[u8]) -> Result<()> {
        if self.phase != HandshakePhase::SuiteHandshake {
            return Err(TlsError::UnexpectedMessage("CertificateRequest received outside SuiteHandshake"));
        }
        if self.cert_request_type.is_some() {
            return Err(TlsError::UnexpectedMessage("duplicate CertificateRequest"));
        }

        let certificate_type = handshake::parse_certificate_request(body)?;
        tracing::debug!(certificate_type, "<- CertificateRequest");
        self.cert_request_type = Some(certificate_type);
        Ok(())
    }

    fn on_server_hello_done(&mut self) -> Result<()> {
        if self.phase != HandshakePhase::SuiteHandshake {
            return Err(TlsError::UnexpectedMessage("ServerHelloDone received outside SuiteHandshake"));
        }
        tracing::debug!("<- ServerHelloDone");

        if self.cert_request_type != Some(ECDSA_SIGN) {
            return Err(TlsError::ProtocolMismatch("server did not request an ECDSA client certificate"));
        }

        // Certificate
        let cert_body = handshake::build_certificate(&self.pairing.client_cert_raw);
        self.send_handshake_message(handshake::CERTIFICATE, cert_body)?;

        // ClientKeyExchange
        let ephemeral = EphemeralKeypair::generate();
        let eph_pub = ephemeral.public_sec1_uncompressed();
        let cke_body = handshake::build_client_key_exchange(&eph_pub);
        self.send_handshake_message(handshake::CLIENT_KEY_EXCHANGE, cke_body)?;

        // CertificateVerify: signs the transcript accumulated so far
        // (Certificate and ClientKeyExchange, already appended above).
        let signature = crypto::ecdsa_sign_sha256(&self.pairing.client_private_key, self.transcript.raw_bytes());
        let verify_body = handshake::build_certificate_verify(&signature);
        self.send_handshake_message(handshake::CERTIFICATE_VERIFY, verify_body)?;

        // Key schedule. `ephemeral` is dropped at the end of this scope,
        // zeroizing its private scalar; nothing past this point needs it.
        let premaster = ephemeral.diffie_hellman(&self.pairing.remote_cert_public_key);

        let mut randoms = Vec::with_capacity(2 * RANDOM_SIZE);
        randoms.extend_from_slice(&self.client_random);
        randoms.extend_from_slice(&self.server_random);

        let master_secret_bytes = prf::prf(&premaster, b"master secret", &randoms, MASTER_SECRET_SIZE);
        let mut master_secret = Zeroizing::new([0u8; MASTER_SECRET_SIZE]);
        master_secret.copy_from_slice(&master_secret_bytes);

        let key_block = prf::prf(&master_secret, b"key expansion", &randoms, KEY_BLOCK_SIZE);
        let client_write_key: [u8; 32] = key_block[0..32].try_into().unwrap();
        let server_write_key: [u8; 32] = key_block[32..64].try_into().unwrap();
        let client_write_iv: [u8; 4] = key_block[64..68].try_into().unwrap();
        let server_write_iv: [u8; 4] = key_block[68..72].try_into().unwrap();

        self.pending_write_keys = Some(DirectionKeys { key: client_write_key, fixed_iv: client_write_iv });
        self.pending_read_keys = Some(DirectionKeys { key: server_write_key, fixed_iv: server_write_iv });

        // ChangeCipherSpec, then activate the write cipher with the keys
        // just derived (never before the CCS record itself has been
        // flushed under the old, NULL cipher).
        self.send_change_cipher_spec()?;
        let write_keys = self.pending_write_keys.take().expect("just computed above");
        self.send_cipher.activate(write_keys);

        // client Finished, now sent under the newly active AEAD cipher.
        let digest = self.transcript.sha256_digest();
        let verify_data_bytes = prf::prf(&master_secret, b"client finished", &digest, VERIFY_DATA_SIZE);
        let mut verify_data = [0u8; VERIFY_DATA_SIZE];
        verify_data.copy_from_slice(&verify_data_bytes);
        self.send_handshake_message(handshake::FINISHED, handshake::build_finished(&verify_data))?;

        self.master_secret = Some(master_secret);
        self.phase = HandshakePhase::ServerDone;
        tracing::debug!("cipher suite handshake ended, awaiting server Finished");
        Ok(())
    }

    fn send_change_cipher_spec(&mut self) -> Result<()> {
        tracing::debug!("-> ChangeCipherSpec");
        self.enqueue(ContentType::ChangeCipherSpec, &[1u8])?;
        self.flush_content_buffer()
    }

    fn on_server_finished(&mut self, body: &[u8]) -> Result<()> {
        if self.phase != HandshakePhase::ServerDone {
            return Err(TlsError::UnexpectedMessage("Finished received outside ServerDone"));
        }
        if self.recv_cipher.suite() != CipherSuite::EcdhEcdsaAes256GcmSha384 {
            return Err(TlsError::UnexpectedMessage("Finished received before server's ChangeCipherSpec"));
        }

        let remote_verify_data = handshake::parse_finished(body)?;
        tracing::debug!("<- Finished");

        let master_secret = self.master_secret.as_ref().ok_or(TlsError::CryptoFailure("master secret missing at Finished"))?;
        let digest = self.transcript.sha256_digest();
        let expected = prf::prf(master_secret.as_ref(), b"server finished", &digest, VERIFY_DATA_SIZE);

        if expected.ct_eq(&remote_verify_data).unwrap_u8() != 1 {
            return Err(TlsError::DecryptError("server Finished verify_data mismatch"));
        }

        self.phase = HandshakePhase::Finished;
        tracing::debug!("handshake complete");
        Ok(())
    }
}
