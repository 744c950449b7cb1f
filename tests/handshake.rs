//! End-to-end tests driving `Session` against a hand-rolled peer that plays
//! the sensor's side of the handshake using the same primitives the crate
//! exposes (`cipher_state`, `handshake`, `prf`, `crypto`). There is no
//! production server role in this crate, so these tests build just enough
//! of one, directly from the wire bytes `Session` actually emits, to prove
//! the client state machine really interoperates rather than merely
//! round-tripping through itself.

use p256::ecdsa::SigningKey;
use rand::rngs::OsRng;

use tudor_tls_session::cipher_state::{CipherState, DirectionKeys};
use tudor_tls_session::codec::Reader;
use tudor_tls_session::crypto::{self, parse_sec1_public_key, EphemeralKeypair};
use tudor_tls_session::error::TlsError;
use tudor_tls_session::handshake::{self, ECDSA_SIGN};
use tudor_tls_session::prf;
use tudor_tls_session::record::{self, ContentType, TLS_1_2_VERSION};
use tudor_tls_session::{HandshakePhase, PairingData, Session};

/// A record under the NULL cipher: length-correct, version byte-identical
/// whichever direction it's framed for (0x0303's LE and BE encodings are
/// the same two bytes).
fn null_record(content_type: ContentType, plaintext: &[u8]) -> Vec<u8> {
    CipherState::null().protect(content_type, TLS_1_2_VERSION, plaintext).unwrap()
}

fn split_handshake_messages(fragment: &[u8]) -> Vec<(u8, Vec<u8>)> {
    let mut r = Reader::new(fragment);
    let mut out = Vec::new();
    while r.remaining() != 0 {
        let msg_type = r.get_u8().unwrap();
        let len = r.get_u24_be().unwrap() as usize;
        let body = r.dup_data(len).unwrap();
        out.push((msg_type, body));
    }
    out
}

/// Builds the client's pairing credentials and the device's matching
/// static ECDH identity keypair — `PairingData.remote_cert_public_key` is
/// this keypair's public half, so `FakeDevice` must hold onto the same
/// keypair to derive a shared secret that agrees with the client's.
fn build_pairing_and_device_identity() -> (PairingData, EphemeralKeypair) {
    let client_signing = SigningKey::random(&mut OsRng);
    let device_identity = EphemeralKeypair::generate();
    let device_public = parse_sec1_public_key(&device_identity.public_sec1_uncompressed()).unwrap();

    let pairing = PairingData::new(b"client-certificate-bytes".to_vec(), client_signing, b"device-certificate-bytes".to_vec(), device_public);
    (pairing, device_identity)
}

struct FakeDevice {
    identity: EphemeralKeypair,
    server_random: [u8; 32],
    transcript: Vec<u8>,
    master_secret: Option<Vec<u8>>,
    read_cipher: CipherState, // decrypts what the client wrote
    write_cipher: CipherState, // encrypts what the device sends
}

impl FakeDevice {
    fn new(identity: EphemeralKeypair) -> Self {
        FakeDevice {
            identity,
            server_random: crypto::random_array(),
            transcript: Vec::new(),
            master_secret: None,
            read_cipher: CipherState::null(),
            write_cipher: CipherState::null(),
        }
    }

    fn append(&mut self, framed: &[u8]) {
        self.transcript.extend_from_slice(framed);
    }

    /// Builds the ServerHello + CertificateRequest + ServerHelloDone flight
    /// as one coalesced Handshake record, tracking each message in the
    /// transcript exactly as `Session` will on receipt.
    fn build_hello_flight(&mut self, client_random_unused: &[u8; 32]) -> Vec<u8> {
        let _ = client_random_unused;

        let mut flight = Vec::new();

        let mut sh_body = tudor_tls_session::codec::Writer::new();
        sh_body.put_u16_be(TLS_1_2_VERSION).put_data(&self.server_random).put_u8(0).put_u16_be(0xC02E).put_u8(0x00);
        let server_hello = handshake::wrap_handshake_header(handshake::SERVER_HELLO, &sh_body.take());
        self.append(&server_hello);
        flight.extend_from_slice(&server_hello);

        let mut cr_body = tudor_tls_session::codec::Writer::new();
        cr_body.put_u8(1).put_u8(ECDSA_SIGN).put_u8(0xAA).put_u8(0xBB);
        let cert_request = handshake::wrap_handshake_header(handshake::CERTIFICATE_REQUEST, &cr_body.take());
        self.append(&cert_request);
        flight.extend_from_slice(&cert_request);

        let server_hello_done = handshake::wrap_handshake_header(handshake::SERVER_HELLO_DONE, &[]);
        self.append(&server_hello_done);
        flight.extend_from_slice(&server_hello_done);

        flight
    }

    /// Consumes the client's Certificate/ClientKeyExchange/CertificateVerify
    /// burst (one coalesced NULL-cipher record), deriving the key schedule
    /// from the ephemeral public key carried in ClientKeyExchange.
    fn consume_client_burst(&mut self, fragment: &[u8], client_random: &[u8; 32]) {
        self.append(fragment);

        let messages = split_handshake_messages(fragment);
        let cke = messages.iter().find(|(t, _)| *t == handshake::CLIENT_KEY_EXCHANGE).expect("ClientKeyExchange present");
        let client_eph_pub = parse_sec1_public_key(&cke.1).unwrap();

        let premaster = self.identity.diffie_hellman(&client_eph_pub);

        let mut randoms = Vec::with_capacity(64);
        randoms.extend_from_slice(client_random);
        randoms.extend_from_slice(&self.server_random);

        let master_secret = prf::prf(&premaster, b"master secret", &randoms, 48);
        let key_block = prf::prf(&master_secret, b"key expansion", &randoms, 72);

        let client_write_key: [u8; 32] = key_block[0..32].try_into().unwrap();
        let server_write_key: [u8; 32] = key_block[32..64].try_into().unwrap();
        let client_write_iv: [u8; 4] = key_block[64..68].try_into().unwrap();
        let server_write_iv: [u8; 4] = key_block[68..72].try_into().unwrap();

        // The device's read direction decrypts what the client encrypted
        // with its write keys, and vice versa.
        self.read_cipher.activate(DirectionKeys { key: client_write_key, fixed_iv: client_write_iv });
        self.write_cipher.activate(DirectionKeys { key: server_write_key, fixed_iv: server_write_iv });

        self.master_secret = Some(master_secret);
    }

    fn expected_client_finished(&self) -> Vec<u8> {
        let digest = crypto::sha256(&self.transcript);
        prf::prf(self.master_secret.as_ref().unwrap(), b"client finished", &digest, 12)
    }

    fn build_server_finished_flight(&mut self) -> (Vec<u8>, Vec<u8>) {
        let verify_data = self.server_finished_verify_data();
        self.finished_flight_with_verify_data(&verify_data)
    }

    /// Same flight, but with one bit flipped in `verify_data` after it's
    /// computed — the record still authenticates under AEAD (it's sealed
    /// correctly over the tampered bytes), so this isolates the
    /// `verify_data` comparison itself rather than AEAD tag checking.
    fn build_server_finished_flight_with_tampered_verify_data(&mut self) -> (Vec<u8>, Vec<u8>) {
        let mut verify_data = self.server_finished_verify_data();
        verify_data[0] ^= 0xFF;
        self.finished_flight_with_verify_data(&verify_data)
    }

    fn server_finished_verify_data(&self) -> Vec<u8> {
        let digest = crypto::sha256(&self.transcript);
        prf::prf(self.master_secret.as_ref().unwrap(), b"server finished", &digest, 12)
    }

    fn finished_flight_with_verify_data(&mut self, verify_data: &[u8]) -> (Vec<u8>, Vec<u8>) {
        let ccs = null_record(ContentType::ChangeCipherSpec, &[1u8]);

        let framed = handshake::wrap_handshake_header(handshake::FINISHED, verify_data);
        let finished_record = self.write_cipher.protect(ContentType::Handshake, TLS_1_2_VERSION, &framed).unwrap();

        (ccs, finished_record)
    }
}

/// Drives the client/device handshake up through the client's
/// Certificate/ClientKeyExchange/CertificateVerify/ChangeCipherSpec/Finished
/// burst, leaving `session` in `ServerDone` and `device` holding the agreed
/// key schedule — everything short of the server's own CCS+Finished flight,
/// which callers finish with either a genuine or a tampered `verify_data`.
fn advance_to_server_done() -> (Session, FakeDevice) {
    let (pairing, device_identity) = build_pairing_and_device_identity();
    let mut session = Session::new(pairing);
    let mut device = FakeDevice::new(device_identity);

    session.establish().unwrap();
    let client_hello_record = session.flush_send_buffer().unwrap();

    let mut r = Reader::new(&client_hello_record);
    let raw = record::parse_one(&mut r).unwrap();
    let (msg_type, body) = split_handshake_messages(&raw.fragment).into_iter().next().unwrap();
    assert_eq!(msg_type, handshake::CLIENT_HELLO);
    let mut client_random = [0u8; 32];
    client_random.copy_from_slice(&body[2..34]);
    device.append(&raw.fragment);

    let hello_flight = device.build_hello_flight(&client_random);
    let hello_record = null_record(ContentType::Handshake, &hello_flight);
    session.receive_ciphertext(&hello_record).unwrap();
    assert_eq!(session.phase(), HandshakePhase::ServerDone);

    let client_burst_record = session.flush_send_buffer().unwrap();
    let mut r = Reader::new(&client_burst_record);
    let cert_cke_cv = record::parse_one(&mut r).unwrap();
    let ccs = record::parse_one(&mut r).unwrap();
    let client_finished = record::parse_one(&mut r).unwrap();
    assert_eq!(r.remaining(), 0);

    device.consume_client_burst(&cert_cke_cv.fragment, &client_random);
    assert_eq!(ccs.content_type, ContentType::ChangeCipherSpec);

    let finished_plaintext = device.read_cipher.unprotect(ContentType::Handshake, client_finished.version, &client_finished.fragment).unwrap();
    let (finished_type, finished_body) = split_handshake_messages(&finished_plaintext).into_iter().next().unwrap();
    assert_eq!(finished_type, handshake::FINISHED);
    assert_eq!(finished_body, device.expected_client_finished());

    (session, device)
}

/// Drives a full handshake against `FakeDevice`, returning the session and
/// device once `Session::phase()` reaches `Finished`.
fn run_handshake() -> (Session, FakeDevice) {
    let (mut session, mut device) = advance_to_server_done();

    let (ccs_back, finished_back) = device.build_server_finished_flight();
    session.receive_ciphertext(&ccs_back).unwrap();
    assert_eq!(session.phase(), HandshakePhase::ServerDone);
    session.receive_ciphertext(&finished_back).unwrap();
    assert_eq!(session.phase(), HandshakePhase::Finished);

    (session, device)
}

#[test]
fn handshake_completes_and_both_sides_agree_on_finished() {
    let _ = run_handshake();
}

#[test]
fn application_data_round_trips_after_handshake() {
    let (mut session, mut device) = run_handshake();

    let outbound = session.wrap(b"fingerprint template chunk").unwrap();
    let mut r = Reader::new(&outbound);
    let raw = record::parse_one(&mut r).unwrap();
    let plaintext = device.read_cipher.unprotect(raw.content_type, raw.version, &raw.fragment).unwrap();
    assert_eq!(plaintext, b"fingerprint template chunk");

    let device_reply = device.write_cipher.protect(ContentType::ApplicationData, TLS_1_2_VERSION, b"match result").unwrap();
    session.receive_ciphertext(&device_reply).unwrap();
    assert_eq!(session.unwrap(), b"match result");
}

#[test]
fn sequence_numbers_advance_across_consecutive_wraps() {
    let (mut session, mut device) = run_handshake();

    for i in 0..5u8 {
        let payload = vec![i; 4];
        let outbound = session.wrap(&payload).unwrap();
        let mut r = Reader::new(&outbound);
        let raw = record::parse_one(&mut r).unwrap();
        let plaintext = device.read_cipher.unprotect(raw.content_type, raw.version, &raw.fragment).unwrap();
        assert_eq!(plaintext, payload);
    }
}

#[test]
fn close_round_trip_sends_and_acknowledges_close_notify() {
    let (mut session, mut device) = run_handshake();

    session.close().unwrap();
    let outbound = session.flush_send_buffer().unwrap();
    let mut r = Reader::new(&outbound);
    let raw = record::parse_one(&mut r).unwrap();
    let plaintext = device.read_cipher.unprotect(raw.content_type, raw.version, &raw.fragment).unwrap();
    assert_eq!(plaintext, [0x01, 0x00]); // warning, close_notify

    assert!(matches!(session.wrap(b"too late"), Err(TlsError::Closed)));

    let device_close = device.write_cipher.protect(ContentType::Alert, TLS_1_2_VERSION, &[0x01, 0x00]).unwrap();
    session.receive_ciphertext(&device_close).unwrap();
}

#[test]
fn server_finished_with_flipped_verify_data_byte_is_decrypt_error() {
    let (mut session, mut device) = advance_to_server_done();

    let (ccs_back, tampered_finished) = device.build_server_finished_flight_with_tampered_verify_data();
    session.receive_ciphertext(&ccs_back).unwrap();
    assert_eq!(session.phase(), HandshakePhase::ServerDone);

    assert!(matches!(session.receive_ciphertext(&tampered_finished), Err(TlsError::DecryptError(_))));

    // A fatal error closes both directions, not just the one that failed.
    assert!(matches!(session.wrap(b"too late"), Err(TlsError::Closed)));
}

#[test]
fn truncated_record_is_a_decode_error_and_does_not_panic() {
    let (pairing, _device_identity) = build_pairing_and_device_identity();
    let mut session = Session::new(pairing);

    // Declares a 5-byte fragment but only 2 bytes follow the header.
    let mut bytes = vec![ContentType::Handshake as u8, 0x03, 0x03, 0x00, 0x05];
    bytes.extend_from_slice(&[0xAA, 0xBB]);

    assert!(matches!(session.receive_ciphertext(&bytes), Err(TlsError::DecodeError(_))));
}

#[test]
fn change_cipher_spec_with_no_pending_cipher_is_unexpected() {
    let (pairing, _device_identity) = build_pairing_and_device_identity();
    let mut session = Session::new(pairing);
    session.establish().unwrap();

    let ccs = null_record(ContentType::ChangeCipherSpec, &[1u8]);
    assert!(matches!(session.receive_ciphertext(&ccs), Err(TlsError::UnexpectedMessage(_))));
}

#[test]
fn establish_twice_is_rejected() {
    let (pairing, _device_identity) = build_pairing_and_device_identity();
    let mut session = Session::new(pairing);
    session.establish().unwrap();
    assert!(matches!(session.establish(), Err(TlsError::UnexpectedMessage(_))));
}

#[test]
fn client_hello_is_wire_exact_on_the_outer_record() {
    let (pairing, _device_identity) = build_pairing_and_device_identity();
    let mut session = Session::new(pairing);
    session.establish().unwrap();
    let record_bytes = session.flush_send_buffer().unwrap();

    assert_eq!(record_bytes[0], ContentType::Handshake as u8);
    assert_eq!(&record_bytes[1..3], &[0x03, 0x03]);

    let mut r = Reader::new(&record_bytes);
    let raw = record::parse_one(&mut r).unwrap();
    assert_eq!(raw.fragment[0], handshake::CLIENT_HELLO);
    // The compression_methods byte sits right after session_id; session_id
    // is fixed at 7 zero bytes, so its offset within the body is fixed too.
    let body = &raw.fragment[4..];
    let compression_offset = 2 + 32 + 1 + 7 + 2 + 2;
    assert_eq!(body[compression_offset], 0x00);
    assert_eq!(&body[compression_offset + 1..compression_offset + 15], &[0x00, 0x0A, 0x00, 0x04, 0x00, 0x02, 0x00, 0x17, 0x00, 0x0B, 0x00, 0x02, 0x01, 0x00]);
}
