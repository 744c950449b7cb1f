//! Cryptographic primitives consumed by the key schedule, record protection,
//! and handshake signature steps: AES-256-GCM AEAD, P-256 ECDH/ECDSA, and
//! SHA-256/384 digests. Kept as a thin, direct wrapper around RustCrypto
//! crates rather than a from-scratch implementation of any primitive.

use aes_gcm::aead::{Aead, NewAead, Payload};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use p256::ecdsa::signature::{Signer, Verifier};
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
use p256::elliptic_curve::sec1::ToEncodedPoint;
use p256::{ecdh::EphemeralSecret, PublicKey};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256, Sha384};

use crate::error::{Result, TlsError};

pub const GCM_TAG_SIZE: usize = 16;
pub const GCM_EXPLICIT_NONCE_SIZE: usize = 8;
pub const GCM_FIXED_IV_SIZE: usize = 4;
pub const GCM_NONCE_SIZE: usize = GCM_FIXED_IV_SIZE + GCM_EXPLICIT_NONCE_SIZE;

/// Fills `out` with cryptographically secure random bytes.
pub fn fill_random(out: &mut [u8]) {
    OsRng.fill_bytes(out);
}

pub fn random_array<const N: usize>() -> [u8; N] {
    let mut out = [0u8; N];
    fill_random(&mut out);
    out
}

pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

pub fn sha384(data: &[u8]) -> [u8; 48] {
    let mut hasher = Sha384::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Seals `plaintext` under AES-256-GCM, returning `ciphertext || tag`.
/// `nonce` is the full 12-byte GCM nonce (fixed IV || explicit nonce).
pub fn aes256_gcm_seal(key: &[u8; 32], nonce: &[u8; GCM_NONCE_SIZE], aad: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm::new(Key::from_slice(key));
    cipher
        .encrypt(Nonce::from_slice(nonce), Payload { msg: plaintext, aad })
        .map_err(|_| TlsError::CryptoFailure("AES-256-GCM seal failed"))
}

/// Opens an AES-256-GCM ciphertext of the form `ciphertext || tag`.
pub fn aes256_gcm_open(key: &[u8; 32], nonce: &[u8; GCM_NONCE_SIZE], aad: &[u8], ciphertext_and_tag: &[u8]) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm::new(Key::from_slice(key));
    cipher
        .decrypt(Nonce::from_slice(nonce), Payload { msg: ciphertext_and_tag, aad })
        .map_err(|_| TlsError::DecryptError("AEAD authentication failed"))
}

/// An ephemeral P-256 keypair generated fresh for one ClientKeyExchange.
pub struct EphemeralKeypair {
    secret: EphemeralSecret,
    public: PublicKey,
}

impl EphemeralKeypair {
    pub fn generate() -> Self {
        let secret = EphemeralSecret::random(&mut OsRng);
        let public = PublicKey::from(&secret);
        EphemeralKeypair { secret, public }
    }

    /// SEC1 uncompressed encoding: `0x04 || X(32) || Y(32)`, 65 bytes.
    pub fn public_sec1_uncompressed(&self) -> [u8; 65] {
        let point = self.public.to_encoded_point(false);
        let mut out = [0u8; 65];
        out.copy_from_slice(point.as_bytes());
        out
    }

    /// Raw ECDH shared X-coordinate, fed directly into the PRF as the
    /// pre-master secret (no extra hashing, unlike brontide's Noise-style
    /// `ecdh()` which hashes the shared point).
    pub fn diffie_hellman(&self, peer_public: &PublicKey) -> [u8; 32] {
        let shared = self.secret.diffie_hellman(peer_public);
        let mut out = [0u8; 32];
        out.copy_from_slice(shared.raw_secret_bytes().as_slice());
        out
    }
}

pub fn parse_sec1_public_key(bytes: &[u8]) -> Result<PublicKey> {
    PublicKey::from_sec1_bytes(bytes).map_err(|_| TlsError::CryptoFailure("invalid P-256 public key"))
}

/// Signs `data` with ECDSA-P256-SHA256, returning a DER-encoded signature
/// (matching the original driver's OpenSSL `EVP_DigestSign` default
/// encoding rather than a fixed-width r||s pair).
pub fn ecdsa_sign_sha256(signing_key: &SigningKey, data: &[u8]) -> Vec<u8> {
    let sig: Signature = signing_key.sign(data);
    sig.to_der().as_bytes().to_vec()
}

pub fn ecdsa_verify_sha256(verifying_key: &VerifyingKey, data: &[u8], signature_der: &[u8]) -> Result<()> {
    let sig = Signature::from_der(signature_der).map_err(|_| TlsError::CryptoFailure("malformed ECDSA signature"))?;
    verifying_key
        .verify(data, &sig)
        .map_err(|_| TlsError::CryptoFailure("ECDSA signature verification failed"))
}
