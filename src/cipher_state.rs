//! Per-direction AEAD record protection (C5). Shaped after brontide's
//! `CipherState` (a struct owning a nonce counter, key, and salt with
//! `encrypt`/`decrypt`/`initialize_key` methods) but generalized from
//! ChaCha20-Poly1305's implicit monotonic nonce to AES-256-GCM's
//! fixed-IV-plus-explicit-nonce construction, and with no key-rotation
//! ratchet: this dialect activates a cipher state exactly once per
//! direction and never rekeys (see Non-goals in SPEC_FULL.md).
//!
//! Unlike brontide, a `CipherState` here also owns writing/parsing the
//! outer record header, because that's what the original driver's
//! `tls_session_encrypt`/`tls_session_decrypt` do — the AAD is only
//! correct if it's built from the same length/version/type that go on
//! the wire, so keeping them in one place avoids them drifting apart.

use zeroize::Zeroize;

use crate::codec::{Reader, Writer};
use crate::crypto::{self, GCM_FIXED_IV_SIZE, GCM_NONCE_SIZE, GCM_TAG_SIZE};
use crate::error::{Result, TlsError};
use crate::record::ContentType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CipherSuite {
    NullWithNullNull,
    EcdhEcdsaAes256GcmSha384,
}

/// The key material installed for one direction when the suite activates.
/// Zeroized on drop since it's derived from the master secret.
#[derive(Zeroize)]
#[zeroize(drop)]
pub struct DirectionKeys {
    pub key: [u8; 32],
    pub fixed_iv: [u8; GCM_FIXED_IV_SIZE],
}

pub struct CipherState {
    suite: CipherSuite,
    keys: Option<DirectionKeys>,
    seq_num: u64,
}

impl CipherState {
    pub fn null() -> Self {
        CipherState { suite: CipherSuite::NullWithNullNull, keys: None, seq_num: 0 }
    }

    pub fn suite(&self) -> CipherSuite {
        self.suite
    }

    /// Installs the negotiated suite's key material and resets the
    /// sequence number to zero (I2).
    pub fn activate(&mut self, keys: DirectionKeys) {
        self.suite = CipherSuite::EcdhEcdsaAes256GcmSha384;
        self.keys = Some(keys);
        self.seq_num = 0;
    }

    /// Produces the full outer record: `type || version(LE) || length(BE)
    /// || payload`, where `payload` is AEAD-sealed iff the suite is
    /// active. The version field is written little-endian, mirroring the
    /// original driver's `tls_session_encrypt` (Q7 in SPEC_FULL.md) even
    /// though every other version field in this codebase is big-endian.
    pub fn protect(&mut self, content_type: ContentType, version: u16, plaintext: &[u8]) -> Result<Vec<u8>> {
        let mut writer = Writer::with_capacity(plaintext.len() + 29);
        writer.put_u8(content_type as u8).put_u16_le(version);

        match self.suite {
            CipherSuite::NullWithNullNull => {
                writer.put_u16_be(plaintext.len() as u16).put_data(plaintext);
            }
            CipherSuite::EcdhEcdsaAes256GcmSha384 => {
                let keys = self.keys.as_ref().ok_or(TlsError::CryptoFailure("cipher activated without keys"))?;

                let explicit_nonce: [u8; 8] = crypto::random_array();
                let mut gcm_nonce = [0u8; GCM_NONCE_SIZE];
                gcm_nonce[..GCM_FIXED_IV_SIZE].copy_from_slice(&keys.fixed_iv);
                gcm_nonce[GCM_FIXED_IV_SIZE..].copy_from_slice(&explicit_nonce);

                let mut aad = Writer::with_capacity(13);
                aad.put_u64_be(self.seq_num).put_u8(content_type as u8).put_u16_be(version).put_u16_be(plaintext.len() as u16);

                let sealed = crypto::aes256_gcm_seal(&keys.key, &gcm_nonce, aad.as_slice(), plaintext)?;

                writer.put_u16_be((8 + sealed.len()) as u16).put_data(&explicit_nonce).put_data(&sealed);
                self.seq_num += 1;
            }
        }

        Ok(writer.take())
    }

    /// Recovers plaintext from a record fragment already split off by
    /// [`crate::record::parse_one`]. `version` is the value actually
    /// present on the wire for this record (parsed big-endian), used
    /// verbatim as the AAD version field.
    pub fn unprotect(&mut self, content_type: ContentType, version: u16, fragment: &[u8]) -> Result<Vec<u8>> {
        match self.suite {
            CipherSuite::NullWithNullNull => Ok(fragment.to_vec()),
            CipherSuite::EcdhEcdsaAes256GcmSha384 => {
                let keys = self.keys.as_ref().ok_or(TlsError::CryptoFailure("cipher activated without keys"))?;

                if fragment.len() < 8 + GCM_TAG_SIZE {
                    return Err(TlsError::DecodeError("ciphertext fragment shorter than nonce+tag"));
                }

                let mut reader = Reader::new(fragment);
                let explicit_nonce = reader.dup_data(8)?;
                let ciphertext_and_tag = reader.rest();

                let mut gcm_nonce = [0u8; GCM_NONCE_SIZE];
                gcm_nonce[..GCM_FIXED_IV_SIZE].copy_from_slice(&keys.fixed_iv);
                gcm_nonce[GCM_FIXED_IV_SIZE..].copy_from_slice(&explicit_nonce);

                let plaintext_len = ciphertext_and_tag.len() - GCM_TAG_SIZE;
                let mut aad = Writer::with_capacity(13);
                aad.put_u64_be(self.seq_num).put_u8(content_type as u8).put_u16_be(version).put_u16_be(plaintext_len as u16);

                let plaintext = crypto::aes256_gcm_open(&keys.key, &gcm_nonce, aad.as_slice(), ciphertext_and_tag)?;
                self.seq_num += 1;
                Ok(plaintext)
            }
        }
    }
}
