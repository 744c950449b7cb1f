//! Long-term, device-bound credentials the session core borrows from an
//! external pairing component. Grounded on `SensorPairingData` as
//! referenced throughout the original driver (client certificate bytes
//! sent in the Certificate message, the client's private key used to sign
//! CertificateVerify, and the peer's certified P-256 point used directly
//! for static ECDH under this ECDH_ECDSA suite).
//!
//! Producing a `PairingData` — generating or importing the host keypair,
//! exchanging certificates with the sensor during pairing, persisting the
//! result — is out of scope here; the original driver's own
//! `generate_hs_priv_key`/`create_host_certificate`/`free_pairing_data`
//! are left as `FIXME`-marked stubs, confirming this boundary.

use p256::ecdsa::SigningKey;
use p256::PublicKey;

/// Credential bundle supplied by the pairing component, borrowed for the
/// lifetime of a [`crate::session::Session`].
pub struct PairingData {
    /// Raw bytes of our own certificate, sent verbatim in the Certificate
    /// handshake message. Its length is this dialect's `CERTIFICATE_SIZE`.
    pub client_cert_raw: Vec<u8>,

    /// Our long-term ECDSA private key, used to sign CertificateVerify.
    pub client_private_key: SigningKey,

    /// Raw bytes of the peer's certificate, as exchanged during pairing.
    /// Carried for completeness / debug representation; this core does
    /// not parse or re-validate it at handshake time.
    pub remote_cert_raw: Vec<u8>,

    /// The peer's certified P-256 point, used directly as the static ECDH
    /// peer for the client's ephemeral key (this suite performs ECDH
    /// against the certified key, not an ephemeral one signed by it).
    pub remote_cert_public_key: PublicKey,
}

impl PairingData {
    pub fn new(client_cert_raw: Vec<u8>, client_private_key: SigningKey, remote_cert_raw: Vec<u8>, remote_cert_public_key: PublicKey) -> Self {
        PairingData { client_cert_raw, client_private_key, remote_cert_raw, remote_cert_public_key }
    }

    pub fn certificate_size(&self) -> usize {
        self.client_cert_raw.len()
    }
}
