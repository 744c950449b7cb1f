//! Client-side TLS 1.2 session core restricted to a single cipher suite,
//! `TLS_ECDH_ECDSA_WITH_AES_256_GCM_SHA384`, for talking to a
//! match-in-sensor fingerprint device over its paired secure channel.
//!
//! This crate is a byte-in/byte-out state machine: it never touches a
//! socket, spawns a thread, or sets a timer. A caller owns the transport
//! and drives [`Session`] with [`Session::establish`],
//! [`Session::receive_ciphertext`], [`Session::flush_send_buffer`],
//! [`Session::wrap`]/[`Session::unwrap`], and [`Session::close`].

pub mod alert;
pub mod cipher_state;
pub mod codec;
pub mod crypto;
pub mod error;
pub mod handshake;
pub mod pairing;
pub mod prf;
pub mod record;
pub mod session;
pub mod transcript;

pub use error::{Result, TlsError};
pub use handshake::HandshakePhase;
pub use pairing::PairingData;
pub use session::Session;
