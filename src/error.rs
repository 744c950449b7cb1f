use thiserror::Error;

/// TLS alert description values relevant to this dialect (RFC 5246 §7.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AlertDescription {
    CloseNotify = 0,
    UnexpectedMessage = 10,
    BadRecordMac = 20,
    DecryptError = 51,
    DecodeError = 50,
    ProtocolVersion = 70,
    HandshakeFailure = 40,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertLevel {
    Warning = 1,
    Fatal = 2,
}

/// Errors produced by the session core.
///
/// Every variant except `Closed` and the recoverable `PeerCloseNotify` is
/// fatal: the session that produced it must not be reused.
#[derive(Debug, Error)]
pub enum TlsError {
    #[error("protocol mismatch: {0}")]
    ProtocolMismatch(&'static str),

    #[error("unexpected message in phase: {0}")]
    UnexpectedMessage(&'static str),

    #[error("decrypt error: {0}")]
    DecryptError(&'static str),

    #[error("decode error: {0}")]
    DecodeError(&'static str),

    #[error("session is closed")]
    Closed,

    #[error("cryptographic operation failed: {0}")]
    CryptoFailure(&'static str),

    #[error("peer sent a fatal alert: level={level:?} description={description}")]
    PeerFatalAlert { level: AlertLevel, description: u8 },
}

impl TlsError {
    /// The alert this error would cause the local side to emit, if any.
    /// `CryptoFailure` and `PeerFatalAlert` have no outbound alert: state
    /// may already be inconsistent, or the peer has already told us why.
    pub fn outbound_alert(&self) -> Option<AlertDescription> {
        match self {
            TlsError::ProtocolMismatch(_) => Some(AlertDescription::HandshakeFailure),
            TlsError::UnexpectedMessage(_) => Some(AlertDescription::UnexpectedMessage),
            TlsError::DecryptError(_) => Some(AlertDescription::BadRecordMac),
            TlsError::DecodeError(_) => Some(AlertDescription::DecodeError),
            TlsError::Closed | TlsError::CryptoFailure(_) | TlsError::PeerFatalAlert { .. } => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, TlsError>;
