//! TLS alert record body: `level(1) || description(1)`. Grounded on
//! `tls_session_send_alert`/the `SSL3_RT_ALERT` case of
//! `tls_session_receive`.

use crate::error::{AlertDescription, AlertLevel};

pub fn build(level: AlertLevel, description: AlertDescription) -> Vec<u8> {
    vec![level as u8, description as u8]
}

pub const LEVEL_FATAL: u8 = 2;
pub const DESCRIPTION_CLOSE_NOTIFY: u8 = 0;
