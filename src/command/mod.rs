//! AT command vocabulary of SIMCom/Luat style cellular modems.
//!
//! Every command carries its own timeout. The session engine decides success
//! by searching the reply for an expected token, so response types are only
//! declared where a structured line has to be scanned afterwards.

pub mod general;
pub mod http;
pub mod mqtt;
pub mod psn;
pub mod sms;

use atat::atat_derive::{AtatCmd, AtatResp};

#[derive(Clone, AtatResp)]
pub struct NoResponse;

/// Plain liveness probe
#[derive(Clone, AtatCmd)]
#[at_cmd("", NoResponse, timeout_ms = 5000)]
pub struct AT;

/// Final result code of a successful command
pub const OK: &str = "OK";

/// Prompt emitted when the modem is ready to take a raw payload
pub const PROMPT: &str = ">";

/// Returns the line of `raw` that starts at the first occurrence of `prefix`,
/// without its line terminator.
pub(crate) fn response_line<'a>(raw: &'a str, prefix: &str) -> Option<&'a str> {
    let start = raw.find(prefix)?;
    let line = &raw[start..];
    let end = line.find(|c| c == '\r' || c == '\n').unwrap_or(line.len());
    Some(&line[..end])
}
