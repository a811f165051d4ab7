//! Responses for HTTP Commands
use atat::atat_derive::AtatResp;

use crate::command::response_line;
use crate::error::Error;

pub const ACTION_PREFIX: &str = "+HTTPACTION:";
pub const READ_PREFIX: &str = "+HTTPREAD:";
/// Token the modem emits when it is ready to receive the request body
pub const DOWNLOAD: &str = "DOWNLOAD";
/// Final result code of `+HTTPREAD`, on its own line after the body
pub const READ_DONE: &str = "\r\nOK\r\n";

/// +HTTPACTION
#[derive(Debug, Clone, Copy, PartialEq, Eq, AtatResp)]
pub struct HttpActionResult {
    #[at_arg(position = 0)]
    pub method: u8,
    #[at_arg(position = 1)]
    pub status: u16,
    #[at_arg(position = 2)]
    pub len: usize,
}

impl HttpActionResult {
    /// Scans the `+HTTPACTION: <method>,<status>,<len>` line out of a raw
    /// reply. All three fields must be present.
    pub fn scan(raw: &str) -> Result<Self, Error> {
        let line = response_line(raw, ACTION_PREFIX).ok_or(Error::MalformedResponse)?;
        atat::serde_at::de::from_str(line).map_err(|_| Error::MalformedResponse)
    }
}

/// Extracts the body from a `+HTTPREAD: <n>\r\n<body>\r\nOK` reply.
///
/// Returns at most `<n>` bytes; fewer if the reply was cut short by the
/// receive buffer.
pub fn read_body(raw: &[u8]) -> Result<&[u8], Error> {
    let prefix = READ_PREFIX.as_bytes();
    let start = raw
        .windows(prefix.len())
        .position(|w| w == prefix)
        .ok_or(Error::MalformedResponse)?;
    let header = &raw[start + prefix.len()..];
    let eol = header
        .windows(2)
        .position(|w| w == b"\r\n")
        .ok_or(Error::MalformedResponse)?;
    let len: usize = core::str::from_utf8(&header[..eol])
        .map_err(|_| Error::MalformedResponse)?
        .trim()
        .parse()
        .map_err(|_| Error::MalformedResponse)?;
    let body = &header[eol + 2..];
    Ok(&body[..len.min(body.len())])
}
