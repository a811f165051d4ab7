//! HTTP application commands
//!
//! A bearer must be open before `+HTTPACTION` can reach the network. The
//! modem keeps one HTTP session at a time; it is allocated by `+HTTPINIT`
//! and must be released with `+HTTPTERM` whatever the outcome of the
//! request, otherwise the next `+HTTPINIT` fails.

pub mod responses;
pub mod types;

use atat::atat_derive::AtatCmd;
use responses::HttpActionResult;
use types::HttpMethod;

use super::NoResponse;

/// Initialize HTTP service +HTTPINIT
#[derive(Clone, AtatCmd)]
#[at_cmd("+HTTPINIT", NoResponse, timeout_ms = 1000)]
pub struct HttpInit;

/// Terminate HTTP service +HTTPTERM
#[derive(Clone, AtatCmd)]
#[at_cmd("+HTTPTERM", NoResponse, timeout_ms = 10000)]
pub struct HttpTerm;

/// HTTP parameter `CID` +HTTPPARA
///
/// Binds the HTTP session to a bearer profile.
#[derive(Clone, AtatCmd)]
#[at_cmd("+HTTPPARA=\"CID\",", NoResponse, value_sep = false, timeout_ms = 1000)]
pub struct SetHttpBearer {
    #[at_arg(position = 0)]
    pub cid: u8,
}

/// HTTP parameter `URL` +HTTPPARA
#[derive(Clone, AtatCmd)]
#[at_cmd("+HTTPPARA=\"URL\",", NoResponse, value_sep = false, timeout_ms = 15000)]
pub struct SetHttpUrl<'a> {
    #[at_arg(position = 0, len = 256)]
    pub url: &'a str,
}

/// HTTP parameter `CONTENT` +HTTPPARA
#[derive(Clone, AtatCmd)]
#[at_cmd("+HTTPPARA=\"CONTENT\",", NoResponse, value_sep = false, timeout_ms = 1000)]
pub struct SetHttpContentType<'a> {
    #[at_arg(position = 0, len = 64)]
    pub content_type: &'a str,
}

/// Input HTTP data +HTTPDATA
///
/// Declares the size of the request body. The modem answers `DOWNLOAD` and
/// then expects exactly `len` raw bytes within `input_time_ms`.
#[derive(Clone, AtatCmd)]
#[at_cmd("+HTTPDATA", NoResponse, timeout_ms = 5000)]
pub struct HttpData {
    #[at_arg(position = 0)]
    pub len: usize,
    #[at_arg(position = 1)]
    pub input_time_ms: u32,
}

/// HTTP method action +HTTPACTION
///
/// The immediate `OK` only acknowledges the request. Completion is reported
/// later as `+HTTPACTION: <method>,<status>,<len>`.
#[derive(Clone, AtatCmd)]
#[at_cmd("+HTTPACTION", HttpActionResult, timeout_ms = 30000)]
pub struct HttpAction {
    #[at_arg(position = 0)]
    pub method: HttpMethod,
}

/// Read the HTTP server response +HTTPREAD
#[derive(Clone, AtatCmd)]
#[at_cmd("+HTTPREAD", NoResponse, timeout_ms = 13000)]
pub struct HttpRead {
    #[at_arg(position = 0)]
    pub offset: usize,
    #[at_arg(position = 1)]
    pub len: usize,
}
