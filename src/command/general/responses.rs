//! Responses for General Commands
use atat::atat_derive::AtatResp;
use heapless::String;

use crate::command::response_line;
use crate::error::Error;

pub const CLOCK_PREFIX: &str = "+CCLK:";

/// +CCLK
#[derive(Debug, Clone, PartialEq, AtatResp)]
pub struct NetworkClock {
    #[at_arg(position = 0)]
    pub time: String<32>,
}

impl NetworkClock {
    /// Scans the `+CCLK: "<time>"` line out of a raw reply.
    pub fn scan(raw: &str) -> Result<Self, Error> {
        let line = response_line(raw, CLOCK_PREFIX).ok_or(Error::MalformedResponse)?;
        atat::serde_at::de::from_str(line).map_err(|_| Error::MalformedResponse)
    }
}
