//! Responses for Packet Switched Data Services Commands
use atat::atat_derive::AtatResp;
use heapless::String;

use super::types::BearerState;
use crate::command::response_line;
use crate::error::Error;

pub const BEARER_PREFIX: &str = "+SAPBR:";
pub const ATTACHED: &str = "+CGATT: 1";

/// Address reported for a bearer without an assigned IP
pub const NULL_ADDRESS: &str = "0.0.0.0";

/// +SAPBR
#[derive(Debug, Clone, PartialEq, AtatResp)]
pub struct BearerStatus {
    #[at_arg(position = 0)]
    pub cid: u8,
    #[at_arg(position = 1)]
    pub state: BearerState,
    #[at_arg(position = 2)]
    pub ip: String<40>,
}

impl BearerStatus {
    /// Scans the `+SAPBR: <cid>,<status>,"<ip>"` line out of a raw reply.
    pub fn scan(raw: &str) -> Result<Self, Error> {
        let line = response_line(raw, BEARER_PREFIX).ok_or(Error::MalformedResponse)?;
        atat::serde_at::de::from_str(line).map_err(|_| Error::MalformedResponse)
    }

    pub fn has_address(&self) -> bool {
        !self.ip.is_empty() && self.ip.as_str() != NULL_ADDRESS
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn scan_bearer_status() {
        let status = BearerStatus::scan("\r\n+SAPBR: 1,1,\"10.89.193.1\"\r\n\r\nOK\r\n").unwrap();
        assert_eq!(status.cid, 1);
        assert_eq!(status.state, BearerState::Connected);
        assert_eq!(status.ip.as_str(), "10.89.193.1");
        assert!(status.has_address());

        let status = BearerStatus::scan("+SAPBR: 1,3,\"0.0.0.0\"\r\nOK").unwrap();
        assert_eq!(status.state, BearerState::Closed);
        assert!(!status.has_address());
    }
}
