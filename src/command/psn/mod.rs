//! Packet switched data services: GPRS attach and bearer (PDP context)
//! management through `+SAPBR`.
//!
//! A bearer profile has to be configured (connection type and APN) and
//! opened before any IP based service (HTTP, MQTT) can be used. Opening a
//! bearer that is already open fails on most firmware, so the caller is
//! expected to query the bearer status first.

pub mod responses;
pub mod types;

use atat::atat_derive::AtatCmd;
use responses::BearerStatus;
use types::BearerAction;

use super::NoResponse;

/// GPRS attach or detach +CGATT
///
/// Read form. The reply `+CGATT: 1` means the MT is attached to the packet
/// domain.
#[derive(Clone, AtatCmd)]
#[at_cmd("+CGATT?", NoResponse, timeout_ms = 5000)]
pub struct GetGPRSAttached;

/// Bearer settings +SAPBR=3
///
/// Sets a single named parameter (`Contype`, `APN`, `USER`, `PWD`) of the
/// bearer profile identified by `cid`.
#[derive(Clone, AtatCmd)]
#[at_cmd("+SAPBR", NoResponse, timeout_ms = 5000)]
pub struct SetBearerParameter<'a> {
    #[at_arg(position = 0)]
    pub action: BearerAction,
    #[at_arg(position = 1)]
    pub cid: u8,
    #[at_arg(position = 2, len = 8)]
    pub tag: &'a str,
    #[at_arg(position = 3, len = 64)]
    pub value: &'a str,
}

impl<'a> SetBearerParameter<'a> {
    pub fn connection_type(cid: u8, value: &'a str) -> Self {
        Self {
            action: BearerAction::Set,
            cid,
            tag: "Contype",
            value,
        }
    }

    pub fn apn(cid: u8, value: &'a str) -> Self {
        Self {
            action: BearerAction::Set,
            cid,
            tag: "APN",
            value,
        }
    }
}

/// Bearer open +SAPBR=1
///
/// Network side activation may take up to 85 seconds.
#[derive(Clone, AtatCmd)]
#[at_cmd("+SAPBR", NoResponse, timeout_ms = 85000)]
pub struct OpenBearer {
    #[at_arg(position = 0)]
    pub action: BearerAction,
    #[at_arg(position = 1)]
    pub cid: u8,
}

impl OpenBearer {
    pub fn new(cid: u8) -> Self {
        Self {
            action: BearerAction::Open,
            cid,
        }
    }
}

/// Bearer query +SAPBR=2
///
/// Replies `+SAPBR: <cid>,<status>,"<ip>"`.
#[derive(Clone, AtatCmd)]
#[at_cmd("+SAPBR", BearerStatus, timeout_ms = 5000)]
pub struct QueryBearer {
    #[at_arg(position = 0)]
    pub action: BearerAction,
    #[at_arg(position = 1)]
    pub cid: u8,
}

impl QueryBearer {
    pub fn new(cid: u8) -> Self {
        Self {
            action: BearerAction::Query,
            cid,
        }
    }
}
