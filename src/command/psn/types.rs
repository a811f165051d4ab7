//! Argument and parameter types used by Packet Switched Data Services
use atat::atat_derive::AtatEnum;

/// First argument of `+SAPBR`
#[derive(Debug, Clone, Copy, PartialEq, Eq, AtatEnum)]
pub enum BearerAction {
    Close = 0,
    Open = 1,
    Query = 2,
    Set = 3,
}

/// Bearer state reported by `+SAPBR: <cid>,<status>,..`
#[derive(Debug, Clone, Copy, PartialEq, Eq, AtatEnum)]
pub enum BearerState {
    Connecting = 0,
    Connected = 1,
    Closing = 2,
    Closed = 3,
}
