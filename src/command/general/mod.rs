//! General commands: identification, echo, signal quality and clock

pub mod responses;
pub mod types;

use atat::atat_derive::AtatCmd;
use responses::NetworkClock;
use types::Echo;

use super::NoResponse;

/// Integrated circuit card identifier +ICCID
///
/// Returns the ICCID of the inserted SIM. A reply carrying `+ICCID` proves the
/// SIM is present and readable.
#[derive(Clone, AtatCmd)]
#[at_cmd("+ICCID", NoResponse, timeout_ms = 5000)]
pub struct GetIccid;

/// Command echo E
///
/// With echo enabled the modem repeats every command line back, which the
/// token matcher would otherwise have to skip over.
#[derive(Clone, AtatCmd)]
#[at_cmd("E", NoResponse, value_sep = false, timeout_ms = 5000)]
pub struct SetEcho {
    #[at_arg(position = 0)]
    pub enabled: Echo,
}

/// Signal quality +CSQ
#[derive(Clone, AtatCmd)]
#[at_cmd("+CSQ", NoResponse, timeout_ms = 5000)]
pub struct GetSignalQuality;

/// Real-time clock +CCLK
///
/// Reads the network-synchronized local time as `"yy/MM/dd,hh:mm:ss±zz"`
/// where `zz` is the zone offset in quarter hours.
#[derive(Clone, AtatCmd)]
#[at_cmd("+CCLK?", NetworkClock, timeout_ms = 1000)]
pub struct GetClock;
