//! Argument and parameter types used by Short Messages Service Commands
use atat::atat_derive::AtatEnum;

#[derive(Debug, Clone, Copy, PartialEq, Eq, AtatEnum)]
pub enum MessageService {
    /// 3GPP TS 23.040 / 23.041 phase 2
    Phase2 = 0,
    /// Phase 2+ features supported
    Phase2Plus = 1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, AtatEnum)]
pub enum MessageFormat {
    Pdu = 0,
    Text = 1,
}
