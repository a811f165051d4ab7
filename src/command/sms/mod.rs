//! ### Short Messages Service

pub mod types;

use atat::atat_derive::AtatCmd;
use types::{MessageFormat, MessageService};

use super::NoResponse;

/// Select message service +CSMS
#[derive(Clone, AtatCmd)]
#[at_cmd("+CSMS", NoResponse, timeout_ms = 1000)]
pub struct SelectMessageService {
    #[at_arg(position = 0)]
    pub service: MessageService,
}

/// Message format +CMGF
#[derive(Clone, AtatCmd)]
#[at_cmd("+CMGF", NoResponse, timeout_ms = 1000)]
pub struct SetMessageFormat {
    #[at_arg(position = 0)]
    pub format: MessageFormat,
}

/// Send message +CMGS
///
/// In text mode the modem answers with the `>` prompt; the message text
/// follows, submitted by Ctrl-Z.
#[derive(Clone, AtatCmd)]
#[at_cmd("+CMGS", NoResponse, timeout_ms = 3000)]
pub struct SendMessage<'a> {
    #[at_arg(position = 0, len = 32)]
    pub number: &'a str,
}
