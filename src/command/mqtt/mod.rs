//! MQTT client commands
//!
//! The modem runs the MQTT client itself. A session is opened in three
//! steps: credentials (`+MCONFIG`), TCP connection to the broker
//! (`+MIPSTART`) and the MQTT handshake (`+MCONNECT`). Messages published on
//! subscribed topics are pushed to the host as unsolicited `+MSUB:` lines.

pub mod types;

use atat::atat_derive::AtatCmd;
use types::{CleanSession, QoS};

use super::NoResponse;

/// Marker of an unsolicited incoming message:
/// `+MSUB: "<topic>",<len> byte,<payload>`
pub const MESSAGE_URC: &str = "+MSUB:";

/// Broker TCP connection established
pub const CONNECT_OK: &str = "CONNECT OK";
/// Broker TCP connection was already up
pub const ALREADY_CONNECT: &str = "ALREADY CONNECT";
/// Common part of both `+MIPSTART` outcomes and its failure report
pub const CONNECT: &str = "CONNECT";
pub const CONNACK_OK: &str = "CONNACK OK";
pub const SUBACK: &str = "SUBACK";

/// Set MQTT related parameters +MCONFIG
#[derive(Clone, AtatCmd)]
#[at_cmd("+MCONFIG", NoResponse, timeout_ms = 1000)]
pub struct MqttConfig<'a> {
    #[at_arg(position = 0, len = 64)]
    pub client_id: &'a str,
    #[at_arg(position = 1, len = 64)]
    pub username: &'a str,
    #[at_arg(position = 2, len = 64)]
    pub password: &'a str,
}

/// Establish TCP connection to the broker +MIPSTART
#[derive(Clone, AtatCmd)]
#[at_cmd("+MIPSTART", NoResponse, timeout_ms = 10000)]
pub struct MqttStart<'a> {
    #[at_arg(position = 0, len = 128)]
    pub server: &'a str,
    #[at_arg(position = 1)]
    pub port: u16,
}

/// Client-to-server MQTT connect request +MCONNECT
#[derive(Clone, AtatCmd)]
#[at_cmd("+MCONNECT", NoResponse, timeout_ms = 3000)]
pub struct MqttConnect {
    #[at_arg(position = 0)]
    pub clean_session: CleanSession,
    #[at_arg(position = 1)]
    pub keepalive: u16,
}

/// Subscribe packet +MSUB
#[derive(Clone, AtatCmd)]
#[at_cmd("+MSUB", NoResponse, timeout_ms = 3000)]
pub struct MqttSubscribe<'a> {
    #[at_arg(position = 0, len = 128)]
    pub topic: &'a str,
    #[at_arg(position = 1)]
    pub qos: QoS,
}

/// Publish packet with raw payload +MPUBEX
///
/// The modem answers with the `>` prompt and then reads exactly `len` bytes
/// of payload.
#[derive(Clone, AtatCmd)]
#[at_cmd("+MPUBEX", NoResponse, timeout_ms = 1000)]
pub struct MqttPublish<'a> {
    #[at_arg(position = 0, len = 128)]
    pub topic: &'a str,
    #[at_arg(position = 1)]
    pub qos: QoS,
    #[at_arg(position = 2)]
    pub retain: u8,
    #[at_arg(position = 3)]
    pub len: usize,
}

/// Disconnect MQTT session +MDISCONNECT
#[derive(Clone, AtatCmd)]
#[at_cmd("+MDISCONNECT", NoResponse, timeout_ms = 1000)]
pub struct MqttDisconnect;

/// Close the broker TCP connection +MIPCLOSE
#[derive(Clone, AtatCmd)]
#[at_cmd("+MIPCLOSE", NoResponse, timeout_ms = 1000)]
pub struct MqttClose;
