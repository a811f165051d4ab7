//! MQTT over AT.
//!
//! The modem runs the MQTT client; the host configures it, publishes
//! serialized [`Envelope`]s and receives pushed messages through the
//! notification queue.

pub mod envelope;
pub mod heartbeat;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_time::Duration;
use embedded_io_async::{Read, ReadReady, Write};
use heapless::String;
use serde::Serialize;

use crate::asynch::session::{contains, Response, Terminator, Transaction};
use crate::asynch::Supervisor;
use crate::command::mqtt::types::{CleanSession, QoS};
use crate::command::mqtt::{
    MqttClose, MqttConfig, MqttConnect, MqttDisconnect, MqttPublish, MqttStart, MqttSubscribe,
    ALREADY_CONNECT, CONNACK_OK, CONNECT, CONNECT_OK, MESSAGE_URC, SUBACK,
};
use crate::command::{OK, PROMPT};
use crate::config::ModemConfig;
use crate::error::Error;
use crate::fmt::LossyStr;

pub use envelope::{DeviceCategory, DeviceId, DeviceRegistration, Envelope, Event};
pub use heartbeat::Heartbeat;

/// Largest serialized envelope
pub const MAX_PAYLOAD: usize = 512;

const KEEPALIVE_SECS: u16 = 120;
const ACK_TIMEOUT: Duration = Duration::from_secs(5);
const START_BUF_SIZE: usize = 128;

/// Broker credentials and address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MqttSession<'a> {
    pub client_id: &'a str,
    pub username: &'a str,
    pub password: &'a str,
    pub server: &'a str,
    pub port: u16,
}

impl MqttSession<'_> {
    pub fn validate(&self) -> Result<(), Error> {
        if self.client_id.is_empty()
            || self.username.is_empty()
            || self.password.is_empty()
            || self.server.is_empty()
            || self.port == 0
        {
            return Err(Error::InvalidConfig);
        }
        Ok(())
    }
}

pub struct MqttClient<'s, 'a, M: RawMutex, T, C> {
    supervisor: &'s Supervisor<'a, M, T, C>,
    config: MqttSession<'s>,
}

impl<'s, 'a, M, T, C> MqttClient<'s, 'a, M, T, C>
where
    M: RawMutex,
    T: Read + ReadReady + Write,
    C: ModemConfig,
{
    pub fn new(supervisor: &'s Supervisor<'a, M, T, C>, config: MqttSession<'s>) -> Self {
        Self { supervisor, config }
    }

    pub fn supervisor(&self) -> &'s Supervisor<'a, M, T, C> {
        self.supervisor
    }

    pub fn client_id(&self) -> &'s str {
        self.config.client_id
    }

    /// Configure the client, open the broker connection and run the MQTT
    /// handshake.
    ///
    /// A broker connection that is already open counts as success. A failed
    /// handshake cannot be recovered without a cold restart, which is
    /// triggered before [`Error::Unrecoverable`] is returned.
    pub async fn connect(&self) -> Result<(), Error> {
        self.config
            .validate()
            .inspect_err(|_| error!("Incomplete MQTT configuration"))?;

        self.supervisor.base_check().await?;
        self.supervisor.activate_data_context().await?;

        let session = self.supervisor.session();
        session
            .send(
                &MqttConfig {
                    client_id: self.config.client_id,
                    username: self.config.username,
                    password: self.config.password,
                },
                OK,
            )
            .await
            .inspect_err(|_| error!("MCONFIG failed"))?;

        let mut buf = [0u8; START_BUF_SIZE];
        let res = session
            .send_into(
                &MqttStart {
                    server: self.config.server,
                    port: self.config.port,
                },
                CONNECT,
                &mut buf,
            )
            .await
            .inspect_err(|_| error!("MIPSTART failed"))?;
        let reply = &buf[..res.len];
        if contains(reply, ALREADY_CONNECT.as_bytes()) {
            info!("Broker connection already open");
        } else if !contains(reply, CONNECT_OK.as_bytes()) {
            error!("MIPSTART refused: {:?}", LossyStr(reply));
            return Err(Error::MalformedResponse);
        }

        let handshake = MqttConnect {
            clean_session: CleanSession::Clean,
            keepalive: KEEPALIVE_SECS,
        };
        if session.send(&handshake, CONNACK_OK).await.is_err() {
            error!("MCONNECT failed");
            self.supervisor.cold_restart().await;
            return Err(Error::Unrecoverable);
        }

        info!("MQTT session established as {}", self.config.client_id);
        Ok(())
    }

    /// Tear down the MQTT session and the broker connection.
    pub async fn disconnect(&self) -> Result<(), Error> {
        let session = self.supervisor.session();
        session
            .send(&MqttDisconnect, OK)
            .await
            .inspect_err(|_| error!("MDISCONNECT failed"))?;
        session
            .send(&MqttClose, OK)
            .await
            .inspect_err(|_| error!("MIPCLOSE failed"))?;
        Ok(())
    }

    /// Best effort: a failed subscription is logged and otherwise ignored,
    /// subscriptions are issued again on the next connect.
    pub async fn subscribe(&self, topic: &str) {
        let cmd = MqttSubscribe {
            topic,
            qos: QoS::AtMostOnce,
        };
        match self.supervisor.session().send(&cmd, SUBACK).await {
            Ok(_) => debug!("Subscribed to {}", topic),
            Err(e) => error!("MSUB {} failed: {:?}", topic, e),
        }
    }

    pub async fn publish<D: Serialize>(
        &self,
        envelope: &Envelope<'_, D>,
        ack: Option<&str>,
    ) -> Result<(), Error> {
        self.publish_into(envelope, ack, None).await.map(drop)
    }

    /// Publish `envelope` and wait for `ack`, copying the reply into `out`.
    ///
    /// `ack` defaults to the incoming message marker, for platforms that
    /// answer on a subscribed topic. The acknowledgement is consumed here
    /// and never reaches the notification queue.
    pub async fn publish_into<D: Serialize>(
        &self,
        envelope: &Envelope<'_, D>,
        ack: Option<&str>,
        out: Option<&mut [u8]>,
    ) -> Result<Response, Error> {
        envelope.validate()?;
        let payload: String<MAX_PAYLOAD> = serde_json_core::to_string(envelope)?;

        let session = self.supervisor.session();
        let intent = MqttPublish {
            topic: envelope.topic,
            qos: QoS::AtMostOnce,
            retain: 0,
            len: payload.len(),
        };
        session
            .send(&intent, PROMPT)
            .await
            .inspect_err(|_| error!("MPUBEX to {} failed", envelope.topic))?;

        let tx = Transaction::new(payload.as_bytes(), ack.unwrap_or(MESSAGE_URC), ACK_TIMEOUT)
            .with_terminator(Terminator::None);
        session
            .execute(&tx, out)
            .await
            .inspect_err(|_| error!("No acknowledgement for {:?}", envelope.event))
    }

    /// Announce this device to the platform.
    pub async fn register_device(
        &self,
        topic: &str,
        device_name: &str,
        category: DeviceCategory,
        ack: Option<&str>,
    ) -> Result<(), Error> {
        let envelope = Envelope {
            topic,
            data: DeviceRegistration {
                device_id: self.config.client_id,
                device_name,
                device_cate: category,
                mqtt_user_name: self.config.username,
            },
            event: Event::RegistDevice,
            id: self.config.client_id,
            time: self.supervisor.timestamp().await?,
            ttl: C::MESSAGE_TTL,
        };
        self.publish(&envelope, ack).await
    }
}
