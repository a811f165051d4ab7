use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_time::Timer;
use embedded_io_async::{Read, ReadReady, Write};
use serde::Deserialize;

use super::envelope::{DeviceId, Envelope, Event};
use super::MqttClient;
use crate::asynch::dispatcher::extract_document;
use crate::config::ModemConfig;
use crate::error::Error;

const REPLY_BUF_SIZE: usize = 512;
const SUCCESS: u16 = 200;

#[derive(Debug, Deserialize)]
struct PingReply {
    code: u16,
}

/// Periodic ping towards the platform.
///
/// [`run`](Self::run) stops at the first failed ping and hands the error back
/// to the caller; retrying is left to whoever supervises the task.
pub struct Heartbeat<'c, 's, 'a, M: RawMutex, T, C> {
    client: &'c MqttClient<'s, 'a, M, T, C>,
}

impl<'c, 's, 'a, M, T, C> Heartbeat<'c, 's, 'a, M, T, C>
where
    M: RawMutex,
    T: Read + ReadReady + Write,
    C: ModemConfig,
{
    pub fn new(client: &'c MqttClient<'s, 'a, M, T, C>) -> Self {
        Self { client }
    }

    pub async fn run(&mut self) -> Error {
        loop {
            if let Err(e) = self.beat().await {
                error!("Heartbeat failed, stopping: {:?}", e);
                return e;
            }
            Timer::after(C::HEARTBEAT_PERIOD).await;
        }
    }

    /// Publish one ping and check the status code of the reply.
    pub async fn beat(&mut self) -> Result<(), Error> {
        let device_id = self.client.client_id();
        let envelope = Envelope {
            topic: C::HEARTBEAT_TOPIC,
            data: DeviceId { device_id },
            event: Event::Ping,
            id: device_id,
            time: self.client.supervisor().timestamp().await?,
            ttl: C::MESSAGE_TTL,
        };

        let mut reply = [0u8; REPLY_BUF_SIZE];
        let res = self
            .client
            .publish_into(&envelope, None, Some(&mut reply[..]))
            .await?;

        let document = extract_document(&reply[..res.len]);
        let (ack, _) = serde_json_core::from_str::<PingReply>(document)?;
        if ack.code != SUCCESS {
            warn!("Heartbeat answered with code {}", ack.code);
            return Err(Error::UnexpectedStatus(ack.code));
        }

        trace!("Heartbeat acknowledged");
        Ok(())
    }
}
