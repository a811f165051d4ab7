use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_time::Duration;
use embedded_io_async::{Read, ReadReady, Write};

use crate::asynch::session::{Terminator, Transaction};
use crate::asynch::Supervisor;
use crate::command::sms::types::{MessageFormat, MessageService};
use crate::command::sms::{SelectMessageService, SendMessage, SetMessageFormat};
use crate::command::{OK, PROMPT};
use crate::config::ModemConfig;
use crate::error::Error;

/// Time for the network to accept a submitted message
const SUBMIT_TIMEOUT: Duration = Duration::from_secs(15);

/// Text mode SMS sender. Holds no state between messages.
pub struct SmsClient<'s, 'a, M: RawMutex, T, C> {
    supervisor: &'s Supervisor<'a, M, T, C>,
}

impl<'s, 'a, M, T, C> SmsClient<'s, 'a, M, T, C>
where
    M: RawMutex,
    T: Read + ReadReady + Write,
    C: ModemConfig,
{
    pub fn new(supervisor: &'s Supervisor<'a, M, T, C>) -> Self {
        Self { supervisor }
    }

    pub async fn send(&self, number: &str, text: &str) -> Result<(), Error> {
        self.supervisor.base_check().await?;

        let session = self.supervisor.session();
        session
            .send(
                &SelectMessageService {
                    service: MessageService::Phase2Plus,
                },
                OK,
            )
            .await
            .inspect_err(|_| error!("CSMS failed"))?;
        session
            .send(
                &SetMessageFormat {
                    format: MessageFormat::Text,
                },
                OK,
            )
            .await
            .inspect_err(|_| error!("CMGF failed"))?;
        session
            .send(&SendMessage { number }, PROMPT)
            .await
            .inspect_err(|_| error!("CMGS to {} failed", number))?;

        let body = Transaction::new(text.as_bytes(), OK, SUBMIT_TIMEOUT)
            .with_terminator(Terminator::CtrlZ);
        session
            .execute(&body, None)
            .await
            .inspect_err(|_| error!("Message to {} was not accepted", number))?;

        info!("Message sent to {}", number);
        Ok(())
    }
}
