use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_time::{Duration, Timer};
use embedded_io_async::{Read, ReadReady, Write};

use super::session::{Session, NOTIFICATION_SIZE};
use crate::error::Error;
use crate::module_timing::LISTEN_INTERVAL;

/// Background poller for unsolicited modem output.
///
/// Between transactions it reads whatever the modem pushed and queues frames
/// carrying the incoming message marker. It holds the channel for one poll
/// slice, plus the time to finish a frame cut by the end of the slice, and
/// skips a round when a transaction is running.
pub struct Listener<'a, M: RawMutex, T> {
    session: &'a Session<M, T>,
    interval: Duration,
}

impl<'a, M, T> Listener<'a, M, T>
where
    M: RawMutex,
    T: Read + ReadReady + Write,
{
    pub fn new(session: &'a Session<M, T>) -> Self {
        Self {
            session,
            interval: LISTEN_INTERVAL,
        }
    }

    pub fn with_interval(self, interval: Duration) -> Self {
        Self { interval, ..self }
    }

    /// Runs a single listening round.
    pub async fn poll(&mut self) -> Result<(), Error> {
        if !self.session.is_ready() {
            return Err(Error::NotInitialized);
        }

        let mut buf = [0u8; NOTIFICATION_SIZE];
        self.session.poll_unsolicited(&mut buf).await
    }

    pub async fn run(&mut self) -> ! {
        loop {
            match self.poll().await {
                Ok(()) | Err(Error::NotInitialized) | Err(Error::Busy) => {}
                Err(e) => error!("Listener failed to read channel: {:?}", e),
            }
            Timer::after(self.interval).await;
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::asynch::dispatcher::extract_document;
    use crate::asynch::session::Transaction;
    use crate::command::OK;
    use crate::test_helpers::{setup_logger, MockModem};
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;

    #[tokio::test]
    async fn queues_pushed_message() {
        setup_logger();
        let modem = MockModem::new();
        let session: Session<NoopRawMutex, _> = Session::new(modem.clone());
        session.init();
        let mut listener = Listener::new(&session);

        modem.push_unsolicited("\r\n+MSUB: \"/dev/1\",12 byte,{\"cmd\":\"on\"}\r\n");
        listener.poll().await.unwrap();

        let frame = session.notifications().try_receive().unwrap();
        assert!(frame.starts_with(b"+MSUB:"));
    }

    #[tokio::test]
    async fn completes_frame_split_across_reads() {
        setup_logger();
        let modem = MockModem::new();
        let session: Session<NoopRawMutex, _> = Session::new(modem.clone());
        session.init();
        let mut listener = Listener::new(&session);

        modem.push_unsolicited("+MSUB: \"/t\",9 byte,{\"a\"");
        let (polled, _) = tokio::join!(listener.poll(), async {
            Timer::after_millis(2).await;
            modem.push_unsolicited(":1}\r\n");
        });
        polled.unwrap();

        let frame = session.notifications().try_receive().unwrap();
        assert_eq!(extract_document(&frame), r#"{"a":1}"#);
        assert!(session.notifications().try_receive().is_err());
    }

    #[tokio::test]
    async fn ignores_other_output() {
        setup_logger();
        let modem = MockModem::new();
        let session: Session<NoopRawMutex, _> = Session::new(modem.clone());
        session.init();
        let mut listener = Listener::new(&session);

        modem.push_unsolicited("\r\n+CREG: 1\r\n");
        listener.poll().await.unwrap();
        assert!(session.notifications().try_receive().is_err());

        // Nothing pending is not an error either
        listener.poll().await.unwrap();
    }

    #[tokio::test]
    async fn idle_until_initialized() {
        setup_logger();
        let modem = MockModem::new();
        let session: Session<NoopRawMutex, _> = Session::new(modem.clone());
        let mut listener = Listener::new(&session);

        modem.push_unsolicited("+MSUB: \"/t\",2 byte,{}\r\n");
        assert_eq!(listener.poll().await, Err(Error::NotInitialized));
        assert!(session.notifications().try_receive().is_err());
    }

    #[tokio::test]
    async fn yields_to_running_transaction() {
        setup_logger();
        let modem = MockModem::new();
        let session: Session<NoopRawMutex, _> = Session::new(modem.clone());
        session.init();
        let mut listener = Listener::new(&session);

        let tx = Transaction::new(b"AT+SLOW", OK, Duration::from_millis(800));
        let (res, polled) = tokio::join!(session.execute(&tx, None), async {
            Timer::after_millis(20).await;
            listener.poll().await
        });

        assert_eq!(res.unwrap_err(), Error::Timeout);
        assert_eq!(polled, Err(Error::Busy));
    }
}
