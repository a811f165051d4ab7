use embassy_futures::join::join;
use embassy_sync::blocking_mutex::raw::RawMutex;
use embedded_io_async::{Read, ReadReady, Write};

use super::dispatcher::{Dispatcher, NotificationHandler};
use super::listener::Listener;
use super::session::Session;

/// Background runner for the modem session.
///
/// You must call `.run()` in a background task for pushed messages to reach
/// the notification handler.
pub struct Runner<'a, M: RawMutex, T, H> {
    listener: Listener<'a, M, T>,
    dispatcher: Dispatcher<'a, M, H>,
}

impl<'a, M, T, H> Runner<'a, M, T, H>
where
    M: RawMutex,
    T: Read + ReadReady + Write,
    H: NotificationHandler,
{
    pub fn new(session: &'a Session<M, T>, handler: H) -> Self {
        Self {
            listener: Listener::new(session),
            dispatcher: Dispatcher::new(session.notifications(), handler),
        }
    }

    pub fn from_parts(listener: Listener<'a, M, T>, dispatcher: Dispatcher<'a, M, H>) -> Self {
        Self {
            listener,
            dispatcher,
        }
    }

    pub async fn run(&mut self) -> ! {
        let (never, _) = join(self.listener.run(), self.dispatcher.run()).await;
        never
    }
}
