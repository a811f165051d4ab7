use embassy_sync::blocking_mutex::raw::RawMutex;

use super::session::{Notification, NotificationReceiver};
use crate::fmt::LossyStr;

/// Document handed to the handler when a frame carries no JSON object.
pub const EMPTY_DOCUMENT: &str = "{}";

/// Consumer of inbound platform messages.
pub trait NotificationHandler {
    /// Called with the JSON document of each pushed message, in arrival
    /// order.
    fn on_notification(&mut self, document: &str);
}

impl<F: FnMut(&str)> NotificationHandler for F {
    fn on_notification(&mut self, document: &str) {
        self(document)
    }
}

/// Extracts the JSON document embedded in a raw modem frame: everything from
/// the first `{` to the last `}`, both included.
///
/// Returns [`EMPTY_DOCUMENT`] when no well-formed pair of braces is found.
pub fn extract_document(raw: &[u8]) -> &str {
    let start = raw.iter().position(|&b| b == b'{');
    let end = raw.iter().rposition(|&b| b == b'}');

    match (start, end) {
        (Some(start), Some(end)) if start < end => {
            core::str::from_utf8(&raw[start..=end]).unwrap_or(EMPTY_DOCUMENT)
        }
        _ => EMPTY_DOCUMENT,
    }
}

/// Drains the notification queue into a [`NotificationHandler`].
pub struct Dispatcher<'a, M: RawMutex, H> {
    notifications: NotificationReceiver<'a, M>,
    handler: H,
}

impl<'a, M: RawMutex, H: NotificationHandler> Dispatcher<'a, M, H> {
    pub fn new(notifications: NotificationReceiver<'a, M>, handler: H) -> Self {
        Self {
            notifications,
            handler,
        }
    }

    pub fn dispatch(&mut self, frame: &Notification) {
        let document = extract_document(frame);
        if document == EMPTY_DOCUMENT {
            warn!("No document in notification: {:?}", LossyStr(frame));
        }
        self.handler.on_notification(document);
    }

    /// Handles every frame already queued, without waiting.
    pub fn dispatch_pending(&mut self) -> usize {
        let mut count = 0;
        while let Ok(frame) = self.notifications.try_receive() {
            self.dispatch(&frame);
            count += 1;
        }
        count
    }

    pub async fn run(&mut self) -> ! {
        loop {
            let frame = self.notifications.receive().await;
            self.dispatch(&frame);
        }
    }
}
