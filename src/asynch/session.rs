//! AT command session engine.
//!
//! The [`Session`] owns the serial channel. Every transaction holds the
//! channel lock from the moment the command is written until the expected
//! token is seen or the timeout runs out, so bytes of concurrent callers are
//! never interleaved and a response is always read by the caller that
//! issued the command.
//!
//! Bytes that no transaction claims are picked up by the
//! [`Listener`](super::listener::Listener), which takes the same lock
//! between transactions. Frames carrying the incoming message marker are
//! routed to a bounded notification queue, drained by the
//! [`Dispatcher`](super::dispatcher::Dispatcher).

use atat::AtatCmd;
use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::channel::{Channel, Receiver, TrySendError};
use embassy_sync::mutex::Mutex;
use embassy_time::{with_timeout, Duration, Instant, Timer};
use embedded_io_async::{Read, ReadReady, Write};
use heapless::Vec;

use super::state::{self, ChannelState};
use crate::command::mqtt::MESSAGE_URC;
use crate::error::Error;
use crate::fmt::LossyStr;
use crate::module_timing::{LINE_IDLE, LOCK_WAIT, POLL_SLICE};

/// Size of the buffer a typed command is serialized into
pub const CMD_BUF_SIZE: usize = 512;
/// Bytes of reply kept per transaction; later bytes are not stored
pub const RX_BUF_SIZE: usize = 1024;
/// Longest token a transaction can wait for
pub const MAX_TOKEN_LEN: usize = 64;
/// Largest unsolicited frame kept in the notification queue
pub const NOTIFICATION_SIZE: usize = 512;
/// Number of frames the notification queue holds before dropping
pub const NOTIFICATION_CAPACITY: usize = 10;
/// Written to the caller's buffer when a transaction times out
pub const ERROR_SENTINEL: &[u8] = b"ERROR!";

const READ_CHUNK: usize = 256;
const MAX_DISCARD_READS: usize = 16;
const MARKER_LEN: usize = MESSAGE_URC.len();

/// Raw unsolicited frame, as read from the channel.
pub type Notification = Vec<u8, NOTIFICATION_SIZE>;

pub type NotificationReceiver<'a, M> = Receiver<'a, M, Notification, NOTIFICATION_CAPACITY>;

/// Line ending appended after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Terminator {
    /// `\r`, ends a command line
    CarriageReturn,
    /// Ctrl-Z, submits a text-mode message body
    CtrlZ,
    /// Nothing; raw payloads whose length was announced beforehand
    None,
}

impl Terminator {
    fn as_bytes(self) -> &'static [u8] {
        match self {
            Terminator::CarriageReturn => b"\r",
            Terminator::CtrlZ => b"\x1a",
            Terminator::None => b"",
        }
    }
}

/// A command awaiting its response.
#[derive(Debug, Clone, Copy)]
pub struct Transaction<'a> {
    pub command: &'a [u8],
    /// Success discriminator, searched for anywhere in the reply
    pub expect: &'a str,
    pub timeout: Duration,
    pub terminator: Terminator,
}

impl<'a> Transaction<'a> {
    pub fn new(command: &'a [u8], expect: &'a str, timeout: Duration) -> Self {
        Self {
            command,
            expect,
            timeout,
            terminator: Terminator::CarriageReturn,
        }
    }

    pub fn with_terminator(self, terminator: Terminator) -> Self {
        Self { terminator, ..self }
    }
}

/// Outcome of a successful transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Response {
    /// Bytes copied to the caller's buffer
    pub len: usize,
    /// The reply did not fit the caller's buffer or the receive buffer
    pub truncated: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Progress {
    Waiting,
    /// Token seen, the line carrying it is still open
    InLine,
    Done,
}

/// Reply of a running transaction.
///
/// The head of the reply is stored for the caller. The token is searched in
/// a short window of the most recent bytes, so it is found however the reply
/// is split across reads and however long it gets.
struct Reply<'e> {
    expect: &'e [u8],
    head: Vec<u8, RX_BUF_SIZE>,
    overflowed: bool,
    recent: Vec<u8, MAX_TOKEN_LEN>,
    progress: Progress,
}

impl<'e> Reply<'e> {
    fn new(expect: &'e [u8]) -> Self {
        Self {
            expect,
            head: Vec::new(),
            overflowed: false,
            recent: Vec::new(),
            progress: Progress::Waiting,
        }
    }

    fn push(&mut self, b: u8) {
        self.overflowed |= self.head.push(b).is_err();
        match self.progress {
            Progress::Waiting => {
                slide(&mut self.recent, b);
                if self.recent.ends_with(self.expect) {
                    self.progress = if b == b'\n' {
                        Progress::Done
                    } else {
                        Progress::InLine
                    };
                }
            }
            Progress::InLine if b == b'\n' => self.progress = Progress::Done,
            _ => {}
        }
    }

    fn matched(&self) -> bool {
        self.progress != Progress::Waiting
    }

    fn is_done(&self) -> bool {
        self.progress == Progress::Done
    }
}

/// Reassembles incoming message frames from arbitrarily split reads. A frame
/// runs from the marker to the end of its line, or until it fills up.
#[derive(Default)]
struct FrameCollector {
    recent: Vec<u8, MARKER_LEN>,
    frame: Option<Notification>,
}

impl FrameCollector {
    fn is_pending(&self) -> bool {
        self.frame.is_some()
    }

    /// Feeds one byte, returning the frame it completes.
    fn push(&mut self, b: u8) -> Option<Notification> {
        match self.frame.as_mut() {
            Some(frame) => {
                frame.push(b).ok();
                if b == b'\n' || frame.is_full() {
                    return self.frame.take();
                }
                None
            }
            None => {
                slide(&mut self.recent, b);
                if self.recent.as_slice() == MESSAGE_URC.as_bytes() {
                    self.recent.clear();
                    self.frame = Notification::from_slice(MESSAGE_URC.as_bytes()).ok();
                }
                None
            }
        }
    }

    fn take(&mut self) -> Option<Notification> {
        self.frame.take()
    }
}

pub struct Session<M: RawMutex, T> {
    transport: Mutex<M, T>,
    channel: state::Channel<M>,
    notifications: Channel<M, Notification, NOTIFICATION_CAPACITY>,
}

impl<M, T> Session<M, T>
where
    M: RawMutex,
    T: Read + ReadReady + Write,
{
    pub fn new(transport: T) -> Self {
        Self {
            transport: Mutex::new(transport),
            channel: state::Channel::new(),
            notifications: Channel::new(),
        }
    }

    /// Marks the channel ready. Calling it twice is harmless.
    pub fn init(&self) {
        if self.is_ready() {
            warn!("Serial channel already initialized");
            return;
        }
        self.channel.set(ChannelState::Ready);
        info!("Serial channel initialized");
    }

    /// Marks the channel unusable; subsequent transactions fail with
    /// [`Error::NotInitialized`].
    pub fn deinit(&self) {
        if !self.is_ready() {
            warn!("Serial channel not initialized, nothing to deinitialize");
            return;
        }
        self.channel.set(ChannelState::Uninitialized);
        while self.notifications.try_receive().is_ok() {}
        info!("Serial channel deinitialized");
    }

    pub fn is_ready(&self) -> bool {
        self.channel.get() == ChannelState::Ready
    }

    pub fn notifications(&self) -> NotificationReceiver<'_, M> {
        self.notifications.receiver()
    }

    /// Send a typed command and wait for `expect`, using the command's own
    /// timeout.
    pub async fn send<Cmd: AtatCmd>(&self, cmd: &Cmd, expect: &str) -> Result<Response, Error> {
        self.send_with(cmd, expect, cmd_timeout::<Cmd>(), None)
            .await
    }

    /// Like [`send`](Self::send), copying the reply into `out`.
    pub async fn send_into<Cmd: AtatCmd>(
        &self,
        cmd: &Cmd,
        expect: &str,
        out: &mut [u8],
    ) -> Result<Response, Error> {
        self.send_with(cmd, expect, cmd_timeout::<Cmd>(), Some(out))
            .await
    }

    pub async fn send_with<Cmd: AtatCmd>(
        &self,
        cmd: &Cmd,
        expect: &str,
        timeout: Duration,
        out: Option<&mut [u8]>,
    ) -> Result<Response, Error> {
        if Cmd::MAX_LEN > CMD_BUF_SIZE {
            error!("Command of up to {} bytes exceeds buffer", Cmd::MAX_LEN);
            return Err(Error::CommandOverflow);
        }
        let mut buf = [0u8; CMD_BUF_SIZE];
        let len = cmd.write(&mut buf);

        // `AtatCmd::write` already terminates the line
        let tx = Transaction::new(&buf[..len], expect, timeout).with_terminator(Terminator::None);
        self.execute(&tx, out).await
    }

    /// Run one transaction: write the command, then poll the channel until
    /// the reply contains `tx.expect` or `tx.timeout` has elapsed. Reading
    /// goes on until the line carrying the token has ended, or until the
    /// channel goes briefly quiet, as it does after a prompt.
    ///
    /// On success the head of the reply is copied to `out`, truncated to its
    /// capacity. On timeout [`ERROR_SENTINEL`] is written to `out` instead.
    /// There is no retry at this level.
    pub async fn execute(
        &self,
        tx: &Transaction<'_>,
        out: Option<&mut [u8]>,
    ) -> Result<Response, Error> {
        if !self.is_ready() {
            error!("Serial channel not initialized");
            return Err(Error::NotInitialized);
        }
        if tx.expect.len() > MAX_TOKEN_LEN {
            error!("Expected token {:?} is too long", tx.expect);
            return Err(Error::CommandOverflow);
        }

        let mut transport = with_timeout(LOCK_WAIT, self.transport.lock())
            .await
            .map_err(|_| {
                error!("Failed to take channel lock for {:?}", LossyStr(tx.command));
                Error::Busy
            })?;

        self.discard_input(&mut *transport).await?;

        trace!("Sending command: {:?}", LossyStr(tx.command));
        transport.write_all(tx.command).await.map_err(io_error)?;
        let terminator = tx.terminator.as_bytes();
        if !terminator.is_empty() {
            transport.write_all(terminator).await.map_err(io_error)?;
        }
        transport.flush().await.map_err(io_error)?;

        let route_pushes = !tx.expect.contains(MESSAGE_URC);
        let mut reply = Reply::new(tx.expect.as_bytes());
        let mut pushes = FrameCollector::default();
        let mut chunk = [0u8; READ_CHUNK];
        let deadline = Instant::now() + tx.timeout;

        loop {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            // Once the token is in, only the rest of its line is waited for
            let wait = if reply.matched() {
                LINE_IDLE
            } else {
                POLL_SLICE
            };
            let wait = wait.min(deadline - now);

            match with_timeout(wait, transport.read(&mut chunk)).await {
                Ok(Ok(0)) | Err(_) if reply.matched() => break,
                Ok(Ok(0)) => Timer::after(wait).await,
                Ok(Ok(n)) => {
                    let data = &chunk[..n];
                    trace!("Received: {:?}", LossyStr(data));
                    for &b in data {
                        reply.push(b);
                        if route_pushes {
                            if let Some(frame) = pushes.push(b) {
                                self.route_notification(frame);
                            }
                        }
                    }
                    if reply.is_done() && !pushes.is_pending() {
                        break;
                    }
                }
                Ok(Err(e)) => return Err(io_error(e)),
                Err(_) => {}
            }
        }

        if let Some(frame) = pushes.take() {
            self.route_notification(frame);
        }

        if reply.matched() {
            let (len, truncated) = copy_out(out, &reply.head);
            return Ok(Response {
                len,
                truncated: truncated || reply.overflowed,
            });
        }

        error!(
            "Timeout waiting for {:?} after {:?}. Last response: {:?}",
            tx.expect,
            LossyStr(tx.command),
            LossyStr(&reply.head)
        );
        copy_out(out, ERROR_SENTINEL);
        Err(Error::Timeout)
    }

    /// Read a single slice while no transaction is running, queueing the
    /// incoming message frames it carries. A frame cut by the end of the read
    /// is completed before the lock is released.
    ///
    /// Gives up with [`Error::Busy`] if a transaction holds the channel.
    pub(crate) async fn poll_unsolicited(&self, buf: &mut [u8]) -> Result<(), Error> {
        let mut transport = with_timeout(LOCK_WAIT, self.transport.lock())
            .await
            .map_err(|_| Error::Busy)?;

        let mut pushes = FrameCollector::default();
        match with_timeout(POLL_SLICE, transport.read(buf)).await {
            Ok(Ok(0)) | Err(_) => return Ok(()),
            Ok(Ok(n)) => {
                let data = &buf[..n];
                if !self.collect(&mut pushes, data) {
                    debug!("Dropping unclaimed input: {:?}", LossyStr(data));
                }
            }
            Ok(Err(e)) => return Err(io_error(e)),
        }
        self.complete_frame(&mut *transport, &mut pushes).await
    }

    /// Drain input buffered before the next command, so a reply that arrived
    /// after an earlier timeout cannot satisfy the new transaction.
    async fn discard_input(&self, transport: &mut T) -> Result<(), Error> {
        let mut pushes = FrameCollector::default();
        let mut chunk = [0u8; READ_CHUNK];
        for _ in 0..MAX_DISCARD_READS {
            if !transport.read_ready().map_err(io_error)? {
                break;
            }
            let n = transport.read(&mut chunk).await.map_err(io_error)?;
            if n == 0 {
                break;
            }
            let data = &chunk[..n];
            if !self.collect(&mut pushes, data) {
                debug!("Discarding stale input: {:?}", LossyStr(data));
            }
        }
        self.complete_frame(transport, &mut pushes).await
    }

    /// Feeds unclaimed bytes to `pushes`, queueing every frame they complete.
    /// Returns whether any of them belonged to a frame.
    fn collect(&self, pushes: &mut FrameCollector, data: &[u8]) -> bool {
        let mut claimed = pushes.is_pending();
        for &b in data {
            if let Some(frame) = pushes.push(b) {
                self.route_notification(frame);
            }
            claimed |= pushes.is_pending();
        }
        claimed
    }

    /// Keeps reading until the frame `pushes` has started ends or the line
    /// goes quiet, then queues it.
    async fn complete_frame(
        &self,
        transport: &mut T,
        pushes: &mut FrameCollector,
    ) -> Result<(), Error> {
        let mut chunk = [0u8; READ_CHUNK];
        while pushes.is_pending() {
            match with_timeout(LINE_IDLE, transport.read(&mut chunk)).await {
                Ok(Ok(0)) | Err(_) => break,
                Ok(Ok(n)) => {
                    trace!("Received: {:?}", LossyStr(&chunk[..n]));
                    self.collect(pushes, &chunk[..n]);
                }
                Ok(Err(e)) => return Err(io_error(e)),
            }
        }

        if let Some(frame) = pushes.take() {
            warn!("Line went quiet inside a frame");
            self.route_notification(frame);
        }
        Ok(())
    }

    fn route_notification(&self, frame: Notification) {
        match self.notifications.try_send(frame) {
            Ok(()) => debug!("Queued notification"),
            Err(TrySendError::Full(frame)) => {
                error!("Notification queue full, dropping: {:?}", LossyStr(&frame))
            }
        }
    }
}

fn cmd_timeout<Cmd: AtatCmd>() -> Duration {
    Duration::from_millis(u64::from(Cmd::MAX_TIMEOUT_MS))
}

fn io_error<E: embedded_io_async::Error>(e: E) -> Error {
    Error::Transport(e.kind())
}

pub(crate) fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    needle.is_empty() || haystack.windows(needle.len()).any(|w| w == needle)
}

/// Appends `b` to `window`, sliding the oldest byte out when full.
fn slide<const N: usize>(window: &mut Vec<u8, N>, b: u8) {
    if window.is_full() {
        window.remove(0);
    }
    window.push(b).ok();
}

/// Copies as much of `data` as fits. Returns the copied length and whether
/// `data` was cut.
fn copy_out(out: Option<&mut [u8]>, data: &[u8]) -> (usize, bool) {
    match out {
        Some(buf) => {
            let len = data.len().min(buf.len());
            buf[..len].copy_from_slice(&data[..len]);
            (len, len < data.len())
        }
        None => (0, false),
    }
}
