//! Scripted modem, reset pin and configuration for unit tests.

use core::convert::Infallible;
use core::future::poll_fn;
use core::task::{Poll, Waker};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::vec::Vec;

use embassy_time::Duration;
use env_logger::Env;

use crate::config::ModemConfig;

static INIT: Once = Once::new();

pub fn setup_logger() {
    INIT.call_once(|| {
        env_logger::Builder::from_env(Env::default().default_filter_or("info"))
            .is_test(true)
            .init();
    });
}

struct Rule {
    prefix: Vec<u8>,
    replies: VecDeque<Vec<u8>>,
}

impl Rule {
    /// The last reply repeats forever.
    fn next_reply(&mut self) -> Option<Vec<u8>> {
        if self.replies.len() > 1 {
            self.replies.pop_front()
        } else {
            self.replies.front().cloned()
        }
    }
}

#[derive(Default)]
struct ModemState {
    rules: Vec<Rule>,
    writes: Vec<Vec<u8>>,
    rx: VecDeque<u8>,
    dead: bool,
    read_limit: Option<usize>,
    waker: Option<Waker>,
}

impl ModemState {
    fn push_rx(&mut self, data: &[u8]) {
        self.rx.extend(data);
        if let Some(waker) = self.waker.take() {
            waker.wake();
        }
    }
}

/// Serial port of a scripted modem.
///
/// Every write call is recorded as-is. A write starting with a registered
/// prefix (longest match wins) queues that prefix' reply for reading. A dead
/// modem records writes but never answers.
#[derive(Clone, Default)]
pub struct MockModem(Arc<Mutex<ModemState>>);

impl MockModem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(&self, prefix: &str, reply: &str) {
        self.on_sequence(prefix, &[reply]);
    }

    /// Answer successive matching writes with successive replies.
    pub fn on_sequence(&self, prefix: &str, replies: &[&str]) {
        let mut state = self.0.lock().unwrap();
        state.rules.retain(|r| r.prefix != prefix.as_bytes());
        state.rules.push(Rule {
            prefix: prefix.as_bytes().to_vec(),
            replies: replies.iter().map(|r| r.as_bytes().to_vec()).collect(),
        });
    }

    pub fn set_alive(&self, alive: bool) {
        let mut state = self.0.lock().unwrap();
        state.dead = !alive;
        if !alive {
            state.rx.clear();
        }
    }

    /// Cap the bytes returned by a single read, like a UART handing out
    /// whatever its FIFO holds.
    pub fn set_read_limit(&self, limit: usize) {
        self.0.lock().unwrap().read_limit = Some(limit);
    }

    pub fn push_unsolicited(&self, data: &str) {
        self.0.lock().unwrap().push_rx(data.as_bytes());
    }

    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.0.lock().unwrap().writes.clone()
    }
}

impl embedded_io_async::ErrorType for MockModem {
    type Error = Infallible;
}

impl embedded_io_async::Read for MockModem {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        poll_fn(|cx| {
            let mut state = self.0.lock().unwrap();
            if state.rx.is_empty() {
                state.waker = Some(cx.waker().clone());
                return Poll::Pending;
            }
            let n = buf
                .len()
                .min(state.rx.len())
                .min(state.read_limit.unwrap_or(usize::MAX));
            for (dst, src) in buf.iter_mut().zip(state.rx.drain(..n)) {
                *dst = src;
            }
            Poll::Ready(Ok(n))
        })
        .await
    }
}

impl embedded_io_async::ReadReady for MockModem {
    fn read_ready(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.0.lock().unwrap().rx.is_empty())
    }
}

impl embedded_io_async::Write for MockModem {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        let mut state = self.0.lock().unwrap();
        state.writes.push(buf.to_vec());

        if !state.dead {
            let reply = state
                .rules
                .iter_mut()
                .filter(|r| buf.starts_with(&r.prefix))
                .max_by_key(|r| r.prefix.len())
                .and_then(|r| r.next_reply());
            if let Some(reply) = reply {
                state.push_rx(&reply);
            }
        }
        Ok(buf.len())
    }

    async fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Replies of a healthy, attached modem with an open bearer.
pub fn base_replies(modem: &MockModem) {
    modem.on("AT\r\n", "\r\nOK\r\n");
    modem.on("AT+ICCID", "\r\n+ICCID: 89860000000000000000\r\n\r\nOK\r\n");
    modem.on("ATE0", "\r\nOK\r\n");
    modem.on("AT+CSQ", "\r\n+CSQ: 24,0\r\n\r\nOK\r\n");
    modem.on("AT+CGATT?", "\r\n+CGATT: 1\r\n\r\nOK\r\n");
    modem.on("AT+SAPBR", "\r\nOK\r\n");
    modem.on("AT+SAPBR=2,1", "\r\n+SAPBR: 1,1,\"10.89.193.1\"\r\n\r\nOK\r\n");
}

#[derive(Clone, Default)]
pub struct Counter(Arc<AtomicUsize>);

impl Counter {
    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    fn incr(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// Reset line of the mock modem: a full high-low pulse revives it, unless
/// the pin is dead.
pub struct MockResetPin {
    modem: MockModem,
    asserted: bool,
    dead: bool,
    pulses: Counter,
}

impl embedded_hal::digital::ErrorType for MockResetPin {
    type Error = Infallible;
}

impl embedded_hal::digital::OutputPin for MockResetPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        if self.asserted {
            self.asserted = false;
            self.pulses.incr();
            if !self.dead {
                self.modem.set_alive(true);
            }
        }
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.asserted = true;
        Ok(())
    }
}

pub struct TestConfig {
    pin: MockResetPin,
    restarts: Counter,
}

impl TestConfig {
    pub fn new(modem: &MockModem) -> Self {
        Self {
            pin: MockResetPin {
                modem: modem.clone(),
                asserted: false,
                dead: false,
                pulses: Counter::default(),
            },
            restarts: Counter::default(),
        }
    }

    pub fn with_dead_pin(mut self) -> Self {
        self.pin.dead = true;
        self
    }

    pub fn pin_pulses(&self) -> Counter {
        self.pin.pulses.clone()
    }

    pub fn restarts(&self) -> Counter {
        self.restarts.clone()
    }
}

impl ModemConfig for TestConfig {
    type ResetPin = MockResetPin;

    const PING_TIMEOUT: Duration = Duration::from_millis(20);
    const RESET_HOLD: Duration = Duration::from_millis(5);
    const BOOT_WAIT: Duration = Duration::from_millis(5);
    const HTTP_TERM_SETTLE: Duration = Duration::from_millis(0);
    const HEARTBEAT_PERIOD: Duration = Duration::from_millis(50);

    fn reset_pin(&mut self) -> Option<&mut Self::ResetPin> {
        Some(&mut self.pin)
    }

    fn restart(&mut self) {
        self.restarts.incr();
    }
}
