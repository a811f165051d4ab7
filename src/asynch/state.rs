use core::cell::{Cell, RefCell};

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_time::Instant;

/// Whether the serial channel may be used.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChannelState {
    Uninitialized,
    Ready,
}

/// What is known about the modem link.
///
/// States are ordered: a data context can only be active on a live modem.
#[derive(Debug, PartialEq, Eq, Clone, Copy, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkState {
    /// Nothing probed yet, or the modem was hardware reset.
    Unknown = 0,
    /// The modem answered a liveness probe.
    Alive = 1,
    /// The bearer is open and has an address.
    DataContextActive = 2,
}

/// Readiness flag of the serial channel.
pub(crate) struct Channel<M: RawMutex> {
    state: Mutex<M, Cell<ChannelState>>,
}

impl<M: RawMutex> Channel<M> {
    pub(crate) const fn new() -> Self {
        Self {
            state: Mutex::new(Cell::new(ChannelState::Uninitialized)),
        }
    }

    pub(crate) fn get(&self) -> ChannelState {
        self.state.lock(|s| s.get())
    }

    pub(crate) fn set(&self, state: ChannelState) {
        self.state.lock(|s| s.set(state))
    }
}

/// Network time latched against the monotonic clock.
#[derive(Debug, Clone, Copy)]
struct ClockBase {
    unix_ms: u64,
    at: Instant,
}

/// Link state owned by the supervisor
struct Shared {
    link_state: LinkState,
    clock: Option<ClockBase>,
}

pub(crate) struct State<M: RawMutex> {
    shared: Mutex<M, RefCell<Shared>>,
}

impl<M: RawMutex> State<M> {
    pub(crate) const fn new() -> Self {
        Self {
            shared: Mutex::new(RefCell::new(Shared {
                link_state: LinkState::Unknown,
                clock: None,
            })),
        }
    }

    pub(crate) fn set_link_state(&self, state: LinkState) {
        self.shared.lock(|s| {
            let s = &mut *s.borrow_mut();
            if s.link_state != state {
                debug!("Link state: {:?} -> {:?}", s.link_state, state);
            }
            s.link_state = state;
        });
    }

    pub(crate) fn link_state(&self) -> LinkState {
        self.shared.lock(|s| s.borrow().link_state)
    }

    pub(crate) fn set_clock(&self, unix_ms: u64) {
        self.shared.lock(|s| {
            s.borrow_mut().clock = Some(ClockBase {
                unix_ms,
                at: Instant::now(),
            });
        });
    }

    pub(crate) fn now_millis(&self) -> Option<u64> {
        self.shared.lock(|s| {
            s.borrow()
                .clock
                .map(|base| base.unix_ms + base.at.elapsed().as_millis())
        })
    }
}
