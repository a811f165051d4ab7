use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::mutex::Mutex;
use embassy_time::Timer;
use embedded_hal::digital::OutputPin as _;
use embedded_io_async::{Read, ReadReady, Write};

use super::session::Session;
use super::state::{LinkState, State};
use crate::clock::NetworkTime;
use crate::command::general::responses::{NetworkClock, CLOCK_PREFIX};
use crate::command::general::types::Echo;
use crate::command::general::{GetClock, GetIccid, GetSignalQuality, SetEcho};
use crate::command::psn::responses::{BearerStatus, ATTACHED, BEARER_PREFIX};
use crate::command::psn::{GetGPRSAttached, OpenBearer, QueryBearer, SetBearerParameter};
use crate::command::{AT, OK};
use crate::config::ModemConfig;
use crate::error::Error;

const STATUS_BUF_SIZE: usize = 128;

/// Link supervisor: liveness probing, hardware reset and the one-time data
/// context activation.
///
/// Every protocol service gates its sequences on
/// [`base_check`](Self::base_check) and, for IP traffic,
/// [`activate_data_context`](Self::activate_data_context).
pub struct Supervisor<'a, M: RawMutex, T, C> {
    session: &'a Session<M, T>,
    config: Mutex<M, C>,
    state: State<M>,
}

impl<'a, M, T, C> Supervisor<'a, M, T, C>
where
    M: RawMutex,
    T: Read + ReadReady + Write,
    C: ModemConfig,
{
    pub fn new(session: &'a Session<M, T>, config: C) -> Self {
        Self {
            session,
            config: Mutex::new(config),
            state: State::new(),
        }
    }

    pub fn session(&self) -> &'a Session<M, T> {
        self.session
    }

    pub fn link_state(&self) -> LinkState {
        self.state.link_state()
    }

    /// Pulse the reset line and wait for the module to boot.
    ///
    /// Clears both the liveness flag and the data context latch.
    pub async fn hardware_reset(&self) -> Result<(), Error> {
        warn!("Hard resetting cellular module");
        let mut config = self.config.lock().await;
        if let Some(pin) = config.reset_pin() {
            pin.set_high().map_err(|_| Error::IoPin)?;
            Timer::after(C::RESET_HOLD).await;
            pin.set_low().map_err(|_| Error::IoPin)?;
            Timer::after(C::BOOT_WAIT).await;
        } else {
            warn!("No reset pin configured");
        }
        self.state.set_link_state(LinkState::Unknown);
        Ok(())
    }

    /// Hardware reset followed by the configured restart hook.
    pub async fn cold_restart(&self) {
        if let Err(e) = self.hardware_reset().await {
            error!("Hardware reset failed: {:?}", e);
        }
        error!("Restarting device");
        self.config.lock().await.restart();
    }

    /// Probe the modem with plain `AT` commands.
    ///
    /// After `PING_ATTEMPTS` unanswered probes the module is hardware reset
    /// and probed once more. Fails with [`Error::Unrecoverable`] if the second
    /// round is unanswered as well.
    pub async fn probe_liveness(&self) -> Result<(), Error> {
        for round in 0..2 {
            if round > 0 {
                self.hardware_reset().await?;
            }

            for attempt in 1..=C::PING_ATTEMPTS {
                match self.session.send_with(&AT, OK, C::PING_TIMEOUT, None).await {
                    Ok(_) => {
                        if self.link_state() < LinkState::Alive {
                            self.state.set_link_state(LinkState::Alive);
                        }
                        return Ok(());
                    }
                    Err(Error::NotInitialized) => return Err(Error::NotInitialized),
                    Err(e) => debug!("Liveness probe {} failed: {:?}", attempt, e),
                }
            }
            warn!("Module unresponsive after {} probes", C::PING_ATTEMPTS);
        }

        error!("Module did not recover after hardware reset");
        Err(Error::Unrecoverable)
    }

    /// Housekeeping gate run before every service sequence: liveness, SIM
    /// identity, echo off, signal quality and packet domain attach.
    pub async fn base_check(&self) -> Result<(), Error> {
        self.probe_liveness().await?;

        self.session
            .send(&GetIccid, "+ICCID")
            .await
            .inspect_err(|_| error!("SIM identity query failed"))?;
        self.session
            .send(
                &SetEcho {
                    enabled: Echo::Disable,
                },
                OK,
            )
            .await
            .inspect_err(|_| error!("Disabling echo failed"))?;
        self.session
            .send(&GetSignalQuality, OK)
            .await
            .inspect_err(|_| error!("Signal quality query failed"))?;
        self.session
            .send(&GetGPRSAttached, ATTACHED)
            .await
            .inspect_err(|_| error!("Not attached to packet domain"))?;

        debug!("Base check passed");
        Ok(())
    }

    /// Configure and open the bearer, unless a previous call already did.
    pub async fn activate_data_context(&self) -> Result<(), Error> {
        if self.link_state() >= LinkState::DataContextActive {
            return Ok(());
        }

        let cid = C::CONTEXT_ID;
        self.session
            .send(&SetBearerParameter::connection_type(cid, C::BEARER_TYPE), OK)
            .await
            .inspect_err(|_| error!("Setting bearer type failed"))?;
        self.session
            .send(&SetBearerParameter::apn(cid, C::APN), OK)
            .await
            .inspect_err(|_| error!("Setting APN failed"))?;

        let mut status = self.query_bearer(cid).await?;
        if !status.has_address() {
            info!("Opening bearer {}", cid);
            self.session
                .send(&OpenBearer::new(cid), OK)
                .await
                .inspect_err(|_| error!("Opening bearer failed"))?;
            status = self.query_bearer(cid).await?;
        }

        if !status.has_address() {
            error!("Bearer {} has no address", cid);
            return Err(Error::NoAddress);
        }

        info!("Data context active, address {}", status.ip.as_str());
        self.state.set_link_state(LinkState::DataContextActive);
        Ok(())
    }

    async fn query_bearer(&self, cid: u8) -> Result<BearerStatus, Error> {
        let mut buf = [0u8; STATUS_BUF_SIZE];
        let res = self
            .session
            .send_into(&QueryBearer::new(cid), BEARER_PREFIX, &mut buf)
            .await?;
        let raw = core::str::from_utf8(&buf[..res.len]).map_err(|_| Error::MalformedResponse)?;
        BearerStatus::scan(raw)
    }

    /// Read the network clock and latch it against the monotonic clock.
    /// Returns the current Unix time in milliseconds.
    pub async fn sync_clock(&self) -> Result<u64, Error> {
        let mut buf = [0u8; STATUS_BUF_SIZE];
        let res = self
            .session
            .send_into(&GetClock, CLOCK_PREFIX, &mut buf)
            .await?;
        let raw = core::str::from_utf8(&buf[..res.len]).map_err(|_| Error::MalformedResponse)?;
        let clock = NetworkClock::scan(raw)?;
        let unix_ms = NetworkTime::parse(clock.time.as_str())?.to_unix_millis();

        self.state.set_clock(unix_ms);
        debug!("Network clock synchronized: {}", unix_ms);
        Ok(unix_ms)
    }

    /// Current Unix time in milliseconds. Fails with [`Error::ClockUnset`]
    /// before the first [`sync_clock`](Self::sync_clock).
    pub fn now_millis(&self) -> Result<u64, Error> {
        self.state.now_millis().ok_or(Error::ClockUnset)
    }

    /// Current Unix time, synchronizing the network clock first if needed.
    pub async fn timestamp(&self) -> Result<u64, Error> {
        match self.now_millis() {
            Err(Error::ClockUnset) => self.sync_clock().await,
            res => res,
        }
    }
}
