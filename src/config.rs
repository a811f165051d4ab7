use core::convert::Infallible;
use embassy_time::Duration;
use embedded_hal::digital::{ErrorType, OutputPin, PinState};

use crate::module_timing;

/// Placeholder for boards without a wired reset line.
pub struct NoPin;

impl ErrorType for NoPin {
    type Error = core::convert::Infallible;
}

impl OutputPin for NoPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Inverts an output pin, for modems whose reset line is driven through an
/// inverting transistor stage.
pub struct ReverseOutputPin<P: OutputPin<Error = Infallible>>(pub P);

impl<P: OutputPin<Error = Infallible>> ErrorType for ReverseOutputPin<P> {
    type Error = Infallible;
}

impl<P: OutputPin<Error = Infallible>> OutputPin for ReverseOutputPin<P> {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.0.set_high()
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.0.set_low()
    }

    fn set_state(&mut self, state: PinState) -> Result<(), Self::Error> {
        match state {
            PinState::Low => self.0.set_state(PinState::High),
            PinState::High => self.0.set_state(PinState::Low),
        }
    }
}

/// Board and network configuration of the modem.
///
/// The reset line is asserted by driving it high. Wrap the pin in
/// [`ReverseOutputPin`] if the board wiring is active-low.
pub trait ModemConfig {
    type ResetPin: OutputPin;

    /// Bearer connection type set with `AT+SAPBR=3,<cid>,"Contype",..`
    const BEARER_TYPE: &'static str = "GPRS";
    /// Access point name set with `AT+SAPBR=3,<cid>,"APN",..`
    const APN: &'static str = "CMNET";
    const CONTEXT_ID: u8 = 1;

    const PING_ATTEMPTS: u8 = module_timing::PING_ATTEMPTS;
    const PING_TIMEOUT: Duration = module_timing::PING_TIMEOUT;
    const RESET_HOLD: Duration = module_timing::RESET_HOLD;
    const BOOT_WAIT: Duration = module_timing::BOOT_WAIT;
    const HTTP_TERM_SETTLE: Duration = module_timing::HTTP_TERM_SETTLE;

    const HEARTBEAT_TOPIC: &'static str = "/platform/ping";
    const HEARTBEAT_PERIOD: Duration = module_timing::HEARTBEAT_PERIOD;
    /// Time-to-live in milliseconds stamped on outgoing envelopes
    const MESSAGE_TTL: u64 = 5000;

    fn reset_pin(&mut self) -> Option<&mut Self::ResetPin>;

    /// Called after a hardware reset when the modem cannot be brought back by
    /// any other means. On target this should reboot the MCU.
    fn restart(&mut self) {
        warn!("No restart hook configured");
    }
}
