//! Default timings for SIMCom/Luat style modems.

use embassy_time::Duration;

/// High time of the reset line to trigger a module reboot
pub const RESET_HOLD: Duration = Duration::from_secs(1);

/// Time for the module to boot and register after the reset line is released
pub const BOOT_WAIT: Duration = Duration::from_secs(6);

/// Per-attempt budget of a plain `AT` liveness probe
pub const PING_TIMEOUT: Duration = Duration::from_secs(2);

/// Number of `AT` probes before falling back to a hardware reset
pub const PING_ATTEMPTS: u8 = 10;

/// Time the modem needs to release its HTTP stack after `AT+HTTPTERM`
pub const HTTP_TERM_SETTLE: Duration = Duration::from_secs(3);

/// Time between heartbeat publishes
pub const HEARTBEAT_PERIOD: Duration = Duration::from_secs(30);

/// Bounded wait on the channel lock before a caller gives up with `Busy`
pub const LOCK_WAIT: Duration = Duration::from_millis(500);

/// Granularity of response polling
pub const POLL_SLICE: Duration = Duration::from_millis(100);

/// Sleep between two listener polls
pub const LISTEN_INTERVAL: Duration = Duration::from_secs(1);

/// Quiet time after which a line that is still open is taken as complete
pub const LINE_IDLE: Duration = Duration::from_millis(20);
