use embedded_io_async::ErrorKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    // Session engine errors
    /// The serial channel has not been initialized (or was deinitialized).
    NotInitialized,
    /// The channel lock could not be taken within the lock budget.
    Busy,
    /// The expected token never arrived within the command timeout.
    Timeout,
    /// The expected token arrived but its fields could not be scanned.
    MalformedResponse,
    /// The command or its expected token does not fit the session buffers.
    CommandOverflow,
    /// The serial driver reported an error.
    Transport(ErrorKind),
    IoPin,

    // Link errors
    /// The data context still reports the null address after activation.
    NoAddress,
    /// No network time has been synchronized yet.
    ClockUnset,

    // Service errors
    InvalidConfig,
    InvalidMessage,
    Serialize,
    /// The far end answered with a non-success status code.
    UnexpectedStatus(u16),
    /// Recovery requires a cold restart of the device.
    Unrecoverable,
}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, f: defmt::Formatter<'_>) {
        match self {
            Self::NotInitialized => defmt::write!(f, "NotInitialized"),
            Self::Busy => defmt::write!(f, "Busy"),
            Self::Timeout => defmt::write!(f, "Timeout"),
            Self::MalformedResponse => defmt::write!(f, "MalformedResponse"),
            Self::CommandOverflow => defmt::write!(f, "CommandOverflow"),
            Self::Transport(e) => defmt::write!(f, "Transport({:?})", defmt::Debug2Format(e)),
            Self::IoPin => defmt::write!(f, "IoPin"),
            Self::NoAddress => defmt::write!(f, "NoAddress"),
            Self::ClockUnset => defmt::write!(f, "ClockUnset"),
            Self::InvalidConfig => defmt::write!(f, "InvalidConfig"),
            Self::InvalidMessage => defmt::write!(f, "InvalidMessage"),
            Self::Serialize => defmt::write!(f, "Serialize"),
            Self::UnexpectedStatus(c) => defmt::write!(f, "UnexpectedStatus({})", c),
            Self::Unrecoverable => defmt::write!(f, "Unrecoverable"),
        }
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotInitialized => f.write_str("serial channel not initialized"),
            Self::Busy => f.write_str("serial channel busy"),
            Self::Timeout => f.write_str("timed out waiting for response"),
            Self::MalformedResponse => f.write_str("malformed response"),
            Self::CommandOverflow => f.write_str("command exceeds buffer"),
            Self::Transport(kind) => write!(f, "transport error: {:?}", kind),
            Self::IoPin => f.write_str("reset pin error"),
            Self::NoAddress => f.write_str("data context has no address"),
            Self::ClockUnset => f.write_str("network clock not synchronized"),
            Self::InvalidConfig => f.write_str("incomplete messaging configuration"),
            Self::InvalidMessage => f.write_str("invalid message envelope"),
            Self::Serialize => f.write_str("failed to serialize message"),
            Self::UnexpectedStatus(code) => write!(f, "unexpected status code {}", code),
            Self::Unrecoverable => f.write_str("unrecoverable modem failure"),
        }
    }
}

impl From<serde_json_core::ser::Error> for Error {
    fn from(_: serde_json_core::ser::Error) -> Self {
        Self::Serialize
    }
}

impl From<serde_json_core::de::Error> for Error {
    fn from(_: serde_json_core::de::Error) -> Self {
        Self::MalformedResponse
    }
}
