//! Conversion of the modem's network clock to Unix time.

use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone};

use crate::error::Error;

const SECS_PER_QUARTER_HOUR: i32 = 15 * 60;

/// Local time as reported by `AT+CCLK?`, in the form
/// `yy/MM/dd,hh:mm:ss±zz`, where `zz` is the offset from UTC in quarter
/// hours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkTime(DateTime<FixedOffset>);

impl NetworkTime {
    pub fn parse(s: &str) -> Result<Self, Error> {
        let s = s.trim_matches('"').as_bytes();
        if s.len() < 20 {
            return Err(Error::MalformedResponse);
        }

        let field = |at: usize| -> Result<u8, Error> {
            match (s[at], s[at + 1]) {
                (h @ b'0'..=b'9', l @ b'0'..=b'9') => Ok((h - b'0') * 10 + (l - b'0')),
                _ => Err(Error::MalformedResponse),
            }
        };
        let sep = |at: usize, c: u8| {
            if s[at] == c {
                Ok(())
            } else {
                Err(Error::MalformedResponse)
            }
        };

        sep(2, b'/')?;
        sep(5, b'/')?;
        sep(8, b',')?;
        sep(11, b':')?;
        sep(14, b':')?;

        let sign = match s[17] {
            b'+' => 1,
            b'-' => -1,
            _ => return Err(Error::MalformedResponse),
        };

        let offset = FixedOffset::east_opt(sign * i32::from(field(18)?) * SECS_PER_QUARTER_HOUR)
            .ok_or(Error::MalformedResponse)?;
        let local = NaiveDate::from_ymd_opt(
            2000 + i32::from(field(0)?),
            u32::from(field(3)?),
            u32::from(field(6)?),
        )
        .and_then(|date| {
            date.and_hms_opt(
                u32::from(field(9).ok()?),
                u32::from(field(12).ok()?),
                u32::from(field(15).ok()?),
            )
        })
        .ok_or(Error::MalformedResponse)?;

        offset
            .from_local_datetime(&local)
            .single()
            .map(Self)
            .ok_or(Error::MalformedResponse)
    }

    pub fn datetime(&self) -> DateTime<FixedOffset> {
        self.0
    }

    /// Milliseconds since the Unix epoch.
    pub fn to_unix_millis(&self) -> u64 {
        u64::try_from(self.0.timestamp_millis()).unwrap_or(0)
    }
}
