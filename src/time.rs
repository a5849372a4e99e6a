//! Calendar aware durations and absolute time bounds.
//!
//! Window sizes and offsets in a query may be expressed in calendar units (`1mo`, `1y`) that have
//! no fixed length in nanoseconds. A [`Duration`] therefore keeps months and nanoseconds apart, and
//! only collapses them when applied to a concrete instant.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Months, TimeZone, Utc};

use crate::error::{OptError, OptResult};

const NANOS_PER_MICRO: i64 = 1_000;
const NANOS_PER_MILLI: i64 = 1_000 * NANOS_PER_MICRO;
const NANOS_PER_SECOND: i64 = 1_000 * NANOS_PER_MILLI;
const NANOS_PER_MINUTE: i64 = 60 * NANOS_PER_SECOND;
const NANOS_PER_HOUR: i64 = 60 * NANOS_PER_MINUTE;
const NANOS_PER_DAY: i64 = 24 * NANOS_PER_HOUR;
const NANOS_PER_WEEK: i64 = 7 * NANOS_PER_DAY;

/// A signed duration made of a month part and a nanosecond part.
///
/// Equality is structural: `1y` equals `12mo`, but `1mo` never equals `30d`.
#[derive(Clone, Copy, Debug, Default, Hash, Eq, PartialEq)]
pub struct Duration {
    months: i64,
    nanoseconds: i64,
    negative: bool,
}

impl Duration {
    /// The largest fixed duration, used as the "infinite" window.
    pub const MAX: Duration = Duration {
        months: 0,
        nanoseconds: i64::MAX,
        negative: false,
    };

    pub fn from_nanos(nanos: i64) -> Self {
        Self {
            months: 0,
            nanoseconds: nanos.checked_abs().unwrap_or(i64::MAX),
            negative: nanos < 0,
        }
    }

    pub fn from_months(months: i64) -> Self {
        Self {
            months: months.checked_abs().unwrap_or(i64::MAX),
            nanoseconds: 0,
            negative: months < 0,
        }
    }

    pub fn from_secs(secs: i64) -> Self {
        Self::from_nanos(secs.saturating_mul(NANOS_PER_SECOND))
    }

    pub fn months(&self) -> i64 {
        self.months
    }

    pub fn nanoseconds(&self) -> i64 {
        self.nanoseconds
    }

    pub fn is_zero(&self) -> bool {
        self.months == 0 && self.nanoseconds == 0
    }

    pub fn is_negative(&self) -> bool {
        self.negative && !self.is_zero()
    }

    pub fn is_positive(&self) -> bool {
        !self.negative && !self.is_zero()
    }

    /// Returns the same magnitude with the sign flipped.
    pub fn negate(self) -> Self {
        Self {
            negative: !self.negative,
            ..self
        }
        .normalized()
    }

    /// Zero carries no sign, so `-0s == 0s`.
    fn normalized(self) -> Self {
        Self {
            negative: self.negative && !self.is_zero(),
            ..self
        }
    }

    /// Shifts `t` by this duration, months first.
    ///
    /// Returns `None` when the result is not representable.
    pub fn apply_to(&self, t: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let months = Months::new(u32::try_from(self.months).ok()?);
        let nanos = chrono::Duration::nanoseconds(self.nanoseconds);
        if self.negative {
            t.checked_sub_months(months)?.checked_sub_signed(nanos)
        } else {
            t.checked_add_months(months)?.checked_add_signed(nanos)
        }
    }
}

impl FromStr for Duration {
    type Err = OptError;

    /// Parses literals such as `1m`, `-60s`, `1y`, `1mo5m` or `1h30m`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || OptError::InvalidDuration(s.to_string());
        let (negative, mut rest) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        if rest.is_empty() {
            return Err(invalid());
        }

        let mut duration = Duration {
            negative,
            ..Duration::default()
        };
        while !rest.is_empty() {
            let digits = rest
                .find(|c: char| !c.is_ascii_digit())
                .ok_or_else(invalid)?;
            if digits == 0 {
                return Err(invalid());
            }
            let magnitude: i64 = rest[..digits].parse().map_err(|_| invalid())?;
            rest = &rest[digits..];

            let unit_len = rest
                .find(|c: char| c.is_ascii_digit())
                .unwrap_or(rest.len());
            let unit = &rest[..unit_len];
            rest = &rest[unit_len..];

            let (months, nanos) = match unit {
                "y" => (magnitude.checked_mul(12), Some(0)),
                "mo" => (Some(magnitude), Some(0)),
                "w" => (Some(0), magnitude.checked_mul(NANOS_PER_WEEK)),
                "d" => (Some(0), magnitude.checked_mul(NANOS_PER_DAY)),
                "h" => (Some(0), magnitude.checked_mul(NANOS_PER_HOUR)),
                "m" => (Some(0), magnitude.checked_mul(NANOS_PER_MINUTE)),
                "s" => (Some(0), magnitude.checked_mul(NANOS_PER_SECOND)),
                "ms" => (Some(0), magnitude.checked_mul(NANOS_PER_MILLI)),
                "us" | "µs" => (Some(0), magnitude.checked_mul(NANOS_PER_MICRO)),
                "ns" => (Some(0), Some(magnitude)),
                _ => return Err(invalid()),
            };
            duration.months = months
                .and_then(|m| duration.months.checked_add(m))
                .ok_or_else(invalid)?;
            duration.nanoseconds = nanos
                .and_then(|n| duration.nanoseconds.checked_add(n))
                .ok_or_else(invalid)?;
        }

        Ok(duration.normalized())
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_zero() {
            return write!(f, "0ns");
        }
        if self.negative {
            write!(f, "-")?;
        }

        let (years, months) = (self.months / 12, self.months % 12);
        for (value, unit) in [(years, "y"), (months, "mo")] {
            if value != 0 {
                write!(f, "{}{}", value, unit)?;
            }
        }

        let mut nanos = self.nanoseconds;
        for (size, unit) in [
            (NANOS_PER_WEEK, "w"),
            (NANOS_PER_DAY, "d"),
            (NANOS_PER_HOUR, "h"),
            (NANOS_PER_MINUTE, "m"),
            (NANOS_PER_SECOND, "s"),
            (NANOS_PER_MILLI, "ms"),
            (NANOS_PER_MICRO, "us"),
            (1, "ns"),
        ] {
            if nanos >= size {
                write!(f, "{}{}", nanos / size, unit)?;
                nanos %= size;
            }
        }
        Ok(())
    }
}

/// One end of a time range before it has been resolved against the query's `now`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum TimeSpec {
    Absolute(DateTime<Utc>),
    /// Offset from the compilation's `now`, e.g. `-1h`.
    Relative(Duration),
}

impl TimeSpec {
    pub fn resolve(&self, now: DateTime<Utc>) -> OptResult<DateTime<Utc>> {
        match self {
            TimeSpec::Absolute(t) => Ok(*t),
            TimeSpec::Relative(d) => d
                .apply_to(now)
                .ok_or_else(|| OptError::InvalidBounds(format!("now {} overflows by {}", now, d))),
        }
    }
}

impl From<DateTime<Utc>> for TimeSpec {
    fn from(t: DateTime<Utc>) -> Self {
        TimeSpec::Absolute(t)
    }
}

impl From<Duration> for TimeSpec {
    fn from(d: Duration) -> Self {
        TimeSpec::Relative(d)
    }
}

impl fmt::Display for TimeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeSpec::Absolute(t) => write!(f, "{}", t.to_rfc3339()),
            TimeSpec::Relative(d) => write!(f, "now {}", d),
        }
    }
}

/// Absolute time bounds of a storage read, `[start, stop)`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct Bounds {
    start: DateTime<Utc>,
    stop: DateTime<Utc>,
}

impl Bounds {
    pub fn new(start: DateTime<Utc>, stop: DateTime<Utc>) -> OptResult<Self> {
        if start >= stop {
            return Err(OptError::InvalidBounds(format!(
                "start {} must be before stop {}",
                start.to_rfc3339(),
                stop.to_rfc3339()
            )));
        }
        Ok(Self { start, stop })
    }

    /// Bounds from unix nanosecond timestamps.
    pub fn from_nanos(start: i64, stop: i64) -> OptResult<Self> {
        Self::new(Utc.timestamp_nanos(start), Utc.timestamp_nanos(stop))
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn stop(&self) -> DateTime<Utc> {
        self.stop
    }
}

impl fmt::Display for Bounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start.to_rfc3339(), self.stop.to_rfc3339())
    }
}
