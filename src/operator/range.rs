use std::fmt;

use chrono::{DateTime, Utc};

use crate::error::OptResult;
use crate::time::{Bounds, TimeSpec};

/// Restricts rows to a time range. Either end may be relative to the query's `now`.
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub struct Range {
    start: TimeSpec,
    stop: TimeSpec,
}

impl Range {
    pub fn new<S: Into<TimeSpec>, T: Into<TimeSpec>>(start: S, stop: T) -> Self {
        Self {
            start: start.into(),
            stop: stop.into(),
        }
    }

    pub fn absolute(bounds: Bounds) -> Self {
        Self::new(bounds.start(), bounds.stop())
    }

    pub fn start(&self) -> TimeSpec {
        self.start
    }

    pub fn stop(&self) -> TimeSpec {
        self.stop
    }

    /// Resolves both ends against `now`.
    pub fn bounds(&self, now: DateTime<Utc>) -> OptResult<Bounds> {
        Bounds::new(self.start.resolve(now)?, self.stop.resolve(now)?)
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "start: {}, stop: {}", self.start, self.stop)
    }
}
