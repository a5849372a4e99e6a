use std::fmt;

use crate::operator::{START_COLUMN, STOP_COLUMN, TIME_COLUMN};
use crate::time::Duration;

/// Splits each table into time windows.
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub struct Window {
    every: Duration,
    period: Duration,
    offset: Duration,
    time_column: String,
    start_column: String,
    stop_column: String,
    create_empty: bool,
}

impl Window {
    /// Tumbling windows of size `every` over the default columns.
    pub fn new(every: Duration) -> Self {
        Self {
            every,
            period: every,
            offset: Duration::default(),
            time_column: TIME_COLUMN.to_string(),
            start_column: START_COLUMN.to_string(),
            stop_column: STOP_COLUMN.to_string(),
            create_empty: false,
        }
    }

    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    pub fn with_offset(mut self, offset: Duration) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_create_empty(mut self, create_empty: bool) -> Self {
        self.create_empty = create_empty;
        self
    }

    pub fn with_columns<S: Into<String>>(mut self, time: S, start: S, stop: S) -> Self {
        self.time_column = time.into();
        self.start_column = start.into();
        self.stop_column = stop.into();
        self
    }

    pub fn every(&self) -> Duration {
        self.every
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn offset(&self) -> Duration {
        self.offset
    }

    pub fn time_column(&self) -> &str {
        &self.time_column
    }

    pub fn start_column(&self) -> &str {
        &self.start_column
    }

    pub fn stop_column(&self) -> &str {
        &self.stop_column
    }

    pub fn create_empty(&self) -> bool {
        self.create_empty
    }

    pub fn has_default_columns(&self) -> bool {
        self.time_column == TIME_COLUMN
            && self.start_column == START_COLUMN
            && self.stop_column == STOP_COLUMN
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "every: {}", self.every)?;
        if self.period != self.every {
            write!(f, ", period: {}", self.period)?;
        }
        if !self.offset.is_zero() {
            write!(f, ", offset: {}", self.offset)?;
        }
        if !self.has_default_columns() {
            write!(
                f,
                ", timeColumn: {:?}, startColumn: {:?}, stopColumn: {:?}",
                self.time_column, self.start_column, self.stop_column
            )?;
        }
        if self.create_empty {
            write!(f, ", createEmpty: true")?;
        }
        Ok(())
    }
}
