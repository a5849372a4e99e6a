use std::fmt;

use itertools::Itertools;

use crate::operator::{AggregateMethod, GroupMode, PhysicalOperatorTrait};
use crate::storage::{BucketId, Predicate};
use crate::time::{Bounds, Duration};

/// Reads every series of a bucket within time bounds, optionally filtered by a predicate.
#[derive(Clone, Debug, PartialEq)]
pub struct ReadRange {
    bucket: String,
    bucket_id: Option<BucketId>,
    predicate: Option<Predicate>,
    bounds: Bounds,
}

impl ReadRange {
    pub fn new<S: Into<String>>(bucket: S, bounds: Bounds) -> Self {
        Self {
            bucket: bucket.into(),
            bucket_id: None,
            predicate: None,
            bounds,
        }
    }

    pub fn with_bucket_id(mut self, bucket_id: BucketId) -> Self {
        self.bucket_id = Some(bucket_id);
        self
    }

    pub fn with_predicate(mut self, predicate: Predicate) -> Self {
        self.predicate = Some(predicate);
        self
    }

    /// Bucket name, empty when the query addressed the bucket by id.
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn bucket_id(&self) -> Option<BucketId> {
        self.bucket_id
    }

    pub fn predicate(&self) -> Option<&Predicate> {
        self.predicate.as_ref()
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }
}

impl PhysicalOperatorTrait for ReadRange {}

impl fmt::Display for ReadRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.bucket.is_empty() {
            write!(f, "bucket: {:?}, ", self.bucket)?;
        }
        if let Some(id) = self.bucket_id {
            write!(f, "bucketID: {}, ", id)?;
        }
        write!(f, "bounds: {}", self.bounds)?;
        if let Some(predicate) = &self.predicate {
            write!(f, ", predicate: {}", predicate)?;
        }
        Ok(())
    }
}

/// A range read that regroups series by tag, and possibly aggregates each group.
#[derive(Clone, Debug, PartialEq)]
pub struct ReadGroup {
    range: ReadRange,
    group_mode: GroupMode,
    group_keys: Vec<String>,
    aggregate_method: Option<AggregateMethod>,
}

impl ReadGroup {
    pub fn new(range: ReadRange, group_mode: GroupMode, group_keys: Vec<String>) -> Self {
        Self {
            range,
            group_mode,
            group_keys,
            aggregate_method: None,
        }
    }

    pub fn with_aggregate_method(mut self, method: AggregateMethod) -> Self {
        self.aggregate_method = Some(method);
        self
    }

    pub fn read_range(&self) -> &ReadRange {
        &self.range
    }

    pub fn group_mode(&self) -> GroupMode {
        self.group_mode
    }

    pub fn group_keys(&self) -> &[String] {
        &self.group_keys
    }

    pub fn aggregate_method(&self) -> Option<AggregateMethod> {
        self.aggregate_method
    }
}

impl ReadGroup {
    /// The same read with its predicate replaced.
    pub fn with_predicate(mut self, predicate: Predicate) -> Self {
        self.range = self.range.with_predicate(predicate);
        self
    }
}

impl PhysicalOperatorTrait for ReadGroup {}

impl fmt::Display for ReadGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, group: {} [{}]",
            self.range,
            self.group_mode,
            self.group_keys.iter().join(", ")
        )?;
        if let Some(method) = self.aggregate_method {
            write!(f, ", aggregate: {}", method)?;
        }
        Ok(())
    }
}

/// A range read that windows each series and aggregates every window.
#[derive(Clone, Debug, PartialEq)]
pub struct ReadWindowAggregate {
    range: ReadRange,
    every: Duration,
    offset: Duration,
    aggregates: Vec<AggregateMethod>,
    create_empty: bool,
    /// Column copied into `_time`: `_start` or `_stop`. Unset means no time column is produced.
    time_column: Option<String>,
}

impl ReadWindowAggregate {
    pub fn new(range: ReadRange, every: Duration, aggregates: Vec<AggregateMethod>) -> Self {
        Self {
            range,
            every,
            offset: Duration::default(),
            aggregates,
            create_empty: false,
            time_column: None,
        }
    }

    pub fn with_offset(mut self, offset: Duration) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_create_empty(mut self, create_empty: bool) -> Self {
        self.create_empty = create_empty;
        self
    }

    pub fn with_time_column<S: Into<String>>(mut self, time_column: S) -> Self {
        self.time_column = Some(time_column.into());
        self
    }

    pub fn read_range(&self) -> &ReadRange {
        &self.range
    }

    pub fn every(&self) -> Duration {
        self.every
    }

    pub fn offset(&self) -> Duration {
        self.offset
    }

    pub fn aggregates(&self) -> &[AggregateMethod] {
        &self.aggregates
    }

    pub fn create_empty(&self) -> bool {
        self.create_empty
    }

    pub fn time_column(&self) -> Option<&str> {
        self.time_column.as_deref()
    }
}

impl ReadWindowAggregate {
    /// The same read with its predicate replaced.
    pub fn with_predicate(mut self, predicate: Predicate) -> Self {
        self.range = self.range.with_predicate(predicate);
        self
    }
}

impl PhysicalOperatorTrait for ReadWindowAggregate {}

impl fmt::Display for ReadWindowAggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, every: {}, aggregates: [{}]",
            self.range,
            self.every,
            self.aggregates.iter().join(", ")
        )?;
        if !self.offset.is_zero() {
            write!(f, ", offset: {}", self.offset)?;
        }
        if self.create_empty {
            write!(f, ", createEmpty: true")?;
        }
        if let Some(column) = &self.time_column {
            write!(f, ", timeColumn: {}", column)?;
        }
        Ok(())
    }
}

/// Reads the distinct tag keys of the series in range.
#[derive(Clone, Debug, PartialEq)]
pub struct ReadTagKeys {
    range: ReadRange,
}

impl ReadTagKeys {
    pub fn new(range: ReadRange) -> Self {
        Self { range }
    }

    pub fn read_range(&self) -> &ReadRange {
        &self.range
    }
}

impl ReadTagKeys {
    /// The same read with its predicate replaced.
    pub fn with_predicate(mut self, predicate: Predicate) -> Self {
        self.range = self.range.with_predicate(predicate);
        self
    }
}

impl PhysicalOperatorTrait for ReadTagKeys {}

impl fmt::Display for ReadTagKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.range)
    }
}

/// Reads the distinct values of one tag across the series in range.
#[derive(Clone, Debug, PartialEq)]
pub struct ReadTagValues {
    range: ReadRange,
    tag_key: String,
}

impl ReadTagValues {
    pub fn new<S: Into<String>>(range: ReadRange, tag_key: S) -> Self {
        Self {
            range,
            tag_key: tag_key.into(),
        }
    }

    pub fn read_range(&self) -> &ReadRange {
        &self.range
    }

    pub fn tag_key(&self) -> &str {
        &self.tag_key
    }
}

impl ReadTagValues {
    /// The same read with its predicate replaced.
    pub fn with_predicate(mut self, predicate: Predicate) -> Self {
        self.range = self.range.with_predicate(predicate);
        self
    }
}

impl PhysicalOperatorTrait for ReadTagValues {}

impl fmt::Display for ReadTagValues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, tagKey: {:?}", self.range, self.tag_key)
    }
}
