//! Operators of a query plan.
//!
//! Logical operators come straight from the query; physical operators are reads that the storage
//! engine executes itself. Pushdown rules replace logical subgraphs with physical reads.

use std::fmt;

use derive_more::From;
use enum_as_inner::EnumAsInner;
use enumset::EnumSetType;
use strum_macros::Display;

mod aggregate;
pub use aggregate::*;
mod distinct;
pub use distinct::*;
mod filter;
pub use filter::*;
mod from;
pub use from::*;
mod group;
pub use group::*;
mod keys;
pub use keys::*;
mod logical;
pub use logical::*;
mod physical;
pub use physical::*;
mod range;
pub use range::*;
mod read;
pub use read::*;
mod schema;
pub use schema::*;
mod window;
pub use window::*;

pub const TIME_COLUMN: &str = "_time";
pub const START_COLUMN: &str = "_start";
pub const STOP_COLUMN: &str = "_stop";
pub const VALUE_COLUMN: &str = "_value";

/// Operator kinds, used by rule patterns to match nodes.
///
/// Aggregates get one kind per method, and a grouped read that already aggregates is told apart
/// from a plain one.
#[derive(Debug, Hash, PartialOrd, Ord, EnumSetType, Display)]
pub enum OperatorKind {
    From,
    Range,
    Filter,
    Group,
    Window,
    Count,
    Sum,
    Mean,
    Min,
    Max,
    First,
    Last,
    SchemaMutation,
    Keys,
    Distinct,
    ReadRange,
    ReadGroup,
    ReadGroupAggregate,
    ReadWindowAggregate,
    ReadTagKeys,
    ReadTagValues,
}

/// Estimated cost of running a physical operator.
///
/// The storage engine does not expose statistics to the planner, so every read costs the same.
#[derive(Clone, Copy, Debug, Default, PartialEq, PartialOrd, From, derive_more::Display)]
pub struct Cost(f64);

pub trait PhysicalOperatorTrait {
    fn cost(&self) -> Cost {
        Cost::default()
    }
}

#[derive(Clone, Debug, PartialEq, EnumAsInner, From)]
pub enum Operator {
    Logical(LogicalOperator),
    Physical(PhysicalOperator),
}

impl Operator {
    pub fn logical(operator: impl Into<LogicalOperator>) -> Self {
        Operator::Logical(operator.into())
    }

    pub fn physical(operator: impl Into<PhysicalOperator>) -> Self {
        Operator::Physical(operator.into())
    }

    pub fn kind(&self) -> OperatorKind {
        match self {
            Operator::Logical(op) => op.kind(),
            Operator::Physical(op) => op.kind(),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operator::Logical(op) => write!(f, "{}", op),
            Operator::Physical(op) => write!(f, "{}", op),
        }
    }
}
