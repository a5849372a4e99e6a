use std::fmt;

use derive_more::From;
use enum_as_inner::EnumAsInner;

use crate::operator::{
    Aggregate, Distinct, Filter, FromBucket, Group, Keys, OperatorKind, Range, SchemaMutation,
    Window,
};

/// Logical operator of a query, as written by the user.
#[derive(Clone, Debug, PartialEq, EnumAsInner, From)]
pub enum LogicalOperator {
    LogicalFrom(FromBucket),
    LogicalRange(Range),
    LogicalFilter(Filter),
    LogicalGroup(Group),
    LogicalWindow(Window),
    LogicalAggregate(Aggregate),
    LogicalSchemaMutation(SchemaMutation),
    LogicalKeys(Keys),
    LogicalDistinct(Distinct),
}

impl LogicalOperator {
    pub fn kind(&self) -> OperatorKind {
        match self {
            LogicalOperator::LogicalFrom(_) => OperatorKind::From,
            LogicalOperator::LogicalRange(_) => OperatorKind::Range,
            LogicalOperator::LogicalFilter(_) => OperatorKind::Filter,
            LogicalOperator::LogicalGroup(_) => OperatorKind::Group,
            LogicalOperator::LogicalWindow(_) => OperatorKind::Window,
            LogicalOperator::LogicalAggregate(spec) => spec.method().kind(),
            LogicalOperator::LogicalSchemaMutation(_) => OperatorKind::SchemaMutation,
            LogicalOperator::LogicalKeys(_) => OperatorKind::Keys,
            LogicalOperator::LogicalDistinct(_) => OperatorKind::Distinct,
        }
    }
}

impl fmt::Display for LogicalOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogicalOperator::LogicalFrom(spec) => write!(f, "{}", spec),
            LogicalOperator::LogicalRange(spec) => write!(f, "{}", spec),
            LogicalOperator::LogicalFilter(spec) => write!(f, "{}", spec),
            LogicalOperator::LogicalGroup(spec) => write!(f, "{}", spec),
            LogicalOperator::LogicalWindow(spec) => write!(f, "{}", spec),
            LogicalOperator::LogicalAggregate(spec) => write!(f, "{}", spec),
            LogicalOperator::LogicalSchemaMutation(spec) => write!(f, "{}", spec),
            LogicalOperator::LogicalKeys(spec) => write!(f, "{}", spec),
            LogicalOperator::LogicalDistinct(spec) => write!(f, "{}", spec),
        }
    }
}
