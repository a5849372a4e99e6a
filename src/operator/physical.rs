use std::fmt;

use derive_more::From;
use enum_as_inner::EnumAsInner;

use crate::operator::{
    Cost, OperatorKind, PhysicalOperatorTrait, ReadGroup, ReadRange, ReadTagKeys, ReadTagValues,
    ReadWindowAggregate,
};
use crate::storage::Predicate;

/// Storage reads. Every one of them is a [`ReadRange`] with extra work done in the engine.
#[derive(Clone, Debug, PartialEq, EnumAsInner, From)]
pub enum PhysicalOperator {
    PhysicalReadRange(ReadRange),
    PhysicalReadGroup(ReadGroup),
    PhysicalReadWindowAggregate(ReadWindowAggregate),
    PhysicalReadTagKeys(ReadTagKeys),
    PhysicalReadTagValues(ReadTagValues),
}

impl PhysicalOperator {
    pub fn kind(&self) -> OperatorKind {
        match self {
            PhysicalOperator::PhysicalReadRange(_) => OperatorKind::ReadRange,
            PhysicalOperator::PhysicalReadGroup(spec) if spec.aggregate_method().is_some() => {
                OperatorKind::ReadGroupAggregate
            }
            PhysicalOperator::PhysicalReadGroup(_) => OperatorKind::ReadGroup,
            PhysicalOperator::PhysicalReadWindowAggregate(_) => OperatorKind::ReadWindowAggregate,
            PhysicalOperator::PhysicalReadTagKeys(_) => OperatorKind::ReadTagKeys,
            PhysicalOperator::PhysicalReadTagValues(_) => OperatorKind::ReadTagValues,
        }
    }

    pub fn read_range(&self) -> &ReadRange {
        match self {
            PhysicalOperator::PhysicalReadRange(spec) => spec,
            PhysicalOperator::PhysicalReadGroup(spec) => spec.read_range(),
            PhysicalOperator::PhysicalReadWindowAggregate(spec) => spec.read_range(),
            PhysicalOperator::PhysicalReadTagKeys(spec) => spec.read_range(),
            PhysicalOperator::PhysicalReadTagValues(spec) => spec.read_range(),
        }
    }

    /// The same read with its predicate replaced.
    pub fn with_predicate(self, predicate: Predicate) -> Self {
        match self {
            PhysicalOperator::PhysicalReadRange(spec) => spec.with_predicate(predicate).into(),
            PhysicalOperator::PhysicalReadGroup(spec) => spec.with_predicate(predicate).into(),
            PhysicalOperator::PhysicalReadWindowAggregate(spec) => {
                spec.with_predicate(predicate).into()
            }
            PhysicalOperator::PhysicalReadTagKeys(spec) => spec.with_predicate(predicate).into(),
            PhysicalOperator::PhysicalReadTagValues(spec) => spec.with_predicate(predicate).into(),
        }
    }
}

impl PhysicalOperatorTrait for PhysicalOperator {
    fn cost(&self) -> Cost {
        match self {
            PhysicalOperator::PhysicalReadRange(spec) => spec.cost(),
            PhysicalOperator::PhysicalReadGroup(spec) => spec.cost(),
            PhysicalOperator::PhysicalReadWindowAggregate(spec) => spec.cost(),
            PhysicalOperator::PhysicalReadTagKeys(spec) => spec.cost(),
            PhysicalOperator::PhysicalReadTagValues(spec) => spec.cost(),
        }
    }
}

impl fmt::Display for PhysicalOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhysicalOperator::PhysicalReadRange(spec) => write!(f, "{}", spec),
            PhysicalOperator::PhysicalReadGroup(spec) => write!(f, "{}", spec),
            PhysicalOperator::PhysicalReadWindowAggregate(spec) => write!(f, "{}", spec),
            PhysicalOperator::PhysicalReadTagKeys(spec) => write!(f, "{}", spec),
            PhysicalOperator::PhysicalReadTagValues(spec) => write!(f, "{}", spec),
        }
    }
}
