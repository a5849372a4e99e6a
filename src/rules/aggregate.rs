use crate::error::OptResult;
use crate::operator::{
    LogicalOperator, Operator, OperatorKind, PhysicalOperator, ReadWindowAggregate,
};
use crate::optimizer::OptimizerContext;
use crate::rules::{OptExpression, Pattern, Rule, RuleResult};
use crate::time::Duration;

lazy_static! {
    static ref BARE_PATTERN: Pattern = Pattern::chain([
        OperatorKind::Count | OperatorKind::Sum | OperatorKind::First | OperatorKind::Last,
        OperatorKind::ReadRange.into(),
    ]);
    static ref GROUP_PATTERN: Pattern = Pattern::chain([
        OperatorKind::Count
            | OperatorKind::Sum
            | OperatorKind::First
            | OperatorKind::Last
            | OperatorKind::Max
            | OperatorKind::Min,
        OperatorKind::ReadGroup.into(),
    ]);
}

/// Computes an aggregate over a whole range read as a single storage window.
#[derive(Clone, Debug)]
pub struct PushDownBareAggregateRule;

impl Rule for PushDownBareAggregateRule {
    fn pattern(&self) -> &Pattern {
        &BARE_PATTERN
    }

    fn apply(
        &self,
        input: OptExpression,
        _context: &OptimizerContext,
        result: &mut RuleResult,
    ) -> OptResult<()> {
        let Some(read_expr) = input.input(0) else {
            return Ok(());
        };
        let (Some(aggregate), Some(read)) = (
            input.logical().and_then(LogicalOperator::as_logical_aggregate),
            read_expr
                .physical()
                .and_then(PhysicalOperator::as_physical_read_range),
        ) else {
            return Ok(());
        };
        if !aggregate.reads_value_only() {
            return Ok(());
        }

        let window_read =
            ReadWindowAggregate::new(read.clone(), Duration::MAX, vec![aggregate.method()]);
        result.add(OptExpression::with_operator(
            Operator::physical(window_read),
            read_expr.inputs().to_vec(),
        ));
        Ok(())
    }
}

/// Lets storage aggregate each group of a grouped read.
#[derive(Clone, Debug)]
pub struct PushDownGroupAggregateRule;

impl Rule for PushDownGroupAggregateRule {
    fn pattern(&self) -> &Pattern {
        &GROUP_PATTERN
    }

    fn apply(
        &self,
        input: OptExpression,
        _context: &OptimizerContext,
        result: &mut RuleResult,
    ) -> OptResult<()> {
        let Some(read_expr) = input.input(0) else {
            return Ok(());
        };
        let (Some(aggregate), Some(read)) = (
            input.logical().and_then(LogicalOperator::as_logical_aggregate),
            read_expr
                .physical()
                .and_then(PhysicalOperator::as_physical_read_group),
        ) else {
            return Ok(());
        };
        if read.aggregate_method().is_some() || !aggregate.reads_value_only() {
            return Ok(());
        }

        result.add(OptExpression::with_operator(
            Operator::physical(read.clone().with_aggregate_method(aggregate.method())),
            read_expr.inputs().to_vec(),
        ));
        Ok(())
    }
}
