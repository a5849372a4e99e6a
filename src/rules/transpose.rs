use itertools::Itertools;

use crate::error::OptResult;
use crate::operator::{
    AggregateMethod, Group, GroupMode, LogicalOperator, Operator, OperatorKind, PhysicalOperator,
    START_COLUMN, STOP_COLUMN,
};
use crate::optimizer::{Feature, OptimizerContext};
use crate::rules::window_aggregate::{
    is_pushable_window, is_pushable_window_aggregate, window_aggregate_read,
};
use crate::rules::{OptExpression, Pattern, Rule, RuleResult};

lazy_static! {
    static ref PATTERN: Pattern = Pattern::chain([
        OperatorKind::Min
            | OperatorKind::Max
            | OperatorKind::First
            | OperatorKind::Last
            | OperatorKind::Sum
            | OperatorKind::Count,
        OperatorKind::Window.into(),
        OperatorKind::ReadGroup.into(),
    ]);
}

/// Rewrites `group |> window |> agg` as a windowed aggregate read per series followed by a
/// regroup on the window bounds and the same aggregate across series.
///
/// Counts per series add up, so the aggregate across series of a count is a sum.
#[derive(Clone, Debug)]
pub struct GroupWindowAggregateTransposeRule;

impl Rule for GroupWindowAggregateTransposeRule {
    fn pattern(&self) -> &Pattern {
        &PATTERN
    }

    fn apply(
        &self,
        input: OptExpression,
        context: &OptimizerContext,
        result: &mut RuleResult,
    ) -> OptResult<()> {
        if !context.has_feature(Feature::GroupWindowAggregateTranspose) {
            return Ok(());
        }

        let Some(window_expr) = input.input(0) else {
            return Ok(());
        };
        let Some(read_expr) = window_expr.input(0) else {
            return Ok(());
        };
        let (Some(aggregate), Some(window), Some(read)) = (
            input.logical().and_then(LogicalOperator::as_logical_aggregate),
            window_expr.logical().and_then(LogicalOperator::as_logical_window),
            read_expr
                .physical()
                .and_then(PhysicalOperator::as_physical_read_group),
        ) else {
            return Ok(());
        };

        if read.group_mode() != GroupMode::By || read.aggregate_method().is_some() {
            return Ok(());
        }
        if !is_pushable_window(window) || !is_pushable_window_aggregate(aggregate) {
            return Ok(());
        }

        let window_read = window_aggregate_read(read.read_range(), window, aggregate);
        let group = Group::by(
            read.group_keys()
                .iter()
                .map(String::as_str)
                .chain([START_COLUMN, STOP_COLUMN])
                .unique(),
        );
        let merge = match aggregate.method() {
            AggregateMethod::Count => aggregate.with_method(AggregateMethod::Sum),
            _ => aggregate.clone(),
        };

        let window_read = OptExpression::with_operator(
            Operator::physical(window_read),
            read_expr.inputs().to_vec(),
        );
        let group = OptExpression::with_operator(Operator::logical(group), vec![window_read]);
        result.add(OptExpression::with_operator(Operator::logical(merge), vec![group]));
        Ok(())
    }
}
