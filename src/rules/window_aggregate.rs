use crate::error::OptResult;
use crate::operator::{
    Aggregate, AggregateMethod, LogicalOperator, Mutation, Operator, OperatorKind,
    PhysicalOperator, ReadRange, ReadWindowAggregate, Window, START_COLUMN, STOP_COLUMN,
    TIME_COLUMN,
};
use crate::optimizer::OptimizerContext;
use crate::rules::{OptExpression, Pattern, Rule, RuleResult};
use crate::time::Duration;

lazy_static! {
    static ref PATTERN: Pattern = Pattern::chain([
        OperatorKind::Min
            | OperatorKind::Max
            | OperatorKind::Count
            | OperatorKind::Sum
            | OperatorKind::First
            | OperatorKind::Last,
        OperatorKind::Window.into(),
        OperatorKind::ReadRange.into(),
    ]);
    static ref BY_TIME_PATTERN: Pattern = Pattern::chain([
        OperatorKind::Window,
        OperatorKind::SchemaMutation,
        OperatorKind::ReadWindowAggregate,
    ]);
}

/// Whether storage can produce the windows of `window` itself.
pub(super) fn is_pushable_window(window: &Window) -> bool {
    window.every() == window.period()
        && window.every().is_positive()
        && !window.offset().is_negative()
        && window.has_default_columns()
}

/// Whether storage can compute `aggregate` for each window.
///
/// Storage aggregates `_value` only; `mean` is never computed there.
pub(super) fn is_pushable_window_aggregate(aggregate: &Aggregate) -> bool {
    aggregate.method() != AggregateMethod::Mean && aggregate.reads_value_only()
}

/// The window aggregate storage computes for `aggregate` over the windows of `window`.
pub(super) fn window_aggregate_read(
    read: &ReadRange,
    window: &Window,
    aggregate: &Aggregate,
) -> ReadWindowAggregate {
    ReadWindowAggregate::new(read.clone(), window.every(), vec![aggregate.method()])
        .with_offset(window.offset())
        .with_create_empty(window.create_empty())
}

/// Turns `window |> min()` and friends into a windowed aggregate read.
#[derive(Clone, Debug)]
pub struct PushDownWindowAggregateRule;

impl Rule for PushDownWindowAggregateRule {
    fn pattern(&self) -> &Pattern {
        &PATTERN
    }

    fn apply(
        &self,
        input: OptExpression,
        _context: &OptimizerContext,
        result: &mut RuleResult,
    ) -> OptResult<()> {
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
                .and_then(PhysicalOperator::as_physical_read_range),
        ) else {
            return Ok(());
        };

        if !is_pushable_window(window) || !is_pushable_window_aggregate(aggregate) {
            return Ok(());
        }

        result.add(OptExpression::with_operator(
            Operator::physical(window_aggregate_read(read, window, aggregate)),
            read_expr.inputs().to_vec(),
        ));
        Ok(())
    }
}

/// Folds the `duplicate(column: "_stop", as: "_time") |> window(every: inf)` tail of an
/// `aggregateWindow` into the windowed aggregate read that precedes it.
#[derive(Clone, Debug)]
pub struct PushDownWindowAggregateByTimeRule;

impl Rule for PushDownWindowAggregateByTimeRule {
    fn pattern(&self) -> &Pattern {
        &BY_TIME_PATTERN
    }

    fn apply(
        &self,
        input: OptExpression,
        _context: &OptimizerContext,
        result: &mut RuleResult,
    ) -> OptResult<()> {
        let Some(mutation_expr) = input.input(0) else {
            return Ok(());
        };
        let Some(read_expr) = mutation_expr.input(0) else {
            return Ok(());
        };
        let (Some(window), Some(mutation), Some(read)) = (
            input.logical().and_then(LogicalOperator::as_logical_window),
            mutation_expr
                .logical()
                .and_then(LogicalOperator::as_logical_schema_mutation),
            read_expr
                .physical()
                .and_then(PhysicalOperator::as_physical_read_window_aggregate),
        ) else {
            return Ok(());
        };

        let Some(Mutation::Duplicate { column, as_ }) = mutation.single() else {
            return Ok(());
        };
        if (column != START_COLUMN && column != STOP_COLUMN) || as_ != TIME_COLUMN {
            return Ok(());
        }
        if !is_closing_window(window) || read.time_column().is_some() {
            return Ok(());
        }

        result.add(OptExpression::with_operator(
            Operator::physical(read.clone().with_time_column(column.as_str())),
            read_expr.inputs().to_vec(),
        ));
        Ok(())
    }
}

/// `window(every: inf)`, which puts every row back into a single window.
fn is_closing_window(window: &Window) -> bool {
    window.every() == Duration::MAX
        && window.period() == Duration::MAX
        && window.has_default_columns()
        && !window.create_empty()
}
