use crate::error::OptResult;
use crate::operator::{LogicalOperator, Operator, OperatorKind, ReadRange};
use crate::optimizer::OptimizerContext;
use crate::rules::{OptExpression, Pattern, Rule, RuleResult};
use crate::storage::resolve_bucket_id;

lazy_static! {
    static ref PATTERN: Pattern = Pattern::chain([OperatorKind::Range, OperatorKind::From]);
}

/// Turns `from |> range` into a range read with absolute bounds and a resolved bucket.
#[derive(Clone, Debug)]
pub struct PushDownRangeRule;

impl Rule for PushDownRangeRule {
    fn pattern(&self) -> &Pattern {
        &PATTERN
    }

    fn apply(
        &self,
        input: OptExpression,
        context: &OptimizerContext,
        result: &mut RuleResult,
    ) -> OptResult<()> {
        let Some(from_expr) = input.input(0) else {
            return Ok(());
        };
        let (Some(range), Some(from)) = (
            input.logical().and_then(LogicalOperator::as_logical_range),
            from_expr.logical().and_then(LogicalOperator::as_logical_from),
        ) else {
            return Ok(());
        };

        let bounds = range.bounds(context.now())?;
        let bucket_id = resolve_bucket_id(
            context.bucket_lookup(),
            context.org_id(),
            from.bucket(),
            from.bucket_id(),
        )?;

        let read =
            ReadRange::new(from.bucket().unwrap_or_default(), bounds).with_bucket_id(bucket_id);
        result.add(OptExpression::with_operator(
            Operator::physical(read),
            from_expr.inputs().to_vec(),
        ));
        Ok(())
    }
}
