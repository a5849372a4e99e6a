use crate::error::OptResult;
use crate::operator::{
    GroupMode, LogicalOperator, Mutation, Operator, OperatorKind, PhysicalOperator, ReadTagKeys,
    ReadTagValues, SchemaMutation, START_COLUMN, STOP_COLUMN, TIME_COLUMN, VALUE_COLUMN,
};
use crate::optimizer::OptimizerContext;
use crate::rules::{OptExpression, Pattern, Rule, RuleResult};

lazy_static! {
    static ref TAG_KEYS_PATTERN: Pattern = Pattern::chain([
        OperatorKind::Distinct,
        OperatorKind::SchemaMutation,
        OperatorKind::Keys,
        OperatorKind::ReadRange,
    ]);
    static ref TAG_VALUES_PATTERN: Pattern = Pattern::chain([
        OperatorKind::Distinct,
        OperatorKind::Group,
        OperatorKind::SchemaMutation,
        OperatorKind::ReadRange,
    ]);
}

/// Whether `mutation` keeps exactly `column`.
fn keeps_only(mutation: &SchemaMutation, column: &str) -> bool {
    matches!(
        mutation.single(),
        Some(Mutation::Keep { columns }) if matches!(columns.as_slice(), [kept] if kept == column)
    )
}

/// `keys() |> keep(columns: ["_value"]) |> distinct()`, the tag keys of the series in range.
#[derive(Clone, Debug)]
pub struct PushDownReadTagKeysRule;

impl Rule for PushDownReadTagKeysRule {
    fn pattern(&self) -> &Pattern {
        &TAG_KEYS_PATTERN
    }

    fn apply(
        &self,
        input: OptExpression,
        _context: &OptimizerContext,
        result: &mut RuleResult,
    ) -> OptResult<()> {
        let Some(keep_expr) = input.input(0) else {
            return Ok(());
        };
        let Some(keys_expr) = keep_expr.input(0) else {
            return Ok(());
        };
        let Some(read_expr) = keys_expr.input(0) else {
            return Ok(());
        };
        let (Some(distinct), Some(keep), Some(keys), Some(read)) = (
            input.logical().and_then(LogicalOperator::as_logical_distinct),
            keep_expr
                .logical()
                .and_then(LogicalOperator::as_logical_schema_mutation),
            keys_expr.logical().and_then(LogicalOperator::as_logical_keys),
            read_expr
                .physical()
                .and_then(PhysicalOperator::as_physical_read_range),
        ) else {
            return Ok(());
        };

        if !keeps_only(keep, keys.column()) || distinct.column() != keys.column() {
            return Ok(());
        }

        result.add(OptExpression::with_operator(
            Operator::physical(ReadTagKeys::new(read.clone())),
            read_expr.inputs().to_vec(),
        ));
        Ok(())
    }
}

/// `keep(columns: [tag]) |> group() |> distinct(column: tag)`, the values of one tag.
#[derive(Clone, Debug)]
pub struct PushDownReadTagValuesRule;

impl Rule for PushDownReadTagValuesRule {
    fn pattern(&self) -> &Pattern {
        &TAG_VALUES_PATTERN
    }

    fn apply(
        &self,
        input: OptExpression,
        _context: &OptimizerContext,
        result: &mut RuleResult,
    ) -> OptResult<()> {
        let Some(group_expr) = input.input(0) else {
            return Ok(());
        };
        let Some(keep_expr) = group_expr.input(0) else {
            return Ok(());
        };
        let Some(read_expr) = keep_expr.input(0) else {
            return Ok(());
        };
        let (Some(distinct), Some(group), Some(keep), Some(read)) = (
            input.logical().and_then(LogicalOperator::as_logical_distinct),
            group_expr.logical().and_then(LogicalOperator::as_logical_group),
            keep_expr
                .logical()
                .and_then(LogicalOperator::as_logical_schema_mutation),
            read_expr
                .physical()
                .and_then(PhysicalOperator::as_physical_read_range),
        ) else {
            return Ok(());
        };

        let tag = distinct.column();
        if group.mode() != GroupMode::By || !group.keys().is_empty() || !keeps_only(keep, tag) {
            return Ok(());
        }
        if [TIME_COLUMN, VALUE_COLUMN, START_COLUMN, STOP_COLUMN].contains(&tag) {
            return Ok(());
        }

        result.add(OptExpression::with_operator(
            Operator::physical(ReadTagValues::new(read.clone(), tag)),
            read_expr.inputs().to_vec(),
        ));
        Ok(())
    }
}
