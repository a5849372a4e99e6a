use crate::error::OptResult;
use crate::operator::{LogicalOperator, Operator, OperatorKind};
use crate::optimizer::OptimizerContext;
use crate::rules::{OptExpression, Pattern, Rule, RuleResult};
use crate::semantic::Expression;

lazy_static! {
    static ref PATTERN: Pattern = Pattern::chain([OperatorKind::Filter, OperatorKind::Filter]);
}

/// Collapses two consecutive filters into one.
#[derive(Clone, Debug)]
pub struct MergeFiltersRule;

impl Rule for MergeFiltersRule {
    fn pattern(&self) -> &Pattern {
        &PATTERN
    }

    fn apply(
        &self,
        input: OptExpression,
        _context: &OptimizerContext,
        result: &mut RuleResult,
    ) -> OptResult<()> {
        let Some(inner_expr) = input.input(0) else {
            return Ok(());
        };
        let (Some(outer), Some(inner)) = (
            input.logical().and_then(LogicalOperator::as_logical_filter),
            inner_expr.logical().and_then(LogicalOperator::as_logical_filter),
        ) else {
            return Ok(());
        };

        if outer.keep_empty_tables() != inner.keep_empty_tables()
            || outer.function().parameters() != inner.function().parameters()
        {
            return Ok(());
        }

        let body = Expression::and(
            outer.function().body().clone(),
            inner.function().body().clone(),
        );
        result.add(OptExpression::with_operator(
            Operator::logical(inner.with_body(body)),
            inner_expr.inputs().to_vec(),
        ));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operator::{Filter, Range};
    use crate::optimizer::Feature;
    use crate::plan::LogicalPlanBuilder;
    use crate::rules::test_util::*;
    use crate::rules::{default_rules, RuleImpl};
    use crate::semantic::{BinaryOperatorKind, FunctionExpression};

    fn rules() -> Vec<RuleImpl> {
        vec![MergeFiltersRule.into()]
    }

    fn eq(column: &str, value: &str) -> Expression {
        Expression::binary(BinaryOperatorKind::Equal, r(column), Expression::string(value))
    }

    fn filter(param: &str, body: Expression) -> Filter {
        Filter::new(FunctionExpression::with_param(param, body))
    }

    fn from_range() -> LogicalPlanBuilder {
        let mut builder = LogicalPlanBuilder::new();
        builder
            .from_bucket("my-bucket")
            .range(Range::absolute(bounds()));
        builder
    }

    #[test]
    fn test_merge_filters() {
        let before = from_range()
            .filter(filter("r", eq("_field", "usage_idle")))
            .filter(filter("r", eq("_measurement", "cpu")))
            .build();
        let after = from_range()
            .filter(filter(
                "r",
                Expression::and(eq("_measurement", "cpu"), eq("_field", "usage_idle")),
            ))
            .build();
        assert_rewrite(rules(), before, after);
    }

    #[test]
    fn test_three_filters() {
        let before = from_range()
            .filter(filter("r", eq("a", "1")))
            .filter(filter("r", eq("b", "2")))
            .filter(filter("r", eq("c", "3")))
            .build();
        let optimized = optimize(rules(), &context(), before).unwrap();
        let filters = optimized
            .bfs_iterator()
            .filter(|node| node.operator().kind() == OperatorKind::Filter)
            .count();
        assert_eq!(1, filters);
    }

    #[test]
    fn test_incompatible_filters() {
        let keep_empty = from_range()
            .filter(filter("r", eq("_field", "usage_idle")).with_keep_empty_tables(true))
            .filter(filter("r", eq("_measurement", "cpu")))
            .build();
        assert_unchanged(rules(), keep_empty);

        let renamed = from_range()
            .filter(filter("r", eq("_field", "usage_idle")))
            .filter(filter(
                "row",
                Expression::binary(
                    BinaryOperatorKind::Equal,
                    Expression::member("row", "_measurement"),
                    Expression::string("cpu"),
                ),
            ))
            .build();
        assert_unchanged(rules(), renamed);
    }

    #[test]
    fn test_off_by_default() {
        let context = context();
        assert!(!default_rules(&context)
            .iter()
            .any(|rule| matches!(rule, RuleImpl::MergeFiltersRule(_))));
        let context = context.with_feature(Feature::MergeFilters);
        assert!(default_rules(&context)
            .iter()
            .any(|rule| matches!(rule, RuleImpl::MergeFiltersRule(_))));
    }
}
