use crate::error::OptResult;
use crate::operator::{LogicalOperator, Operator, OperatorKind, PhysicalOperator, VALUE_COLUMN};
use crate::optimizer::OptimizerContext;
use crate::rules::{OptExpression, Pattern, Rule, RuleResult};
use crate::semantic::{BinaryOperatorKind, Expression, LogicalOperatorKind, UnaryOperatorKind};
use crate::storage::{merge_predicates, to_storage_predicate, Logical};

lazy_static! {
    static ref PATTERN: Pattern = Pattern::chain([
        OperatorKind::Filter.into(),
        OperatorKind::ReadRange
            | OperatorKind::ReadGroup
            | OperatorKind::ReadGroupAggregate
            | OperatorKind::ReadWindowAggregate
            | OperatorKind::ReadTagKeys
            | OperatorKind::ReadTagValues,
    ]);
}

/// Moves the conjuncts of a filter that storage can evaluate into the read's predicate.
///
/// What is left over stays behind in a filter on top of the read.
#[derive(Clone, Debug)]
pub struct PushDownFilterRule;

impl Rule for PushDownFilterRule {
    fn pattern(&self) -> &Pattern {
        &PATTERN
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
        let (Some(filter), Some(read)) = (
            input.logical().and_then(LogicalOperator::as_logical_filter),
            read_expr.physical(),
        ) else {
            return Ok(());
        };
        if filter.keep_empty_tables() {
            return Ok(());
        }
        let Some(row) = filter.function().row_parameter() else {
            return Ok(());
        };
        let Some(scope) = PushScope::of(read) else {
            return Ok(());
        };

        let mut conjuncts = vec![];
        split_conjuncts(filter.function().body(), &mut conjuncts);
        let (pushable, residual): (Vec<_>, Vec<_>) = conjuncts
            .into_iter()
            .partition(|expr| scope.is_pushable(expr, row));

        let Some(pushed) = pushable
            .into_iter()
            .map(rewrite_exists)
            .reduce(Expression::and)
        else {
            return Ok(());
        };

        let predicate = to_storage_predicate(&pushed, row)?;
        let predicate = match read.read_range().predicate() {
            Some(existing) => merge_predicates(Logical::And, vec![existing.clone(), predicate])?,
            None => predicate,
        };
        let read = OptExpression::with_operator(
            Operator::Physical(read.clone().with_predicate(predicate)),
            read_expr.inputs().to_vec(),
        );

        result.add(match residual.into_iter().reduce(Expression::and) {
            Some(body) => {
                OptExpression::with_operator(Operator::logical(filter.with_body(body)), vec![read])
            }
            None => read,
        });
        Ok(())
    }
}

/// Which conjuncts a read can take in its predicate.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum PushScope {
    Everything,
    /// Tags are constant per series, so they survive windowing. `_value` does not.
    TagsOnly,
}

impl PushScope {
    fn of(read: &PhysicalOperator) -> Option<Self> {
        match read {
            PhysicalOperator::PhysicalReadRange(_) => Some(PushScope::Everything),
            PhysicalOperator::PhysicalReadGroup(spec) if spec.aggregate_method().is_none() => {
                Some(PushScope::Everything)
            }
            PhysicalOperator::PhysicalReadWindowAggregate(_) => Some(PushScope::TagsOnly),
            // Aggregated groups and tag reads no longer produce the original rows.
            _ => None,
        }
    }

    fn is_pushable(self, expr: &Expression, row: &str) -> bool {
        match expr {
            Expression::Logical { left, right, .. } => {
                self.is_pushable(left, row) && self.is_pushable(right, row)
            }
            Expression::Unary {
                operator: UnaryOperatorKind::Exists,
                argument,
            } => tag_ref(argument, row).is_some(),
            Expression::Unary {
                operator: UnaryOperatorKind::Not,
                argument,
            } => matches!(
                argument.as_ref(),
                Expression::Unary { operator: UnaryOperatorKind::Exists, argument }
                    if tag_ref(argument, row).is_some()
            ),
            Expression::Binary {
                operator,
                left,
                right,
            } => match column_ref(left, row) {
                Some(VALUE_COLUMN) => {
                    self == PushScope::Everything && is_pushable_field_comparison(*operator, right)
                }
                Some(_) => is_pushable_tag_comparison(*operator, right),
                None => false,
            },
            _ => false,
        }
    }
}

/// `row.<column>`
fn column_ref<'a>(expr: &'a Expression, row: &str) -> Option<&'a str> {
    match expr {
        Expression::Member { object, property } => match object.as_ref() {
            Expression::Identifier(name) if name == row => Some(property),
            _ => None,
        },
        _ => None,
    }
}

fn tag_ref<'a>(expr: &'a Expression, row: &str) -> Option<&'a str> {
    column_ref(expr, row).filter(|column| *column != VALUE_COLUMN)
}

fn is_pushable_field_comparison(operator: BinaryOperatorKind, literal: &Expression) -> bool {
    use BinaryOperatorKind::*;

    match operator {
        Equal | NotEqual | LessThan | LessThanEqual | GreaterThan | GreaterThanEqual => matches!(
            literal,
            Expression::StringLiteral(_)
                | Expression::IntegerLiteral(_)
                | Expression::FloatLiteral(_)
                | Expression::BooleanLiteral(_)
        ),
        RegexpMatch | NotRegexpMatch => matches!(literal, Expression::RegexpLiteral(_)),
        _ => false,
    }
}

fn is_pushable_tag_comparison(operator: BinaryOperatorKind, literal: &Expression) -> bool {
    use BinaryOperatorKind::*;

    match (operator, literal) {
        // Storage cannot tell an empty tag from a missing one.
        (Equal, Expression::StringLiteral(value)) => !value.is_empty(),
        (NotEqual | StartsWith, Expression::StringLiteral(_)) => true,
        (RegexpMatch | NotRegexpMatch, Expression::RegexpLiteral(_)) => true,
        _ => false,
    }
}

fn split_conjuncts(expr: &Expression, conjuncts: &mut Vec<Expression>) {
    match expr {
        Expression::Logical {
            operator: LogicalOperatorKind::And,
            left,
            right,
        } => {
            split_conjuncts(left, conjuncts);
            split_conjuncts(right, conjuncts);
        }
        other => conjuncts.push(other.clone()),
    }
}

/// `exists r.k` becomes `r.k != ""` and `not exists r.k` becomes `r.k == ""`.
fn rewrite_exists(expr: Expression) -> Expression {
    match expr {
        Expression::Logical {
            operator,
            left,
            right,
        } => Expression::logical(operator, rewrite_exists(*left), rewrite_exists(*right)),
        Expression::Unary {
            operator: UnaryOperatorKind::Exists,
            argument,
        } => Expression::binary(BinaryOperatorKind::NotEqual, *argument, Expression::string("")),
        Expression::Unary {
            operator: UnaryOperatorKind::Not,
            argument,
        } => match *argument {
            Expression::Unary {
                operator: UnaryOperatorKind::Exists,
                argument,
            } => Expression::binary(BinaryOperatorKind::Equal, *argument, Expression::string("")),
            argument => Expression::not(argument),
        },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OptError;
    use crate::operator::{
        Aggregate, AggregateMethod, Filter, GroupMode, ReadGroup, ReadTagKeys,
        ReadWindowAggregate,
    };
    use crate::plan::LogicalPlanBuilder;
    use crate::rules::test_util::*;
    use crate::rules::{PushDownBareAggregateRule, RuleImpl};
    use crate::semantic::FunctionExpression;
    use crate::storage::Predicate;
    use crate::time::Duration;

    fn rules() -> Vec<RuleImpl> {
        vec![PushDownFilterRule.into()]
    }

    fn filter(body: Expression) -> Filter {
        Filter::new(FunctionExpression::with_param("r", body))
    }

    fn predicate(body: &Expression) -> Predicate {
        to_storage_predicate(body, "r").unwrap()
    }

    fn eq(column: &str, value: &str) -> Expression {
        Expression::binary(BinaryOperatorKind::Equal, r(column), Expression::string(value))
    }

    /// `0.5 < r._value`, the literal on the wrong side.
    fn unpushable() -> Expression {
        Expression::binary(
            BinaryOperatorKind::LessThan,
            Expression::FloatLiteral(0.5),
            r("_value"),
        )
    }

    fn assert_pushed(body: Expression, pushed: Expression) {
        let before = LogicalPlanBuilder::new()
            .read(read_range())
            .filter(filter(body))
            .build();
        let after = LogicalPlanBuilder::new()
            .read(read_range().with_predicate(predicate(&pushed)))
            .build();
        assert_rewrite(rules(), before, after);
    }

    fn assert_not_pushed(body: Expression) {
        let plan = LogicalPlanBuilder::new()
            .read(read_range())
            .filter(filter(body))
            .build();
        assert_unchanged(rules(), plan);
    }

    #[test]
    fn test_simple() {
        let body = eq("_measurement", "cpu");
        assert_pushed(body.clone(), body);
    }

    #[test]
    fn test_two_filters() {
        let before = LogicalPlanBuilder::new()
            .read(read_range())
            .filter(filter(eq("_measurement", "cpu")))
            .filter(filter(eq("_field", "cpu")))
            .build();
        let merged = Expression::and(eq("_measurement", "cpu"), eq("_field", "cpu"));
        let after = LogicalPlanBuilder::new()
            .read(read_range().with_predicate(predicate(&merged)))
            .build();
        assert_rewrite(rules(), before, after);
    }

    #[test]
    fn test_partially_pushable() {
        let before = LogicalPlanBuilder::new()
            .read(read_range())
            .filter(filter(Expression::and(eq("_measurement", "cpu"), unpushable())))
            .build();
        let after = LogicalPlanBuilder::new()
            .read(read_range().with_predicate(predicate(&eq("_measurement", "cpu"))))
            .filter(filter(unpushable()))
            .build();
        assert_rewrite(rules(), before, after);
    }

    #[test]
    fn test_residual_keeps_conjunct_order() {
        let other = Expression::binary(
            BinaryOperatorKind::Addition,
            r("_value"),
            Expression::IntegerLiteral(1),
        );
        let before = LogicalPlanBuilder::new()
            .read(read_range())
            .filter(filter(Expression::and(
                Expression::and(unpushable(), eq("host", "a")),
                Expression::and(other.clone(), eq("region", "b")),
            )))
            .build();
        let pushed = Expression::and(eq("host", "a"), eq("region", "b"));
        let after = LogicalPlanBuilder::new()
            .read(read_range().with_predicate(predicate(&pushed)))
            .filter(filter(Expression::and(unpushable(), other)))
            .build();
        assert_rewrite(rules(), before, after);
    }

    #[test]
    fn test_unpushable() {
        assert_not_pushed(unpushable());
        // An empty tag cannot be told apart from a missing one.
        assert_not_pushed(eq("host", ""));
        assert_not_pushed(Expression::not(eq("host", "server01")));
        assert_not_pushed(Expression::exists(r("_value")));
        assert_not_pushed(Expression::binary(
            BinaryOperatorKind::Equal,
            Expression::member("s", "host"),
            Expression::string("a"),
        ));
        assert_not_pushed(Expression::or(eq("host", "a"), unpushable()));
    }

    #[test]
    fn test_exists() {
        let not_empty = Expression::binary(
            BinaryOperatorKind::NotEqual,
            r("host"),
            Expression::string(""),
        );
        assert_pushed(Expression::exists(r("host")), not_empty.clone());
        assert_pushed(
            Expression::not(Expression::exists(r("host"))),
            eq("host", ""),
        );
        assert_pushed(not_empty.clone(), not_empty.clone());
        assert_pushed(
            Expression::and(eq("host", "cpu"), Expression::exists(r("host"))),
            Expression::and(eq("host", "cpu"), not_empty),
        );
    }

    #[test]
    fn test_value_comparisons() {
        assert_pushed(eq("_value", ""), eq("_value", ""));

        let greater = Expression::binary(
            BinaryOperatorKind::GreaterThan,
            r("_value"),
            Expression::FloatLiteral(0.5),
        );
        assert_pushed(greater.clone(), greater);

        let either = Expression::or(eq("host", "a"), eq("_field", "usage"));
        assert_pushed(either.clone(), either);
    }

    #[test]
    fn test_merges_onto_existing_predicate() {
        let existing = predicate(&eq("_measurement", "cpu"));
        let before = LogicalPlanBuilder::new()
            .read(read_range().with_predicate(existing))
            .filter(filter(eq("host", "a")))
            .build();
        let merged = Expression::and(eq("_measurement", "cpu"), eq("host", "a"));
        let after = LogicalPlanBuilder::new()
            .read(read_range().with_predicate(predicate(&merged)))
            .build();
        assert_rewrite(rules(), before, after);
    }

    #[test]
    fn test_keep_empty_tables_is_left_alone() {
        let plan = LogicalPlanBuilder::new()
            .read(read_range())
            .filter(filter(eq("host", "a")).with_keep_empty_tables(true))
            .build();
        assert_unchanged(rules(), plan);
    }

    #[test]
    fn test_read_group() {
        let group = ReadGroup::new(read_range(), GroupMode::By, vec!["host".to_string()]);
        let before = LogicalPlanBuilder::new()
            .read(group.clone())
            .filter(filter(eq("host", "a")))
            .build();
        let after = LogicalPlanBuilder::new()
            .read(group.clone().with_predicate(predicate(&eq("host", "a"))))
            .build();
        assert_rewrite(rules(), before, after);

        let aggregated = LogicalPlanBuilder::new()
            .read(group.with_aggregate_method(AggregateMethod::Sum))
            .filter(filter(eq("host", "a")))
            .build();
        assert_unchanged(rules(), aggregated);
    }

    #[test]
    fn test_window_aggregate_takes_tags_only() {
        let read = ReadWindowAggregate::new(
            read_range(),
            Duration::from_secs(60),
            vec![AggregateMethod::Max],
        );
        let value = Expression::binary(
            BinaryOperatorKind::GreaterThan,
            r("_value"),
            Expression::FloatLiteral(0.5),
        );
        let before = LogicalPlanBuilder::new()
            .read(read.clone())
            .filter(filter(Expression::and(eq("host", "a"), value.clone())))
            .build();
        let after = LogicalPlanBuilder::new()
            .read(read.with_predicate(predicate(&eq("host", "a"))))
            .filter(filter(value))
            .build();
        assert_rewrite(rules(), before, after);
    }

    #[test]
    fn test_bare_aggregate_takes_tags_only() {
        let read =
            ReadWindowAggregate::new(read_range(), Duration::MAX, vec![AggregateMethod::Count]);
        let value = Expression::binary(
            BinaryOperatorKind::GreaterThan,
            r("_value"),
            Expression::IntegerLiteral(10),
        );

        let before = LogicalPlanBuilder::new()
            .read(read_range())
            .aggregate(Aggregate::on_value(AggregateMethod::Count))
            .filter(filter(Expression::and(value.clone(), eq("host", "a"))))
            .build();
        let after = LogicalPlanBuilder::new()
            .read(read.clone().with_predicate(predicate(&eq("host", "a"))))
            .filter(filter(value.clone()))
            .build();
        let optimized = optimize(
            vec![PushDownBareAggregateRule.into(), PushDownFilterRule.into()],
            &context(),
            before,
        )
        .unwrap();
        assert_eq!(after, optimized);

        let value_only = LogicalPlanBuilder::new()
            .read(read)
            .filter(filter(value))
            .build();
        assert_unchanged(rules(), value_only);
    }

    #[test]
    fn test_tag_reads_take_nothing() {
        let plan = LogicalPlanBuilder::new()
            .read(ReadTagKeys::new(read_range()))
            .filter(filter(eq("host", "a")))
            .build();
        assert_unchanged(rules(), plan);
    }

    #[test]
    fn test_invalid_regex() {
        let plan = LogicalPlanBuilder::new()
            .read(read_range())
            .filter(filter(Expression::binary(
                BinaryOperatorKind::RegexpMatch,
                r("host"),
                Expression::regexp("("),
            )))
            .build();
        let err = optimize(rules(), &context(), plan).unwrap_err();
        assert!(matches!(err.root(), OptError::InvalidRegex { .. }));
    }
}
