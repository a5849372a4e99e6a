//! Translation of filter expressions into storage predicates.

use anyhow::anyhow;
use regex::Regex;

use crate::error::{OptError, OptResult, Side};
use crate::semantic::{BinaryOperatorKind, Expression, LogicalOperatorKind};
use crate::storage::predicate::{Comparison, Literal, Logical, Node, Predicate, TagKey};

pub const MEASUREMENT_COLUMN: &str = "_measurement";
pub const FIELD_COLUMN: &str = "_field";
pub const VALUE_COLUMN: &str = "_value";

/// Translates `expr`, whose rows are bound to `object_name`, into a storage predicate.
///
/// References to `_measurement` and `_field` become the storage engine's reserved tag keys,
/// `_value` becomes a field reference and every other property is a tag.
pub fn to_storage_predicate(expr: &Expression, object_name: &str) -> OptResult<Predicate> {
    Ok(Predicate::new(to_storage_node(expr, object_name)?))
}

/// Combines predicates into `p0 op (p1 op (... op pn))`.
pub fn merge_predicates(op: Logical, predicates: Vec<Predicate>) -> OptResult<Predicate> {
    let mut predicates = predicates.into_iter().rev();
    let last = predicates
        .next()
        .ok_or_else(|| anyhow!("cannot merge an empty list of predicates"))?;
    let root = predicates.fold(last.root, |right, left| Node::logical(op, left.root, right));
    Ok(Predicate::new(root))
}

fn to_storage_node(expr: &Expression, object_name: &str) -> OptResult<Node> {
    match expr {
        Expression::Logical {
            operator,
            left,
            right,
        } => {
            let op = match operator {
                LogicalOperatorKind::And => Logical::And,
                LogicalOperatorKind::Or => Logical::Or,
            };
            let (left, right) = translate_operands(left, right, object_name)?;
            Ok(Node::logical(op, left, right))
        }
        Expression::Binary {
            operator,
            left,
            right,
        } => {
            let op = to_comparison(*operator)?;
            let (left, right) = translate_operands(left, right, object_name)?;
            Ok(Node::comparison(op, left, right))
        }
        Expression::StringLiteral(v) => Ok(Node::Literal(Literal::String(v.clone()))),
        Expression::IntegerLiteral(v) => Ok(Node::Literal(Literal::Integer(*v))),
        Expression::FloatLiteral(v) => Ok(Node::Literal(Literal::Float(*v))),
        Expression::BooleanLiteral(v) => Ok(Node::Literal(Literal::Boolean(*v))),
        Expression::RegexpLiteral(pattern) => {
            Regex::new(pattern).map_err(|source| OptError::InvalidRegex {
                pattern: pattern.clone(),
                source,
            })?;
            Ok(Node::Literal(Literal::Regex(pattern.clone())))
        }
        Expression::Member { object, property } => match object.as_ref() {
            Expression::Identifier(name) if name == object_name => {
                Ok(match property.as_str() {
                    FIELD_COLUMN => Node::TagRef(TagKey::field()),
                    MEASUREMENT_COLUMN => Node::TagRef(TagKey::measurement()),
                    VALUE_COLUMN => Node::FieldRef(VALUE_COLUMN.to_string()),
                    tag => Node::tag(tag),
                })
            }
            other => Err(OptError::UnknownObject(other.to_string())),
        },
        Expression::DurationLiteral(_) => Err(OptError::UnsupportedLiteralKind("duration")),
        Expression::DateTimeLiteral(_) => Err(OptError::UnsupportedLiteralKind("datetime")),
        other => Err(OptError::UnsupportedExpression(other.type_name())),
    }
}

fn translate_operands(
    left: &Expression,
    right: &Expression,
    object_name: &str,
) -> OptResult<(Node, Node)> {
    let left = to_storage_node(left, object_name).map_err(|e| e.on_side(Side::Left))?;
    let right = to_storage_node(right, object_name).map_err(|e| e.on_side(Side::Right))?;
    Ok((left, right))
}

fn to_comparison(operator: BinaryOperatorKind) -> OptResult<Comparison> {
    use BinaryOperatorKind::*;

    Ok(match operator {
        Equal => Comparison::Equal,
        NotEqual => Comparison::NotEqual,
        StartsWith => Comparison::StartsWith,
        RegexpMatch => Comparison::Regex,
        NotRegexpMatch => Comparison::NotRegex,
        LessThan => Comparison::Less,
        LessThanEqual => Comparison::LessEqual,
        GreaterThan => Comparison::Greater,
        GreaterThanEqual => Comparison::GreaterEqual,
        Addition | Subtraction | Multiplication | Division | Modulo | Power => {
            return Err(OptError::UnsupportedOperator(operator.to_string()))
        }
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;

    use super::*;
    use crate::semantic::BinaryOperatorKind::*;
    use crate::storage::predicate::{FIELD_TAG_KEY, MEASUREMENT_TAG_KEY};
    use crate::time::Duration;

    fn r(property: &str) -> Expression {
        Expression::member("r", property)
    }

    fn eq(left: Expression, right: Expression) -> Expression {
        Expression::binary(Equal, left, right)
    }

    #[test]
    fn test_translate_reserved_columns() {
        let expr = Expression::and(
            eq(r("_measurement"), Expression::string("cpu")),
            Expression::and(
                eq(r("_field"), Expression::string("usage_idle")),
                Expression::binary(GreaterThan, r("_value"), Expression::FloatLiteral(0.5)),
            ),
        );
        let expected = Node::logical(
            Logical::And,
            Node::comparison(
                Comparison::Equal,
                Node::TagRef(TagKey::new(MEASUREMENT_TAG_KEY)),
                Node::string("cpu"),
            ),
            Node::logical(
                Logical::And,
                Node::comparison(
                    Comparison::Equal,
                    Node::TagRef(TagKey::new(FIELD_TAG_KEY)),
                    Node::string("usage_idle"),
                ),
                Node::comparison(
                    Comparison::Greater,
                    Node::field("_value"),
                    Node::Literal(Literal::Float(0.5)),
                ),
            ),
        );
        assert_eq!(
            Predicate::new(expected),
            to_storage_predicate(&expr, "r").unwrap()
        );
    }

    #[test]
    fn test_translate_operators_and_literals() {
        let cases = vec![
            (NotEqual, Expression::IntegerLiteral(3), Comparison::NotEqual, Literal::Integer(3)),
            (
                LessThanEqual,
                Expression::BooleanLiteral(true),
                Comparison::LessEqual,
                Literal::Boolean(true),
            ),
            (
                NotRegexpMatch,
                Expression::regexp("^a.*"),
                Comparison::NotRegex,
                Literal::Regex("^a.*".into()),
            ),
            (
                StartsWith,
                Expression::string("ab"),
                Comparison::StartsWith,
                Literal::String("ab".into()),
            ),
        ];
        for (operator, literal, comparison, expected) in cases {
            let expr = Expression::binary(operator, r("host"), literal);
            assert_eq!(
                Predicate::new(Node::comparison(
                    comparison,
                    Node::tag("host"),
                    Node::Literal(expected)
                )),
                to_storage_predicate(&expr, "r").unwrap()
            );
        }
    }

    #[test]
    fn test_translate_failures() {
        let unknown_object = eq(Expression::member("s", "host"), Expression::string("a"));
        assert!(matches!(
            to_storage_predicate(&unknown_object, "r").unwrap_err().root(),
            OptError::UnknownObject(_)
        ));

        let arithmetic = Expression::binary(Addition, r("_value"), Expression::IntegerLiteral(1));
        assert!(matches!(
            to_storage_predicate(&arithmetic, "r").unwrap_err(),
            OptError::UnsupportedOperator(op) if op == "+"
        ));

        let duration = eq(r("_value"), Expression::DurationLiteral(Duration::from_secs(60)));
        assert!(matches!(
            to_storage_predicate(&duration, "r").unwrap_err().root(),
            OptError::UnsupportedLiteralKind("duration")
        ));

        let time = eq(r("_value"), Expression::DateTimeLiteral(Utc.timestamp_nanos(0)));
        assert!(matches!(
            to_storage_predicate(&time, "r").unwrap_err().root(),
            OptError::UnsupportedLiteralKind("datetime")
        ));

        let unary = Expression::not(eq(r("host"), Expression::string("a")));
        assert!(matches!(
            to_storage_predicate(&unary, "r").unwrap_err(),
            OptError::UnsupportedExpression("UnaryExpression")
        ));

        let bad_regex =
            Expression::binary(RegexpMatch, r("host"), Expression::regexp("(unclosed"));
        assert!(matches!(
            to_storage_predicate(&bad_regex, "r").unwrap_err().root(),
            OptError::InvalidRegex { .. }
        ));
    }

    #[test]
    fn test_failure_reports_operand_side() {
        let expr = Expression::and(
            eq(r("host"), Expression::string("a")),
            eq(r("host"), Expression::DurationLiteral(Duration::from_secs(1))),
        );
        let err = to_storage_predicate(&expr, "r").unwrap_err();
        assert!(matches!(err, OptError::Operand { side: Side::Right, .. }));
        assert_eq!("right hand side", err.to_string());
    }

    #[test]
    fn test_merge_is_right_nested() {
        let p = |tag: &str| {
            Predicate::new(Node::comparison(Comparison::Equal, Node::tag(tag), Node::string("x")))
        };
        let merged =
            merge_predicates(Logical::And, vec![p("a"), p("b"), p("c")]).unwrap();
        assert_eq!(
            Node::logical(
                Logical::And,
                p("a").root,
                Node::logical(Logical::And, p("b").root, p("c").root)
            ),
            merged.root
        );

        assert_eq!(p("a"), merge_predicates(Logical::Or, vec![p("a")]).unwrap());
        assert!(matches!(
            merge_predicates(Logical::And, vec![]),
            Err(OptError::Internal(_))
        ));
    }

    type Row = HashMap<String, String>;

    /// Evaluates a filter expression against a row of string columns.
    fn eval_expression(expr: &Expression, row: &Row) -> bool {
        let lookup = |e: &Expression| match e {
            Expression::Member { property, .. } => row.get(property).cloned().unwrap_or_default(),
            Expression::StringLiteral(s) | Expression::RegexpLiteral(s) => s.clone(),
            other => panic!("unexpected operand {:?}", other),
        };
        match expr {
            Expression::Logical {
                operator,
                left,
                right,
            } => match operator {
                LogicalOperatorKind::And => {
                    eval_expression(left, row) && eval_expression(right, row)
                }
                LogicalOperatorKind::Or => {
                    eval_expression(left, row) || eval_expression(right, row)
                }
            },
            Expression::Binary {
                operator,
                left,
                right,
            } => compare(to_comparison(*operator).unwrap(), &lookup(left), &lookup(right)),
            other => panic!("unexpected expression {:?}", other),
        }
    }

    /// Evaluates a storage predicate the way the storage engine would, mapping reserved keys back.
    fn eval_node(node: &Node, row: &Row) -> bool {
        let lookup = |n: &Node| match n {
            Node::TagRef(key) => row.get(&key.to_string()).cloned().unwrap_or_default(),
            Node::FieldRef(key) => row.get(key).cloned().unwrap_or_default(),
            Node::Literal(Literal::String(s)) | Node::Literal(Literal::Regex(s)) => s.clone(),
            other => panic!("unexpected operand {:?}", other),
        };
        match node {
            Node::Logical {
                op: Logical::And,
                left,
                right,
            } => eval_node(left, row) && eval_node(right, row),
            Node::Logical {
                op: Logical::Or,
                left,
                right,
            } => eval_node(left, row) || eval_node(right, row),
            Node::Comparison { op, left, right } => compare(*op, &lookup(left), &lookup(right)),
            other => panic!("unexpected node {:?}", other),
        }
    }

    fn compare(op: Comparison, left: &str, right: &str) -> bool {
        match op {
            Comparison::Equal => left == right,
            Comparison::NotEqual => left != right,
            Comparison::StartsWith => left.starts_with(right),
            Comparison::Regex => Regex::new(right).unwrap().is_match(left),
            Comparison::NotRegex => !Regex::new(right).unwrap().is_match(left),
            Comparison::Less => left < right,
            Comparison::LessEqual => left <= right,
            Comparison::Greater => left > right,
            Comparison::GreaterEqual => left >= right,
        }
    }

    const COLUMNS: [&str; 4] = ["_measurement", "_field", "_value", "host"];
    const VALUES: [&str; 3] = ["a", "b", ""];

    fn arb_comparison() -> impl Strategy<Value = Expression> {
        let op = prop_oneof![
            Just(Equal),
            Just(NotEqual),
            Just(LessThan),
            Just(GreaterThanEqual),
            Just(StartsWith),
        ];
        let column = prop::sample::select(COLUMNS.to_vec());
        let value = prop::sample::select(VALUES.to_vec());
        (op, column, value).prop_map(|(op, column, value)| {
            Expression::binary(op, r(column), Expression::string(value))
        })
    }

    fn arb_expression() -> impl Strategy<Value = Expression> {
        arb_comparison().prop_recursive(4, 16, 2, |inner| {
            (inner.clone(), inner, any::<bool>()).prop_map(|(left, right, and)| {
                if and {
                    Expression::and(left, right)
                } else {
                    Expression::or(left, right)
                }
            })
        })
    }

    fn arb_row() -> impl Strategy<Value = Row> {
        let values = prop::collection::vec(prop::sample::select(VALUES.to_vec()), COLUMNS.len());
        values.prop_map(|values| {
            COLUMNS
                .iter()
                .zip(values)
                .map(|(c, v)| (c.to_string(), v.to_string()))
                .collect()
        })
    }

    proptest! {
        #[test]
        fn prop_translation_preserves_truth(expr in arb_expression(), row in arb_row()) {
            let predicate = to_storage_predicate(&expr, "r").unwrap();
            prop_assert_eq!(eval_expression(&expr, &row), eval_node(&predicate.root, &row));
        }

        #[test]
        fn prop_merge_is_conjunction(
            exprs in prop::collection::vec(arb_expression(), 1..5),
            row in arb_row(),
        ) {
            let predicates = exprs
                .iter()
                .map(|e| to_storage_predicate(e, "r").unwrap())
                .collect::<Vec<_>>();
            let merged = merge_predicates(Logical::And, predicates).unwrap();
            let expected = exprs.iter().all(|e| eval_expression(e, &row));
            prop_assert_eq!(expected, eval_node(&merged.root, &row));
        }
    }
}
