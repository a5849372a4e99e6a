//! The part of the query language's semantic graph that planner rules look into.
//!
//! Only filter functions are inspected: `(r) => r._measurement == "cpu" and r._value > 0.5`.
//! Parsing and type checking happen before a plan ever reaches this crate.

use std::fmt;

use chrono::{DateTime, Utc};
use strum_macros::{Display, IntoStaticStr};

use crate::time::Duration;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Display)]
pub enum LogicalOperatorKind {
    #[strum(serialize = "and")]
    And,
    #[strum(serialize = "or")]
    Or,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Display)]
pub enum BinaryOperatorKind {
    #[strum(serialize = "==")]
    Equal,
    #[strum(serialize = "!=")]
    NotEqual,
    #[strum(serialize = "=~")]
    RegexpMatch,
    #[strum(serialize = "!~")]
    NotRegexpMatch,
    #[strum(serialize = "startswith")]
    StartsWith,
    #[strum(serialize = "<")]
    LessThan,
    #[strum(serialize = "<=")]
    LessThanEqual,
    #[strum(serialize = ">")]
    GreaterThan,
    #[strum(serialize = ">=")]
    GreaterThanEqual,
    #[strum(serialize = "+")]
    Addition,
    #[strum(serialize = "-")]
    Subtraction,
    #[strum(serialize = "*")]
    Multiplication,
    #[strum(serialize = "/")]
    Division,
    #[strum(serialize = "%")]
    Modulo,
    #[strum(serialize = "^")]
    Power,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Display)]
pub enum UnaryOperatorKind {
    #[strum(serialize = "not")]
    Not,
    #[strum(serialize = "exists")]
    Exists,
    #[strum(serialize = "-")]
    Negate,
}

#[derive(Clone, Debug, PartialEq, IntoStaticStr)]
pub enum Expression {
    #[strum(serialize = "LogicalExpression")]
    Logical {
        operator: LogicalOperatorKind,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    #[strum(serialize = "BinaryExpression")]
    Binary {
        operator: BinaryOperatorKind,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    #[strum(serialize = "UnaryExpression")]
    Unary {
        operator: UnaryOperatorKind,
        argument: Box<Expression>,
    },
    #[strum(serialize = "MemberExpression")]
    Member {
        object: Box<Expression>,
        property: String,
    },
    #[strum(serialize = "CallExpression")]
    Call {
        callee: Box<Expression>,
        arguments: Vec<Expression>,
    },
    #[strum(serialize = "IdentifierExpression")]
    Identifier(String),
    #[strum(serialize = "StringLiteral")]
    StringLiteral(String),
    #[strum(serialize = "IntegerLiteral")]
    IntegerLiteral(i64),
    #[strum(serialize = "FloatLiteral")]
    FloatLiteral(f64),
    #[strum(serialize = "BooleanLiteral")]
    BooleanLiteral(bool),
    #[strum(serialize = "RegexpLiteral")]
    RegexpLiteral(String),
    #[strum(serialize = "DurationLiteral")]
    DurationLiteral(Duration),
    #[strum(serialize = "DateTimeLiteral")]
    DateTimeLiteral(DateTime<Utc>),
}

impl Expression {
    pub fn logical(operator: LogicalOperatorKind, left: Expression, right: Expression) -> Self {
        Expression::Logical {
            operator,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn and(left: Expression, right: Expression) -> Self {
        Self::logical(LogicalOperatorKind::And, left, right)
    }

    pub fn or(left: Expression, right: Expression) -> Self {
        Self::logical(LogicalOperatorKind::Or, left, right)
    }

    pub fn binary(operator: BinaryOperatorKind, left: Expression, right: Expression) -> Self {
        Expression::Binary {
            operator,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn unary(operator: UnaryOperatorKind, argument: Expression) -> Self {
        Expression::Unary {
            operator,
            argument: Box::new(argument),
        }
    }

    pub fn not(argument: Expression) -> Self {
        Self::unary(UnaryOperatorKind::Not, argument)
    }

    pub fn exists(argument: Expression) -> Self {
        Self::unary(UnaryOperatorKind::Exists, argument)
    }

    /// `object.property` where `object` is a plain identifier.
    pub fn member(object: impl Into<String>, property: impl Into<String>) -> Self {
        Expression::Member {
            object: Box::new(Expression::Identifier(object.into())),
            property: property.into(),
        }
    }

    pub fn string(value: impl Into<String>) -> Self {
        Expression::StringLiteral(value.into())
    }

    pub fn regexp(pattern: impl Into<String>) -> Self {
        Expression::RegexpLiteral(pattern.into())
    }

    pub fn is_literal(&self) -> bool {
        matches!(
            self,
            Expression::StringLiteral(_)
                | Expression::IntegerLiteral(_)
                | Expression::FloatLiteral(_)
                | Expression::BooleanLiteral(_)
                | Expression::RegexpLiteral(_)
                | Expression::DurationLiteral(_)
                | Expression::DateTimeLiteral(_)
        )
    }

    /// The name of the node type, as reported in translation errors.
    pub fn type_name(&self) -> &'static str {
        self.into()
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Logical {
                operator,
                left,
                right,
            } => {
                write_operand(f, left, *operator)?;
                write!(f, " {} ", operator)?;
                write_operand(f, right, *operator)
            }
            Expression::Binary {
                operator,
                left,
                right,
            } => write!(f, "{} {} {}", left, operator, right),
            Expression::Unary { operator, argument } => match operator {
                UnaryOperatorKind::Negate => write!(f, "-{}", argument),
                _ => write!(f, "{} {}", operator, argument),
            },
            Expression::Member { object, property } => write!(f, "{}.{}", object, property),
            Expression::Call { callee, arguments } => {
                write!(f, "{}(", callee)?;
                for (i, arg) in arguments.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
            Expression::Identifier(name) => write!(f, "{}", name),
            Expression::StringLiteral(s) => write!(f, "{:?}", s),
            Expression::IntegerLiteral(i) => write!(f, "{}", i),
            Expression::FloatLiteral(v) => write!(f, "{:?}", v),
            Expression::BooleanLiteral(b) => write!(f, "{}", b),
            Expression::RegexpLiteral(re) => write!(f, "/{}/", re),
            Expression::DurationLiteral(d) => write!(f, "{}", d),
            Expression::DateTimeLiteral(t) => write!(f, "{}", t.to_rfc3339()),
        }
    }
}

fn write_operand(
    f: &mut fmt::Formatter<'_>,
    operand: &Expression,
    parent: LogicalOperatorKind,
) -> fmt::Result {
    match operand {
        Expression::Logical { operator, .. } if *operator != parent => write!(f, "({})", operand),
        _ => write!(f, "{}", operand),
    }
}

/// A single parameter function, such as the predicate of a `filter`.
#[derive(Clone, Debug, PartialEq)]
pub struct FunctionExpression {
    parameters: Vec<String>,
    body: Expression,
}

impl FunctionExpression {
    pub fn new(parameters: Vec<String>, body: Expression) -> Self {
        Self { parameters, body }
    }

    /// `(param) => body`
    pub fn with_param(param: impl Into<String>, body: Expression) -> Self {
        Self::new(vec![param.into()], body)
    }

    pub fn parameters(&self) -> &[String] {
        &self.parameters
    }

    /// The name bound to the row, if the function takes exactly one parameter.
    pub fn row_parameter(&self) -> Option<&str> {
        match self.parameters.as_slice() {
            [param] => Some(param.as_str()),
            _ => None,
        }
    }

    pub fn body(&self) -> &Expression {
        &self.body
    }

    /// Same parameters, new body.
    pub fn with_body(&self, body: Expression) -> Self {
        Self {
            parameters: self.parameters.clone(),
            body,
        }
    }
}

impl fmt::Display for FunctionExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}) => {}", self.parameters.join(", "), self.body)
    }
}

#[cfg(test)]
mod tests {
    use super::BinaryOperatorKind::*;
    use super::*;

    #[test]
    fn test_display_filter_function() {
        let body = Expression::and(
            Expression::binary(
                Equal,
                Expression::member("r", "_measurement"),
                Expression::string("cpu"),
            ),
            Expression::or(
                Expression::binary(
                    LessThan,
                    Expression::FloatLiteral(0.5),
                    Expression::member("r", "_value"),
                ),
                Expression::exists(Expression::member("r", "host")),
            ),
        );
        let function = FunctionExpression::with_param("r", body);
        assert_eq!(
            r#"(r) => r._measurement == "cpu" and (0.5 < r._value or exists r.host)"#,
            function.to_string()
        );
    }

    #[test]
    fn test_row_parameter() {
        let body = Expression::BooleanLiteral(true);
        assert_eq!(
            Some("r"),
            FunctionExpression::with_param("r", body.clone()).row_parameter()
        );
        assert_eq!(None, FunctionExpression::new(vec![], body).row_parameter());
    }

    #[test]
    fn test_type_name() {
        assert_eq!(
            "UnaryExpression",
            Expression::not(Expression::BooleanLiteral(true)).type_name()
        );
        assert_eq!("IdentifierExpression", Expression::Identifier("r".into()).type_name());
    }
}
